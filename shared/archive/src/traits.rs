use crate::ArchiveError;

/// Write half of an archive. All operations are infallible: archives buffer
/// in memory and grow as needed.
pub trait ArchiveWrite {
    fn write_u8(&mut self, value: u8);
    fn write_u16(&mut self, value: u16);
    fn write_u32(&mut self, value: u32);
    fn write_i16(&mut self, value: i16);
    fn write_f32(&mut self, value: f32);
    fn write_bool(&mut self, value: bool);
    fn write_str(&mut self, value: &str);
}

/// Read half of an archive. Every operation is the exact inverse of its
/// `ArchiveWrite` counterpart and fails with `ArchiveError` on truncated or
/// malformed input.
pub trait ArchiveRead {
    fn read_u8(&mut self) -> Result<u8, ArchiveError>;
    fn read_u16(&mut self) -> Result<u16, ArchiveError>;
    fn read_u32(&mut self) -> Result<u32, ArchiveError>;
    fn read_i16(&mut self) -> Result<i16, ArchiveError>;
    fn read_f32(&mut self) -> Result<f32, ArchiveError>;
    fn read_bool(&mut self) -> Result<bool, ArchiveError>;
    fn read_string(&mut self) -> Result<String, ArchiveError>;
}

/// Types that know how to move themselves through an archive.
pub trait Marshal: Sized {
    fn marshal(&self, ar: &mut dyn ArchiveWrite);
    fn unmarshal(ar: &mut dyn ArchiveRead) -> Result<Self, ArchiveError>;
}

impl Marshal for u8 {
    fn marshal(&self, ar: &mut dyn ArchiveWrite) {
        ar.write_u8(*self);
    }
    fn unmarshal(ar: &mut dyn ArchiveRead) -> Result<Self, ArchiveError> {
        ar.read_u8()
    }
}

impl Marshal for u16 {
    fn marshal(&self, ar: &mut dyn ArchiveWrite) {
        ar.write_u16(*self);
    }
    fn unmarshal(ar: &mut dyn ArchiveRead) -> Result<Self, ArchiveError> {
        ar.read_u16()
    }
}

impl Marshal for u32 {
    fn marshal(&self, ar: &mut dyn ArchiveWrite) {
        ar.write_u32(*self);
    }
    fn unmarshal(ar: &mut dyn ArchiveRead) -> Result<Self, ArchiveError> {
        ar.read_u32()
    }
}

impl Marshal for i16 {
    fn marshal(&self, ar: &mut dyn ArchiveWrite) {
        ar.write_i16(*self);
    }
    fn unmarshal(ar: &mut dyn ArchiveRead) -> Result<Self, ArchiveError> {
        ar.read_i16()
    }
}

impl Marshal for f32 {
    fn marshal(&self, ar: &mut dyn ArchiveWrite) {
        ar.write_f32(*self);
    }
    fn unmarshal(ar: &mut dyn ArchiveRead) -> Result<Self, ArchiveError> {
        ar.read_f32()
    }
}

impl Marshal for bool {
    fn marshal(&self, ar: &mut dyn ArchiveWrite) {
        ar.write_bool(*self);
    }
    fn unmarshal(ar: &mut dyn ArchiveRead) -> Result<Self, ArchiveError> {
        ar.read_bool()
    }
}

impl Marshal for String {
    fn marshal(&self, ar: &mut dyn ArchiveWrite) {
        ar.write_str(self);
    }
    fn unmarshal(ar: &mut dyn ArchiveRead) -> Result<Self, ArchiveError> {
        ar.read_string()
    }
}
