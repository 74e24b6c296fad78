use crate::{ArchiveError, ArchiveRead, ArchiveWrite};

/// Little-endian binary archive writer backed by a growable buffer.
pub struct BinaryWriter {
    buffer: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(256),
        }
    }

    pub fn to_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn bytes_written(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for BinaryWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveWrite for BinaryWriter {
    fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn write_i16(&mut self, value: i16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn write_f32(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn write_bool(&mut self, value: bool) {
        self.buffer.push(value as u8);
    }

    fn write_str(&mut self, value: &str) {
        let bytes = value.as_bytes();
        self.write_u32(bytes.len() as u32);
        self.buffer.extend_from_slice(bytes);
    }
}

/// Little-endian binary archive reader over a borrowed byte slice.
pub struct BinaryReader<'b> {
    buffer: &'b [u8],
    cursor: usize,
}

impl<'b> BinaryReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], ArchiveError> {
        if self.remaining() < N {
            return Err(ArchiveError::ShortRead {
                wanted: N,
                remaining: self.remaining(),
            });
        }
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.buffer[self.cursor..self.cursor + N]);
        self.cursor += N;
        Ok(bytes)
    }
}

impl ArchiveRead for BinaryReader<'_> {
    fn read_u8(&mut self) -> Result<u8, ArchiveError> {
        Ok(self.take::<1>()?[0])
    }

    fn read_u16(&mut self) -> Result<u16, ArchiveError> {
        Ok(u16::from_le_bytes(self.take::<2>()?))
    }

    fn read_u32(&mut self) -> Result<u32, ArchiveError> {
        Ok(u32::from_le_bytes(self.take::<4>()?))
    }

    fn read_i16(&mut self) -> Result<i16, ArchiveError> {
        Ok(i16::from_le_bytes(self.take::<2>()?))
    }

    fn read_f32(&mut self) -> Result<f32, ArchiveError> {
        Ok(f32::from_le_bytes(self.take::<4>()?))
    }

    fn read_bool(&mut self) -> Result<bool, ArchiveError> {
        match self.take::<1>()?[0] {
            0 => Ok(false),
            1 => Ok(true),
            tag => Err(ArchiveError::UnknownTag { what: "bool", tag }),
        }
    }

    fn read_string(&mut self) -> Result<String, ArchiveError> {
        let length = self.read_u32()? as usize;
        if length > self.remaining() {
            return Err(ArchiveError::BadStringLength {
                length,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.buffer[self.cursor..self.cursor + length];
        self.cursor += length;
        String::from_utf8(bytes.to_vec()).map_err(|_| ArchiveError::BadUtf8)
    }
}
