use driftnet_archive::{ArchiveError, ArchiveRead, ArchiveWrite};
use glam::Vec3;
use log::warn;

/// Lossy 16-bit fixed-point codec for replicated floats.
///
/// A value is scaled by `2^frac_bits` and rounded into an `i16`: with the
/// default 4 fraction bits that leaves a 12-bit signed integer part, a
/// divisor of 16 and a valid magnitude just under 2048. Out-of-range input
/// is logged and still encoded: the high bits wrap away and only the
/// residue survives, matching the codec's no-clamp contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quantizer {
    frac_bits: u8,
}

impl Quantizer {
    pub const fn new(frac_bits: u8) -> Self {
        Self { frac_bits }
    }

    /// Scale factor between float and fixed-point space.
    pub fn scale(&self) -> f32 {
        (1u32 << self.frac_bits) as f32
    }

    /// Largest magnitude that survives encoding without wrapping.
    pub fn max_magnitude(&self) -> f32 {
        (i16::MAX as f32 + 1.0) / self.scale()
    }

    /// Worst-case absolute error for an in-range value.
    pub fn epsilon(&self) -> f32 {
        0.5 / self.scale()
    }

    pub fn encode(&self, value: f32) -> i16 {
        let scaled = (value * self.scale()).round();
        if scaled > i16::MAX as f32 || scaled < i16::MIN as f32 {
            warn!(
                "quantizing out-of-range value {value} (|x| < {} required); residue will wrap",
                self.max_magnitude()
            );
        }
        // Truncating cast keeps the low 16 bits; no clamping.
        (scaled as i64) as i16
    }

    pub fn decode(&self, raw: i16) -> f32 {
        raw as f32 / self.scale()
    }

    pub fn encode_vec3(&self, value: Vec3) -> [i16; 3] {
        [
            self.encode(value.x),
            self.encode(value.y),
            self.encode(value.z),
        ]
    }

    pub fn decode_vec3(&self, raw: [i16; 3]) -> Vec3 {
        Vec3::new(self.decode(raw[0]), self.decode(raw[1]), self.decode(raw[2]))
    }

    /// Writes one scalar, raw when the owning entity's priority bypasses
    /// quantization for this field.
    pub fn write_scalar(&self, ar: &mut dyn ArchiveWrite, value: f32, bypass: bool) {
        if bypass {
            ar.write_f32(value);
        } else {
            ar.write_i16(self.encode(value));
        }
    }

    pub fn read_scalar(
        &self,
        ar: &mut dyn ArchiveRead,
        bypass: bool,
    ) -> Result<f32, ArchiveError> {
        if bypass {
            ar.read_f32()
        } else {
            Ok(self.decode(ar.read_i16()?))
        }
    }

    pub fn write_vec3(&self, ar: &mut dyn ArchiveWrite, value: Vec3, bypass: bool) {
        self.write_scalar(ar, value.x, bypass);
        self.write_scalar(ar, value.y, bypass);
        self.write_scalar(ar, value.z, bypass);
    }

    pub fn read_vec3(&self, ar: &mut dyn ArchiveRead, bypass: bool) -> Result<Vec3, ArchiveError> {
        let x = self.read_scalar(ar, bypass)?;
        let y = self.read_scalar(ar, bypass)?;
        let z = self.read_scalar(ar, bypass)?;
        Ok(Vec3::new(x, y, z))
    }
}

impl Default for Quantizer {
    fn default() -> Self {
        Self::new(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_range_values_stay_within_epsilon() {
        let q = Quantizer::default();
        for value in [0.0f32, 1.0, -1.0, 0.03125, 1999.25, -2047.9, 2047.9] {
            let decoded = q.decode(q.encode(value));
            assert!(
                (decoded - value).abs() <= q.epsilon(),
                "{value} decoded to {decoded}"
            );
        }
    }

    #[test]
    fn quantization_is_exact_on_grid_points() {
        let q = Quantizer::default();
        // Multiples of 1/16 survive the round trip untouched.
        for value in [0.0625f32, -12.5, 100.0, 2047.9375] {
            assert_eq!(q.decode(q.encode(value)), value);
        }
    }

    #[test]
    fn out_of_range_wraps_without_panicking() {
        let q = Quantizer::default();
        let encoded = q.encode(5000.0);
        // 5000 * 16 = 80000, which wraps in i16 space; the residue decodes
        // to something finite and in-range.
        let decoded = q.decode(encoded);
        assert!(decoded.abs() < q.max_magnitude());
        assert_ne!(decoded, 5000.0);
    }

    #[test]
    fn bypass_preserves_bits_exactly() {
        let q = Quantizer::default();
        let mut writer = driftnet_archive::BinaryWriter::new();
        let value = 1234.56789f32;
        q.write_scalar(&mut writer, value, true);
        let bytes = writer.to_bytes();
        let mut reader = driftnet_archive::BinaryReader::new(&bytes);
        assert_eq!(q.read_scalar(&mut reader, true).unwrap(), value);
    }

    #[test]
    fn wider_fraction_tightens_resolution() {
        let coarse = Quantizer::new(4);
        let fine = Quantizer::new(8);
        assert!(fine.epsilon() < coarse.epsilon());
        assert!(fine.max_magnitude() < coarse.max_magnitude());
    }
}
