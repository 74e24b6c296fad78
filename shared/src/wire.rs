//! Small marshal helpers for foreign math types.

use driftnet_archive::{ArchiveError, ArchiveRead, ArchiveWrite};
use glam::Vec3;

pub(crate) fn write_vec3(ar: &mut dyn ArchiveWrite, v: Vec3) {
    ar.write_f32(v.x);
    ar.write_f32(v.y);
    ar.write_f32(v.z);
}

pub(crate) fn read_vec3(ar: &mut dyn ArchiveRead) -> Result<Vec3, ArchiveError> {
    let x = ar.read_f32()?;
    let y = ar.read_f32()?;
    let z = ar.read_f32()?;
    Ok(Vec3::new(x, y, z))
}
