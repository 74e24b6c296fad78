use std::fmt;

use driftnet_archive::{ArchiveError, ArchiveRead, ArchiveWrite, Marshal};

/// Stable, process-unique entity identifier. Assigned from a monotonically
/// increasing counter on creation and never reused while the entity lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u32);

impl EntityId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl Marshal for EntityId {
    fn marshal(&self, ar: &mut dyn ArchiveWrite) {
        ar.write_u32(self.0);
    }
    fn unmarshal(ar: &mut dyn ArchiveRead) -> Result<Self, ArchiveError> {
        Ok(Self(ar.read_u32()?))
    }
}

/// Per-connection identifier assigned by the server on accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u16);

impl ConnectionId {
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

impl Marshal for ConnectionId {
    fn marshal(&self, ar: &mut dyn ArchiveWrite) {
        ar.write_u16(self.0);
    }
    fn unmarshal(ar: &mut dyn ArchiveRead) -> Result<Self, ArchiveError> {
        Ok(Self(ar.read_u16()?))
    }
}
