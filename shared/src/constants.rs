//! Protocol-wide constants shared by the transport and schema layers.

/// Upper bound on a single framed payload. Frames use a u32 little-endian
/// length prefix (see `transport::frame`), so the hard ceiling is
/// `u32::MAX`; this cap sits well below it to reject corrupt/oversized
/// length prefixes before allocating.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Schema version mixed into the handshake fingerprint
/// (see `world::schema::schema_fingerprint`). Bump on any wire-schema change.
pub const SCHEMA_VERSION: u32 = 1;
