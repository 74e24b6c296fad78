use std::time::Duration;

use driftnet_shared::{ArchiveKind, CompressionConfig};

/// Contains Config properties which will be used by the Server.
#[derive(Clone)]
pub struct ServerConfig {
    /// Port the listener binds on.
    pub port: u16,
    /// Minimum interval between state broadcasts.
    pub broadcast_interval: Duration,
    /// Archive used to marshal outgoing envelopes.
    pub archive: ArchiveKind,
    /// Optional payload compression, per direction.
    pub compression: Option<CompressionConfig>,
    /// How long a disconnect waits for the peer's acknowledgement before
    /// teardown proceeds unconditionally.
    pub disconnect_ack_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5555,
            broadcast_interval: Duration::from_millis(50),
            archive: ArchiveKind::Binary,
            compression: None,
            disconnect_ack_timeout: Duration::from_secs(1),
        }
    }
}
