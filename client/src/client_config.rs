use std::time::Duration;

use driftnet_shared::{ArchiveKind, CompressionConfig};

/// Contains Config properties which will be used by the Client.
#[derive(Clone)]
pub struct ClientConfig {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Display name announced in the ready message.
    pub name: String,
    /// Archive used to marshal outgoing envelopes. Must match the server.
    pub archive: ArchiveKind,
    /// Optional payload compression, per direction. Must match the server.
    pub compression: Option<CompressionConfig>,
    /// How long a disconnect waits for the server's acknowledgement before
    /// teardown proceeds unconditionally.
    pub disconnect_ack_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5555,
            name: "pilot".to_string(),
            archive: ArchiveKind::Binary,
            compression: None,
            disconnect_ack_timeout: Duration::from_secs(1),
        }
    }
}
