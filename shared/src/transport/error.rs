use std::io;

use thiserror::Error;

use crate::constants::MAX_FRAME_BYTES;

/// Errors from the frame transport. Bind and connect failures are fatal at
/// startup; `Closed` mid-session is a disconnect event, not a fault.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("peer closed the connection")]
    Closed,

    #[error("frame of {bytes} bytes exceeds the {MAX_FRAME_BYTES}-byte limit")]
    OversizedFrame { bytes: usize },

    #[error(transparent)]
    Io(#[from] io::Error),
}
