use thiserror::Error;

use driftnet_shared::{DecoderError, EncoderError, TransportError};

/// Startup-time server failures. Once the loops are running, faults are
/// logged at the loop boundary and never unwind past it.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Compression(#[from] EncoderError),

    #[error(transparent)]
    Decompression(#[from] DecoderError),
}
