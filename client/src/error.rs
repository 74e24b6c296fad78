use thiserror::Error;

use driftnet_shared::{DecoderError, EncoderError, EnvelopeError, TransportError};

/// Client-side failures. Connect errors are fatal and surface on the
/// pre-game screen; everything after connection is handled at the frame
/// loop boundary.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Compression(#[from] EncoderError),

    #[error(transparent)]
    Decompression(#[from] DecoderError),
}
