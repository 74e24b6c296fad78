use driftnet_archive::ArchiveError;
use thiserror::Error;

/// Errors that can occur while compressing an outgoing payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncoderError {
    #[error("failed to create compressor with level {level}")]
    CompressorCreationFailed { level: i32 },

    #[error("failed to create compressor with dictionary at level {level}")]
    CompressorWithDictionaryFailed { level: i32 },

    #[error("compression failed for payload of {payload_size} bytes")]
    CompressionFailed { payload_size: usize },
}

/// Errors that can occur while decompressing an incoming payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecoderError {
    #[error("failed to create decompressor")]
    DecompressorCreationFailed,

    #[error("failed to create decompressor with dictionary")]
    DecompressorWithDictionaryFailed,

    #[error("could not size decompression buffer for payload of {payload_size} bytes")]
    UpperBoundCalculationFailed { payload_size: usize },

    #[error("decompression failed for payload of {payload_size} bytes")]
    DecompressionFailed { payload_size: usize },
}

/// Errors from sealing or opening an envelope. Opening processes untrusted
/// network data; callers log the failure and drop the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("empty envelope")]
    Empty,

    #[error("unknown envelope flags {flags:#010b}")]
    UnknownFlags { flags: u8 },

    #[error("payload is compressed but no decompressor is configured")]
    CompressionUnavailable,

    #[error(transparent)]
    Encode(#[from] EncoderError),

    #[error(transparent)]
    Decode(#[from] DecoderError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}
