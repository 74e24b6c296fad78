use thiserror::Error;

/// Errors that can occur while unmarshaling from an archive.
///
/// Archives process untrusted network data: every failure mode is reported
/// through this type so callers can drop the offending payload instead of
/// crashing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    /// The archive ended before the requested value could be read
    #[error("archive ended early: wanted {wanted} more byte(s), {remaining} left")]
    ShortRead { wanted: usize, remaining: usize },

    /// A text token could not be parsed as the requested type
    #[error("malformed token `{token}` where {expected} was expected")]
    BadToken {
        token: String,
        expected: &'static str,
    },

    /// A declared string length exceeds what remains in the archive
    #[error("string length {length} exceeds remaining archive size {remaining}")]
    BadStringLength { length: usize, remaining: usize },

    /// String bytes were not valid UTF-8
    #[error("string payload is not valid utf-8")]
    BadUtf8,

    /// An enum tag had no known interpretation
    #[error("unknown {what} tag {tag}")]
    UnknownTag { what: &'static str, tag: u8 },

    /// A structurally invalid value was decoded
    #[error("malformed {what}")]
    Malformed { what: &'static str },
}
