//! # Driftnet Archive
//! Pluggable marshaling archives for the driftnet wire protocol.
//!
//! An archive is a flat stream of typed values. Two implementations exist:
//! a compact little-endian binary form and a whitespace-tokenized text form
//! useful for debugging captures. Both sides of a connection must agree on
//! which archive frames a payload; the envelope codec records the choice in
//! its flag byte.

mod binary;
mod error;
mod text;
mod traits;

pub use binary::{BinaryReader, BinaryWriter};
pub use error::ArchiveError;
pub use text::{TextReader, TextWriter};
pub use traits::{ArchiveRead, ArchiveWrite, Marshal};
