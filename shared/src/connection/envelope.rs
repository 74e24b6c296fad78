//! Envelope codec: `Message` to and from framed bytes.
//!
//! The first byte carries the archive selection and a compressed flag; the
//! message type tag is the first value inside the payload. `open` is the
//! exact inverse of `seal` and reports every failure as an error so a
//! malformed payload can never take the process down; the caller drops
//! the message and moves on.

use driftnet_archive::{BinaryReader, BinaryWriter, Marshal, TextReader, TextWriter};

use super::decoder::Decoder;
use super::encoder::Encoder;
use super::error::EnvelopeError;
use crate::messages::Message;

const FLAG_TEXT: u8 = 0b0000_0001;
const FLAG_COMPRESSED: u8 = 0b0000_0010;
const KNOWN_FLAGS: u8 = FLAG_TEXT | FLAG_COMPRESSED;

/// Which archive frames the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveKind {
    Binary,
    Text,
}

/// Marshals a message and optionally compresses the result.
pub fn seal(
    message: &Message,
    archive: ArchiveKind,
    encoder: Option<&mut Encoder>,
) -> Result<Vec<u8>, EnvelopeError> {
    let payload = match archive {
        ArchiveKind::Binary => {
            let mut writer = BinaryWriter::new();
            message.marshal(&mut writer);
            writer.to_bytes()
        }
        ArchiveKind::Text => {
            let mut writer = TextWriter::new();
            message.marshal(&mut writer);
            writer.to_bytes()
        }
    };

    let mut flags = match archive {
        ArchiveKind::Binary => 0,
        ArchiveKind::Text => FLAG_TEXT,
    };

    let body = match encoder {
        Some(encoder) if encoder.is_active() => {
            flags |= FLAG_COMPRESSED;
            encoder.encode(&payload)?.to_vec()
        }
        _ => payload,
    };

    let mut envelope = Vec::with_capacity(body.len() + 1);
    envelope.push(flags);
    envelope.extend_from_slice(&body);
    Ok(envelope)
}

/// Inverse of `seal`.
pub fn open(bytes: &[u8], decoder: Option<&mut Decoder>) -> Result<Message, EnvelopeError> {
    let (&flags, body) = bytes.split_first().ok_or(EnvelopeError::Empty)?;
    if flags & !KNOWN_FLAGS != 0 {
        return Err(EnvelopeError::UnknownFlags { flags });
    }

    let decompressed;
    let payload = if flags & FLAG_COMPRESSED != 0 {
        match decoder {
            Some(decoder) if decoder.is_active() => {
                decompressed = decoder.decode(body)?.to_vec();
                &decompressed[..]
            }
            _ => return Err(EnvelopeError::CompressionUnavailable),
        }
    } else {
        body
    };

    let message = if flags & FLAG_TEXT != 0 {
        let mut reader = TextReader::new(payload)?;
        Message::unmarshal(&mut reader)?
    } else {
        let mut reader = BinaryReader::new(payload);
        Message::unmarshal(&mut reader)?
    };
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Chat;

    fn chat(text: &str) -> Message {
        Message::Chat(Chat {
            text: text.to_string(),
        })
    }

    #[test]
    fn seal_open_round_trips_both_archives() {
        for archive in [ArchiveKind::Binary, ArchiveKind::Text] {
            let message = chat("anyone near the reactor?");
            let bytes = seal(&message, archive, None).unwrap();
            let decoded = open(&bytes, None).unwrap();
            assert_eq!(decoded, message);
        }
    }

    #[test]
    fn empty_and_flag_garbage_are_errors() {
        assert_eq!(open(&[], None), Err(EnvelopeError::Empty));
        assert_eq!(
            open(&[0b1000_0000, 1, 2, 3], None),
            Err(EnvelopeError::UnknownFlags {
                flags: 0b1000_0000
            })
        );
    }

    #[test]
    fn truncated_payload_is_an_error_not_a_panic() {
        let message = chat("truncate me");
        let mut bytes = seal(&message, ArchiveKind::Binary, None).unwrap();
        bytes.truncate(bytes.len() - 4);
        assert!(open(&bytes, None).is_err());
    }

    #[test]
    fn compressed_flag_without_decoder_is_refused() {
        // Forge the compressed flag on an uncompressed body.
        let message = chat("hello");
        let mut bytes = seal(&message, ArchiveKind::Binary, None).unwrap();
        bytes[0] |= super::FLAG_COMPRESSED;
        assert_eq!(open(&bytes, None), Err(EnvelopeError::CompressionUnavailable));
    }

    #[cfg(feature = "zstd_support")]
    #[test]
    fn compressed_round_trip() {
        use crate::connection::compression_config::CompressionMode;

        let mut encoder = Encoder::try_new(CompressionMode::Default(3)).unwrap();
        let mut decoder = Decoder::try_new(CompressionMode::Default(3)).unwrap();

        let message = chat(&"repetitive payload ".repeat(64));
        let bytes = seal(&message, ArchiveKind::Binary, Some(&mut encoder)).unwrap();
        let decoded = open(&bytes, Some(&mut decoder)).unwrap();
        assert_eq!(decoded, message);
    }
}
