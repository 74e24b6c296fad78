//! # Driftnet Shared
//! Common functionality shared between driftnet-server & driftnet-client
//! crates: the entity model and its replicated field schema, the attribute
//! change-tracker, the quantization codec, the wire message taxonomy, the
//! envelope codec and the frame transport.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

pub use driftnet_archive::{
    ArchiveError, ArchiveRead, ArchiveWrite, BinaryReader, BinaryWriter, Marshal, TextReader,
    TextWriter,
};

mod connection;
mod constants;
mod messages;
mod quantize;
mod transport;
mod types;
pub(crate) mod wire;
mod world;

pub use connection::{
    compression_config::{CompressionConfig, CompressionMode},
    decoder::Decoder,
    encoder::Encoder,
    envelope::{open, seal, ArchiveKind},
    error::{DecoderError, EncoderError, EnvelopeError},
};
pub use constants::{MAX_FRAME_BYTES, SCHEMA_VERSION};
pub use messages::{
    delta::{ClientEntry, DeltaMessage, EntityUpdate, RemovalReason},
    Chat, KeyInput, KillShot, Message, MouseInput, Ready, ScriptCommand,
};
pub use quantize::Quantizer;
pub use transport::{
    error::TransportError,
    frame::{FrameReader, FrameSender},
    loopback, FrameSink, LoopbackSink, LoopbackSource,
};
pub use types::{ConnectionId, EntityId};
pub use world::{
    entity::{Entity, EntityKind, KindState, NetPriority},
    error::WorldError,
    graph::WorldRegistry,
    schema::{field_count, kind_schema, schema_fingerprint, FieldDescriptor, FieldType, FieldValue},
    tracker::{apply_update, full_mask, record_changes, DiffMask, FieldCursor},
};
