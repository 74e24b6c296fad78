//! # Driftnet Client
//! The receiving end of the replication protocol: drains the transport
//! once per frame, decodes envelopes, and reconciles game-state deltas
//! into a local entity graph for the renderer to consume.

pub mod client;
pub mod client_config;
pub mod error;
pub mod reconcile;

pub use client::{ClientEvent, GameClient};
pub use client_config::ClientConfig;
pub use error::ClientError;
pub use reconcile::{apply_delta, WorldEvent};
