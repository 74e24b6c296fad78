//! # Driftnet Server
//! The authoritative end of the replication protocol: accepts connections,
//! tracks per-client snapshots and visibility, and broadcasts minimal
//! per-client deltas at a fixed rate.

pub mod diff;
pub mod error;
pub mod events;
pub mod script;
pub mod server;
pub mod server_config;
pub mod session;

pub use diff::diff_session;
pub use error::ServerError;
pub use events::{InputEvent, TransportEvent};
pub use script::{CommandSink, LogSink};
pub use server::{GameServer, ServerHandle, SimulateFn};
pub use server_config::ServerConfig;
pub use session::{ClientSession, SessionTable};
