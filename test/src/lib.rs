//! Helpers shared by the cross-crate integration tests.

use driftnet_server::ClientSession;
use driftnet_shared::{
    loopback, open, seal, ArchiveKind, ConnectionId, DeltaMessage, LoopbackSource, Message,
    Quantizer,
};

/// Worst-case error for a default-quantized in-range value.
pub fn epsilon() -> f32 {
    Quantizer::default().epsilon()
}

/// A client session wired to an in-process sink, plus the paired source
/// for inspecting whatever the session sends.
pub fn loopback_session(connection: u16) -> (ClientSession, LoopbackSource) {
    let (sink, source) = loopback();
    (
        ClientSession::new(ConnectionId::new(connection), Box::new(sink)),
        source,
    )
}

/// Pushes a delta through the full envelope codec and back, exactly as the
/// wire would, and returns what the client decodes.
pub fn ship(delta: &DeltaMessage, archive: ArchiveKind) -> DeltaMessage {
    let message = Message::GameState(delta.clone());
    let bytes = seal(&message, archive, None).expect("seal");
    match open(&bytes, None).expect("open") {
        Message::GameState(delta) => delta,
        other => panic!("expected game state, decoded {other:?}"),
    }
}
