use driftnet_shared::{ConnectionId, KeyInput, MouseInput};

/// Raw transport activity forwarded from the accept/reader threads into
/// the dispatch loop.
#[derive(Debug)]
pub enum TransportEvent {
    Connected {
        connection: ConnectionId,
    },
    Message {
        connection: ConnectionId,
        payload: Vec<u8>,
    },
    Closed {
        connection: ConnectionId,
    },
}

/// Decoded player input, queued for the broadcast loop's simulate step.
/// The dispatch loop never touches entity state itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Key {
        connection: ConnectionId,
        input: KeyInput,
    },
    Mouse {
        connection: ConnectionId,
        input: MouseInput,
    },
}
