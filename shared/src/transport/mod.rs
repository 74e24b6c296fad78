//! Reliable ordered frame transport.
//!
//! The protocol assumes in-order, reliable delivery per connection; TCP
//! with length-prefixed frames provides exactly that. `FrameSink` is the
//! seam the server writes through, so sessions can also be wired to an
//! in-process loopback queue for local play and tests.

pub mod error;
pub mod frame;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use self::error::TransportError;

/// Write half of a reliable ordered channel.
pub trait FrameSink: Send {
    fn send_frame(&mut self, payload: &[u8]) -> Result<(), TransportError>;
}

/// Creates a connected in-process sink/source pair.
pub fn loopback() -> (LoopbackSink, LoopbackSource) {
    let queue = Arc::new(Mutex::new(VecDeque::new()));
    (
        LoopbackSink {
            queue: queue.clone(),
        },
        LoopbackSource { queue },
    )
}

/// In-process frame sink; everything sent becomes available on the paired
/// `LoopbackSource`.
#[derive(Clone)]
pub struct LoopbackSink {
    queue: Arc<Mutex<VecDeque<Vec<u8>>>>,
}

impl FrameSink for LoopbackSink {
    fn send_frame(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(payload.to_vec());
        }
        Ok(())
    }
}

/// Read half of the in-process loopback.
#[derive(Clone)]
pub struct LoopbackSource {
    queue: Arc<Mutex<VecDeque<Vec<u8>>>>,
}

impl LoopbackSource {
    pub fn try_recv(&self) -> Option<Vec<u8>> {
        self.queue.lock().ok()?.pop_front()
    }

    pub fn depth(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }
}
