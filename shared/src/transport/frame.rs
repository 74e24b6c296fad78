use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use crate::constants::MAX_FRAME_BYTES;
use crate::transport::error::TransportError;
use crate::transport::FrameSink;

/// Write half of a framed TCP connection. Each frame is a u32 little-endian
/// length prefix followed by the payload bytes.
pub struct FrameSender {
    stream: TcpStream,
}

impl FrameSender {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    pub fn try_clone(&self) -> Result<Self, TransportError> {
        Ok(Self {
            stream: self.stream.try_clone()?,
        })
    }

    pub fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if payload.len() > MAX_FRAME_BYTES {
            return Err(TransportError::OversizedFrame {
                bytes: payload.len(),
            });
        }
        let prefix = (payload.len() as u32).to_le_bytes();
        self.write_all(&prefix)?;
        self.write_all(payload)?;
        self.stream.flush()?;
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.stream.write_all(bytes).map_err(|error| {
            if is_peer_loss(error.kind()) {
                TransportError::Closed
            } else {
                TransportError::Io(error)
            }
        })
    }

    pub fn shutdown(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

impl FrameSink for FrameSender {
    fn send_frame(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        self.send(payload)
    }
}

/// Read half of a framed TCP connection.
///
/// The reader is an incremental state machine over an internal buffer, so
/// it serves both uses this protocol has: a blocking per-connection reader
/// thread (with a read timeout so shutdown flags get checked), and the
/// client's non-blocking once-per-frame drain. `recv` returns `Ok(None)`
/// when no complete frame is available yet and `Err(Closed)` when the peer
/// is gone.
pub struct FrameReader {
    stream: TcpStream,
    buffer: Vec<u8>,
}

impl FrameReader {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            buffer: Vec::with_capacity(4096),
        }
    }

    pub fn set_nonblocking(&self, on: bool) -> Result<(), TransportError> {
        self.stream.set_nonblocking(on)?;
        Ok(())
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), TransportError> {
        self.stream.set_read_timeout(timeout)?;
        Ok(())
    }

    pub fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            if let Some(frame) = self.take_buffered_frame()? {
                return Ok(Some(frame));
            }

            let mut chunk = [0u8; 4096];
            match self.stream.read(&mut chunk) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(count) => self.buffer.extend_from_slice(&chunk[..count]),
                Err(error) => match error.kind() {
                    ErrorKind::WouldBlock | ErrorKind::TimedOut => return Ok(None),
                    ErrorKind::Interrupted => continue,
                    kind if is_peer_loss(kind) => return Err(TransportError::Closed),
                    _ => return Err(TransportError::Io(error)),
                },
            }
        }
    }

    fn take_buffered_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if self.buffer.len() < 4 {
            return Ok(None);
        }
        let mut prefix = [0u8; 4];
        prefix.copy_from_slice(&self.buffer[..4]);
        let length = u32::from_le_bytes(prefix) as usize;
        if length > MAX_FRAME_BYTES {
            return Err(TransportError::OversizedFrame { bytes: length });
        }
        if self.buffer.len() < 4 + length {
            return Ok(None);
        }
        let frame = self.buffer[4..4 + length].to_vec();
        self.buffer.drain(..4 + length);
        Ok(Some(frame))
    }

    pub fn shutdown(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

fn is_peer_loss(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    #[test]
    fn frames_survive_the_wire_in_order() {
        let (client, server) = tcp_pair();
        let mut sender = FrameSender::new(client);
        let mut reader = FrameReader::new(server);

        sender.send(b"alpha").unwrap();
        sender.send(b"").unwrap();
        sender.send(b"omega").unwrap();

        assert_eq!(reader.recv().unwrap(), Some(b"alpha".to_vec()));
        assert_eq!(reader.recv().unwrap(), Some(b"".to_vec()));
        assert_eq!(reader.recv().unwrap(), Some(b"omega".to_vec()));
    }

    #[test]
    fn nonblocking_recv_returns_none_when_starved() {
        let (client, server) = tcp_pair();
        let _sender = FrameSender::new(client);
        let mut reader = FrameReader::new(server);
        reader.set_nonblocking(true).unwrap();
        assert!(matches!(reader.recv(), Ok(None)));
    }

    #[test]
    fn peer_teardown_reads_as_closed() {
        let (client, server) = tcp_pair();
        let mut reader = FrameReader::new(server);
        drop(client);
        assert!(matches!(reader.recv(), Err(TransportError::Closed)));
    }

    #[test]
    fn oversized_prefix_is_rejected_before_allocation() {
        let (mut client, server) = tcp_pair();
        let mut reader = FrameReader::new(server);
        // Length prefix far beyond the frame cap.
        client
            .write_all(&(u32::MAX).to_le_bytes())
            .unwrap();
        client.flush().unwrap();
        assert!(matches!(
            reader.recv(),
            Err(TransportError::OversizedFrame { .. })
        ));
    }

    #[test]
    fn partial_frames_assemble_across_reads() {
        let (mut client, server) = tcp_pair();
        let mut reader = FrameReader::new(server);
        reader.set_nonblocking(true).unwrap();

        let payload = b"split in two";
        let prefix = (payload.len() as u32).to_le_bytes();
        client.write_all(&prefix).unwrap();
        client.write_all(&payload[..5]).unwrap();
        client.flush().unwrap();

        // Wait for the first half to land, then confirm no frame yet.
        std::thread::sleep(Duration::from_millis(50));
        assert!(matches!(reader.recv(), Ok(None)));

        client.write_all(&payload[5..]).unwrap();
        client.flush().unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(reader.recv().unwrap(), Some(payload.to_vec()));
    }
}
