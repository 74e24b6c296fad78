use std::net::TcpStream;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use driftnet_shared::{
    open, schema_fingerprint, seal, ArchiveKind, ClientEntry, ConnectionId, Decoder, Encoder,
    FrameReader, FrameSender, KeyInput, KillShot, Message, MouseInput, Ready, TransportError,
    WorldRegistry,
};

use crate::client_config::ClientConfig;
use crate::error::ClientError;
use crate::reconcile::{apply_delta, WorldEvent};

/// Everything the embedding application needs to react to after a frame's
/// worth of network drain.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The server's roster changed; the new table rides along.
    Roster(Vec<ClientEntry>),
    Chat { text: String },
    KillShot(KillShot),
    World(WorldEvent),
    /// The connection is gone, by server notice or transport loss.
    Disconnected,
}

/// A connected replication client. Drives one non-blocking drain of the
/// transport per frame via [`update`](Self::update); the reconciled world
/// is available through [`world`](Self::world) for rendering.
pub struct GameClient {
    sender: FrameSender,
    reader: FrameReader,
    archive: ArchiveKind,
    encoder: Option<Encoder>,
    decoder: Option<Decoder>,
    world: WorldRegistry,
    roster: Vec<ClientEntry>,
    connection: Option<ConnectionId>,
    name: String,
    ack_timeout: Duration,
    closed: bool,
}

impl GameClient {
    /// Connects, splits the stream, and immediately announces readiness
    /// with the display name and schema fingerprint. Failure here is fatal
    /// to the session; the caller surfaces it on the pre-game screen.
    pub fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let addr = format!("{}:{}", config.host, config.port);
        let stream = TcpStream::connect(&addr).map_err(|source| TransportError::Connect {
            addr: addr.clone(),
            source,
        })?;
        let _ = stream.set_nodelay(true);
        let sender = FrameSender::new(stream.try_clone().map_err(TransportError::Io)?);
        let reader = FrameReader::new(stream);
        reader.set_nonblocking(true)?;

        let encoder = match &config.compression {
            Some(compression) => match &compression.client_to_server {
                Some(mode) => Some(Encoder::try_new(mode.clone())?),
                None => None,
            },
            None => None,
        };
        let decoder = match &config.compression {
            Some(compression) => match &compression.server_to_client {
                Some(mode) => Some(Decoder::try_new(mode.clone())?),
                None => None,
            },
            None => None,
        };

        let mut client = Self {
            sender,
            reader,
            archive: config.archive,
            encoder,
            decoder,
            world: WorldRegistry::new(),
            roster: Vec::new(),
            connection: None,
            name: config.name.clone(),
            ack_timeout: config.disconnect_ack_timeout,
            closed: false,
        };
        client.send(&Message::Ready(Ready {
            name: config.name.clone(),
            schema: schema_fingerprint(),
        }))?;
        info!("connected to {addr} as `{}`", config.name);
        Ok(client)
    }

    fn send(&mut self, message: &Message) -> Result<(), ClientError> {
        let bytes = seal(message, self.archive, self.encoder.as_mut())?;
        self.sender.send(&bytes)?;
        Ok(())
    }

    /// Drains everything the transport has buffered and applies it.
    /// Decode failures are logged and the offending message dropped; the
    /// connection stays open.
    pub fn update(&mut self) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        if self.closed {
            return events;
        }
        loop {
            match self.reader.recv() {
                Ok(Some(payload)) => match open(&payload, self.decoder.as_mut()) {
                    Ok(message) => self.dispatch(message, &mut events),
                    Err(error) => warn!("dropping undecodable message: {error}"),
                },
                Ok(None) => break,
                Err(TransportError::Closed) => {
                    info!("server connection closed");
                    self.closed = true;
                    events.push(ClientEvent::Disconnected);
                    break;
                }
                Err(error) => {
                    warn!("transport fault: {error}");
                    self.closed = true;
                    events.push(ClientEvent::Disconnected);
                    break;
                }
            }
        }
        events
    }

    fn dispatch(&mut self, message: Message, events: &mut Vec<ClientEvent>) {
        match message {
            Message::GameState(delta) => {
                if delta.table_changed {
                    if let Some(table) = &delta.client_table {
                        self.roster = table.clone();
                        self.connection = table
                            .iter()
                            .find(|entry| entry.name == self.name)
                            .map(|entry| entry.connection);
                        events.push(ClientEvent::Roster(table.clone()));
                    }
                }
                for world_event in apply_delta(&delta, &mut self.world) {
                    events.push(ClientEvent::World(world_event));
                }
            }
            Message::Chat(chat) => events.push(ClientEvent::Chat { text: chat.text }),
            Message::KillShot(shot) => events.push(ClientEvent::KillShot(shot)),
            Message::Disconnect { .. } => {
                if let Err(error) = self.send(&Message::DisconnectAck) {
                    debug!("could not acknowledge disconnect: {error}");
                }
                self.closed = true;
                events.push(ClientEvent::Disconnected);
            }
            Message::DisconnectAck => {
                debug!("stray disconnect acknowledgement");
            }
            _ => warn!("unexpected message from server; dropping"),
        }
    }

    pub fn send_key(&mut self, input: KeyInput) -> Result<(), ClientError> {
        self.send(&Message::Key(input))
    }

    pub fn send_mouse(&mut self, input: MouseInput) -> Result<(), ClientError> {
        self.send(&Message::Mouse(input))
    }

    pub fn send_chat(&mut self, text: &str) -> Result<(), ClientError> {
        self.send(&Message::Chat(driftnet_shared::Chat {
            text: text.to_string(),
        }))
    }

    pub fn send_command(&mut self, text: &str) -> Result<(), ClientError> {
        self.send(&Message::ScriptCommand(driftnet_shared::ScriptCommand {
            text: text.to_string(),
        }))
    }

    pub fn send_killshot(&mut self, shot: KillShot) -> Result<(), ClientError> {
        self.send(&Message::KillShot(shot))
    }

    /// The reconciled local entity graph.
    pub fn world(&self) -> &WorldRegistry {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut WorldRegistry {
        &mut self.world
    }

    pub fn roster(&self) -> &[ClientEntry] {
        &self.roster
    }

    /// Our connection id, once a roster naming us has arrived.
    pub fn connection(&self) -> Option<ConnectionId> {
        self.connection
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Sends the disconnect notice, waits up to the configured timeout for
    /// the server's acknowledgement, then tears the connection down
    /// unconditionally.
    pub fn disconnect(mut self) -> Result<(), ClientError> {
        if self.closed {
            return Ok(());
        }
        let connection = self.connection.unwrap_or(ConnectionId::new(0));
        self.send(&Message::Disconnect { connection })?;

        let deadline = Instant::now() + self.ack_timeout;
        'wait: while Instant::now() < deadline {
            match self.reader.recv() {
                Ok(Some(payload)) => match open(&payload, self.decoder.as_mut()) {
                    Ok(Message::DisconnectAck) => break 'wait,
                    // Late broadcasts can still be in flight; skip them.
                    Ok(_) => continue,
                    Err(error) => {
                        warn!("dropping undecodable message while disconnecting: {error}");
                    }
                },
                Ok(None) => thread::sleep(Duration::from_millis(10)),
                Err(_) => break 'wait,
            }
        }

        self.sender.shutdown();
        info!("disconnected");
        Ok(())
    }
}
