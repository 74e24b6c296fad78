//! Server loop set.
//!
//! Three kinds of worker run concurrently:
//! - an accept loop that registers sessions and spawns one blocking reader
//!   thread per connection,
//! - a dispatch loop that drains decoded transport events and routes them
//!   (inputs are queued for the simulation, chat and script text go to the
//!   command sink, disconnects tear sessions down),
//! - a fixed-interval broadcast loop that owns the authoritative world,
//!   runs the simulate step and sends each ready session its delta.
//!
//! The broadcast loop is the sole mutator of entity state. The session
//! table and the command sink sit behind one coarse mutex each. Faults
//! inside a loop are logged and never unwind past the loop boundary.

use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use driftnet_shared::{
    open, schema_fingerprint, seal, ArchiveKind, Chat, ConnectionId, Decoder, Encoder,
    FrameReader, FrameSender, Message, TransportError, WorldRegistry,
};

use crate::diff::diff_session;
use crate::error::ServerError;
use crate::events::{InputEvent, TransportEvent};
use crate::script::CommandSink;
use crate::server_config::ServerConfig;
use crate::session::SessionTable;

/// Simulation step supplied by the embedding engine. Runs once per
/// broadcast tick with the inputs drained since the previous tick.
pub type SimulateFn = Box<dyn FnMut(&mut WorldRegistry, &[InputEvent], Duration) + Send>;

/// How often blocking reads and queue waits wake up to check the stop flag.
const WAKE_INTERVAL: Duration = Duration::from_millis(250);

pub struct GameServer;

impl GameServer {
    /// Binds the listener and spawns the worker threads. Bind or codec
    /// setup failure is fatal and reported here; after this returns, the
    /// server only stops through [`ServerHandle::shutdown`].
    pub fn spawn(
        config: ServerConfig,
        world: WorldRegistry,
        simulate: SimulateFn,
        sink: Box<dyn CommandSink>,
    ) -> Result<ServerHandle, ServerError> {
        let listener = TcpListener::bind(("0.0.0.0", config.port)).map_err(|source| {
            TransportError::Bind {
                port: config.port,
                source,
            }
        })?;
        let local_addr = listener.local_addr().map_err(TransportError::Io)?;
        listener.set_nonblocking(true).map_err(TransportError::Io)?;

        // Codec setup fails fast, before any thread starts.
        let broadcast_encoder = new_encoder(&config)?;
        let dispatch_encoder = new_encoder(&config)?;
        let handle_encoder = new_encoder(&config)?;
        let dispatch_decoder = match &config.compression {
            Some(compression) => match &compression.client_to_server {
                Some(mode) => Some(Decoder::try_new(mode.clone())?),
                None => None,
            },
            None => None,
        };

        let stop = Arc::new(AtomicBool::new(false));
        let sessions = Arc::new(Mutex::new(SessionTable::new()));
        let sink = Arc::new(Mutex::new(sink));
        let inputs: Arc<Mutex<Vec<InputEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>();

        let mut workers = Vec::new();

        workers.push(spawn_accept_loop(
            listener,
            stop.clone(),
            sessions.clone(),
            event_tx,
        ));
        workers.push(spawn_dispatch_loop(
            event_rx,
            dispatch_decoder,
            dispatch_encoder,
            config.archive,
            stop.clone(),
            sessions.clone(),
            sink.clone(),
            inputs.clone(),
        ));
        workers.push(spawn_broadcast_loop(
            world,
            simulate,
            broadcast_encoder,
            config.archive,
            config.broadcast_interval,
            stop.clone(),
            sessions.clone(),
            inputs,
        ));

        info!("listening on {local_addr}");
        Ok(ServerHandle {
            local_addr,
            stop,
            sessions,
            sink,
            archive: config.archive,
            encoder: handle_encoder,
            ack_timeout: config.disconnect_ack_timeout,
            workers,
        })
    }
}

/// Owner of the running server. Dropping the handle without calling
/// [`shutdown`](Self::shutdown) detaches the workers; shutting down sends
/// every client a disconnect notice, waits a bounded time for the
/// acknowledgements, then stops and joins all loops.
pub struct ServerHandle {
    local_addr: SocketAddr,
    stop: Arc<AtomicBool>,
    sessions: Arc<Mutex<SessionTable>>,
    sink: Arc<Mutex<Box<dyn CommandSink>>>,
    archive: ArchiveKind,
    encoder: Option<Encoder>,
    ack_timeout: Duration,
    workers: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().map(|table| table.len()).unwrap_or(0)
    }

    /// Sends a chat line to every ready client.
    pub fn broadcast_chat(&mut self, text: &str) {
        let message = Message::Chat(Chat {
            text: text.to_string(),
        });
        match seal(&message, self.archive, self.encoder.as_mut()) {
            Ok(bytes) => {
                if let Ok(mut table) = self.sessions.lock() {
                    table.broadcast(&bytes);
                }
            }
            Err(error) => warn!("failed to seal chat: {error}"),
        }
    }

    /// Feeds a command line to the script sink, as if a client had sent it.
    pub fn run_command(&mut self, text: &str) {
        if let Ok(mut sink) = self.sink.lock() {
            sink.execute("server", text);
        }
    }

    /// Notifies every client, waits up to the configured timeout for their
    /// acknowledgements, then stops and joins all workers unconditionally.
    pub fn shutdown(mut self) {
        if let Ok(mut table) = self.sessions.lock() {
            for session in table.iter_mut() {
                let notice = Message::Disconnect {
                    connection: session.connection(),
                };
                match seal(&notice, self.archive, self.encoder.as_mut()) {
                    Ok(bytes) => {
                        let _ = session.send(&bytes);
                    }
                    Err(error) => warn!("failed to seal disconnect notice: {error}"),
                }
            }
        }

        // The dispatch loop removes each session when its ack arrives.
        let deadline = Instant::now() + self.ack_timeout;
        while Instant::now() < deadline {
            if self.session_count() == 0 {
                break;
            }
            thread::sleep(Duration::from_millis(25));
        }

        self.stop.store(true, Ordering::SeqCst);
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        info!("server stopped");
    }
}

fn new_encoder(config: &ServerConfig) -> Result<Option<Encoder>, ServerError> {
    match &config.compression {
        Some(compression) => match &compression.server_to_client {
            Some(mode) => Ok(Some(Encoder::try_new(mode.clone())?)),
            None => Ok(None),
        },
        None => Ok(None),
    }
}

fn spawn_accept_loop(
    listener: TcpListener,
    stop: Arc<AtomicBool>,
    sessions: Arc<Mutex<SessionTable>>,
    event_tx: mpsc::Sender<TransportEvent>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("driftnet-accept".to_string())
        .spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, peer)) => {
                        let _ = stream.set_nodelay(true);
                        let sender = match stream.try_clone().map(FrameSender::new) {
                            Ok(sender) => sender,
                            Err(error) => {
                                warn!("could not split stream for {peer}: {error}");
                                continue;
                            }
                        };
                        let reader = FrameReader::new(stream);
                        if let Err(error) = reader.set_read_timeout(Some(WAKE_INTERVAL)) {
                            warn!("could not configure reader for {peer}: {error}");
                            continue;
                        }

                        let connection = match sessions.lock() {
                            Ok(mut table) => table.insert(Box::new(sender)),
                            Err(_) => continue,
                        };
                        info!("accepted {connection} from {peer}");
                        let _ = event_tx.send(TransportEvent::Connected { connection });

                        spawn_reader_loop(connection, reader, stop.clone(), event_tx.clone());
                    }
                    Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(50));
                    }
                    Err(error) => {
                        warn!("accept failed: {error}");
                        thread::sleep(Duration::from_millis(50));
                    }
                }
            }
        })
        .expect("failed to spawn accept thread")
}

fn spawn_reader_loop(
    connection: ConnectionId,
    mut reader: FrameReader,
    stop: Arc<AtomicBool>,
    event_tx: mpsc::Sender<TransportEvent>,
) {
    let reader_tx = event_tx.clone();
    let spawned = thread::Builder::new()
        .name(format!("driftnet-{connection}"))
        .spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                match reader.recv() {
                    Ok(Some(payload)) => {
                        let _ = reader_tx.send(TransportEvent::Message {
                            connection,
                            payload,
                        });
                    }
                    // Read timeout: take another look at the stop flag.
                    Ok(None) => continue,
                    Err(TransportError::Closed) => {
                        let _ = reader_tx.send(TransportEvent::Closed { connection });
                        break;
                    }
                    Err(error) => {
                        warn!("reader for {connection} failed: {error}");
                        let _ = reader_tx.send(TransportEvent::Closed { connection });
                        break;
                    }
                }
            }
        });
    if let Err(error) = spawned {
        warn!("failed to spawn reader for {connection}: {error}");
        let _ = event_tx.send(TransportEvent::Closed { connection });
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_dispatch_loop(
    event_rx: mpsc::Receiver<TransportEvent>,
    mut decoder: Option<Decoder>,
    mut encoder: Option<Encoder>,
    archive: ArchiveKind,
    stop: Arc<AtomicBool>,
    sessions: Arc<Mutex<SessionTable>>,
    sink: Arc<Mutex<Box<dyn CommandSink>>>,
    inputs: Arc<Mutex<Vec<InputEvent>>>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("driftnet-dispatch".to_string())
        .spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                let event = match event_rx.recv_timeout(WAKE_INTERVAL) {
                    Ok(event) => event,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                };
                match event {
                    TransportEvent::Connected { connection } => {
                        debug!("{connection} awaiting ready");
                    }
                    TransportEvent::Closed { connection } => {
                        if let Ok(mut table) = sessions.lock() {
                            if let Some(session) = table.remove(connection) {
                                info!("{connection} ({}) disconnected", session.name());
                            }
                        }
                    }
                    TransportEvent::Message {
                        connection,
                        payload,
                    } => {
                        // Decode failures drop the message, never the loop.
                        let message = match open(&payload, decoder.as_mut()) {
                            Ok(message) => message,
                            Err(error) => {
                                warn!("dropping undecodable message from {connection}: {error}");
                                continue;
                            }
                        };
                        dispatch_message(
                            connection,
                            message,
                            &mut encoder,
                            archive,
                            &sessions,
                            &sink,
                            &inputs,
                        );
                    }
                }
            }
        })
        .expect("failed to spawn dispatch thread")
}

fn dispatch_message(
    connection: ConnectionId,
    message: Message,
    encoder: &mut Option<Encoder>,
    archive: ArchiveKind,
    sessions: &Arc<Mutex<SessionTable>>,
    sink: &Arc<Mutex<Box<dyn CommandSink>>>,
    inputs: &Arc<Mutex<Vec<InputEvent>>>,
) {
    match message {
        Message::Ready(ready) => {
            let ours = schema_fingerprint();
            if ready.schema != ours {
                warn!(
                    "{connection} ({}) built against schema {:#010x}, ours is {:#010x}; refusing",
                    ready.name, ready.schema, ours
                );
                if let Ok(mut table) = sessions.lock() {
                    if let Some(session) = table.get_mut(connection) {
                        let notice = Message::Disconnect { connection };
                        if let Ok(bytes) = seal(&notice, archive, encoder.as_mut()) {
                            let _ = session.send(&bytes);
                        }
                    }
                    table.remove(connection);
                }
                return;
            }
            if let Ok(mut table) = sessions.lock() {
                let known = if let Some(session) = table.get_mut(connection) {
                    info!("{connection} ready as `{}`", ready.name);
                    session.set_ready(ready.name);
                    true
                } else {
                    false
                };
                if known {
                    table.mark_roster_dirty();
                }
            }
        }
        Message::Key(input) => {
            if let Ok(mut queue) = inputs.lock() {
                queue.push(InputEvent::Key { connection, input });
            }
        }
        Message::Mouse(input) => {
            if let Ok(mut queue) = inputs.lock() {
                queue.push(InputEvent::Mouse { connection, input });
            }
        }
        Message::Chat(chat) => {
            let origin = sessions
                .lock()
                .ok()
                .and_then(|table| table.get(connection).map(|s| s.name().to_string()))
                .unwrap_or_else(|| connection.to_string());
            if let Ok(mut sink) = sink.lock() {
                sink.execute(&origin, &chat.text);
            }
            let relay = Message::Chat(Chat {
                text: format!("{origin}: {}", chat.text),
            });
            match seal(&relay, archive, encoder.as_mut()) {
                Ok(bytes) => {
                    if let Ok(mut table) = sessions.lock() {
                        table.broadcast(&bytes);
                    }
                }
                Err(error) => warn!("failed to seal chat relay: {error}"),
            }
        }
        Message::ScriptCommand(command) => {
            let origin = sessions
                .lock()
                .ok()
                .and_then(|table| table.get(connection).map(|s| s.name().to_string()))
                .unwrap_or_else(|| connection.to_string());
            if let Ok(mut sink) = sink.lock() {
                sink.execute(&origin, &command.text);
            }
        }
        Message::KillShot(shot) => {
            // Cosmetic, no state impact: relay to everyone as-is.
            match seal(&Message::KillShot(shot), archive, encoder.as_mut()) {
                Ok(bytes) => {
                    if let Ok(mut table) = sessions.lock() {
                        table.broadcast(&bytes);
                    }
                }
                Err(error) => warn!("failed to seal killshot relay: {error}"),
            }
        }
        Message::Disconnect { .. } => {
            if let Ok(mut table) = sessions.lock() {
                if let Some(session) = table.get_mut(connection) {
                    if let Ok(bytes) = seal(&Message::DisconnectAck, archive, encoder.as_mut()) {
                        let _ = session.send(&bytes);
                    }
                }
                if let Some(session) = table.remove(connection) {
                    info!("{connection} ({}) left", session.name());
                }
            }
        }
        Message::DisconnectAck => {
            // Completes a server-initiated disconnect.
            if let Ok(mut table) = sessions.lock() {
                table.remove(connection);
            }
            debug!("{connection} acknowledged disconnect");
        }
        Message::GameState(_) => {
            warn!("{connection} sent a game-state delta to the server; dropping");
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_broadcast_loop(
    mut world: WorldRegistry,
    mut simulate: SimulateFn,
    mut encoder: Option<Encoder>,
    archive: ArchiveKind,
    interval: Duration,
    stop: Arc<AtomicBool>,
    sessions: Arc<Mutex<SessionTable>>,
    inputs: Arc<Mutex<Vec<InputEvent>>>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("driftnet-broadcast".to_string())
        .spawn(move || {
            let mut last_tick = Instant::now();
            while !stop.load(Ordering::SeqCst) {
                let now = Instant::now();
                let elapsed = now - last_tick;
                last_tick = now;

                let drained: Vec<InputEvent> = match inputs.lock() {
                    Ok(mut queue) => queue.drain(..).collect(),
                    Err(_) => Vec::new(),
                };
                simulate(&mut world, &drained, elapsed);

                if let Ok(mut table) = sessions.lock() {
                    let table_changed = table.take_roster_dirty();
                    let roster = table_changed.then(|| table.roster());
                    for session in table.iter_mut() {
                        if !session.is_ready() {
                            continue;
                        }
                        let mut delta = diff_session(&world, session);
                        if delta.is_empty() && !table_changed {
                            continue;
                        }
                        delta.table_changed = table_changed;
                        delta.client_table = roster.clone();

                        let message = Message::GameState(delta);
                        match seal(&message, archive, encoder.as_mut()) {
                            Ok(bytes) => {
                                // Payload sizes go to the diagnostic log for
                                // bandwidth tuning.
                                debug!(
                                    "broadcast {} bytes to {}",
                                    bytes.len(),
                                    session.connection()
                                );
                                if let Err(error) = session.send(&bytes) {
                                    warn!(
                                        "broadcast to {} failed: {error}",
                                        session.connection()
                                    );
                                }
                            }
                            Err(error) => {
                                warn!(
                                    "failed to seal delta for {}: {error}",
                                    session.connection()
                                );
                            }
                        }
                    }
                }

                let spent = last_tick.elapsed();
                if spent < interval {
                    thread::sleep(interval - spent);
                }
            }
        })
        .expect("failed to spawn broadcast thread")
}
