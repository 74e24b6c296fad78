use std::collections::{BTreeMap, HashMap, HashSet};

use log::warn;

use driftnet_shared::{
    ClientEntry, ConnectionId, Entity, EntityId, FrameSink, TransportError,
};

/// Per-connection server state: identity, transport handle, the snapshot
/// map ("last value this client is known to have" per entity) and the
/// client's current visibility filter.
pub struct ClientSession {
    connection: ConnectionId,
    name: String,
    sink: Box<dyn FrameSink>,
    pub(crate) snapshots: HashMap<EntityId, Entity>,
    pub(crate) scope: HashSet<EntityId>,
    pub(crate) scope_limited: bool,
    ready: bool,
}

impl ClientSession {
    pub fn new(connection: ConnectionId, sink: Box<dyn FrameSink>) -> Self {
        Self {
            connection,
            name: String::new(),
            sink,
            snapshots: HashMap::new(),
            scope: HashSet::new(),
            scope_limited: false,
            ready: false,
        }
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once the client's ready message arrived; only ready sessions
    /// receive broadcasts.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn set_ready(&mut self, name: String) {
        self.name = name;
        self.ready = true;
    }

    /// Replaces the visibility filter wholesale.
    pub fn set_scope(&mut self, ids: HashSet<EntityId>) {
        self.scope = ids;
        self.scope_limited = true;
    }

    /// Adds an entity to this client's visibility filter.
    pub fn scope_include(&mut self, id: EntityId) {
        self.scope_limited = true;
        self.scope.insert(id);
    }

    /// Removes an entity from this client's visibility filter.
    pub fn scope_exclude(&mut self, id: EntityId) {
        self.scope_limited = true;
        self.scope.remove(&id);
    }

    /// Reverts to the default "sees everything" filter.
    pub fn scope_unlimited(&mut self) {
        self.scope_limited = false;
        self.scope.clear();
    }

    pub fn scope_has(&self, id: EntityId) -> bool {
        !self.scope_limited || self.scope.contains(&id)
    }

    pub fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        self.sink.send_frame(payload)
    }
}

/// All live sessions, keyed by connection id. Shared between the dispatch
/// and broadcast loops behind one coarse lock.
pub struct SessionTable {
    sessions: BTreeMap<ConnectionId, ClientSession>,
    next_connection: u16,
    roster_dirty: bool,
}

impl SessionTable {
    pub fn new() -> Self {
        Self {
            sessions: BTreeMap::new(),
            next_connection: 1,
            roster_dirty: false,
        }
    }

    /// Registers a new connection and returns its assigned id.
    pub fn insert(&mut self, sink: Box<dyn FrameSink>) -> ConnectionId {
        let connection = ConnectionId::new(self.next_connection);
        self.next_connection += 1;
        self.sessions
            .insert(connection, ClientSession::new(connection, sink));
        connection
    }

    pub fn remove(&mut self, connection: ConnectionId) -> Option<ClientSession> {
        let session = self.sessions.remove(&connection)?;
        if session.is_ready() {
            self.roster_dirty = true;
        }
        Some(session)
    }

    pub fn get(&self, connection: ConnectionId) -> Option<&ClientSession> {
        self.sessions.get(&connection)
    }

    pub fn get_mut(&mut self, connection: ConnectionId) -> Option<&mut ClientSession> {
        self.sessions.get_mut(&connection)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ClientSession> {
        self.sessions.values_mut()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Roster of ready clients, in connection order.
    pub fn roster(&self) -> Vec<ClientEntry> {
        self.sessions
            .values()
            .filter(|session| session.is_ready())
            .map(|session| ClientEntry {
                connection: session.connection(),
                name: session.name().to_string(),
            })
            .collect()
    }

    pub fn mark_roster_dirty(&mut self) {
        self.roster_dirty = true;
    }

    /// Whether membership changed since the last broadcast; reading resets
    /// the flag so the roster is not resent every tick.
    pub fn take_roster_dirty(&mut self) -> bool {
        std::mem::take(&mut self.roster_dirty)
    }

    /// Sends a sealed payload to every ready session. Send failures are
    /// logged; actual teardown happens when the reader thread reports the
    /// connection closed.
    pub fn broadcast(&mut self, payload: &[u8]) {
        for session in self.sessions.values_mut() {
            if !session.is_ready() {
                continue;
            }
            if let Err(error) = session.send(payload) {
                warn!("send to {} failed: {error}", session.connection());
            }
        }
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}
