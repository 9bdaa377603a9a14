//! Connection pool: every open connection, indexed by id and by session.

use std::sync::Arc;

use dashmap::DashMap;

use presencehub_core::types::{ConnectionId, SessionId};

use super::handle::ConnectionHandle;

/// Thread-safe pool of all open connections.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    /// Connection ID → connection handle for direct lookup.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
    /// Session ID → connections opened for it (one session may have several tabs).
    by_session: DashMap<SessionId, Vec<ConnectionId>>,
}

impl ConnectionPool {
    /// Creates a new empty connection pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to the pool.
    pub fn add(&self, handle: Arc<ConnectionHandle>) {
        self.by_session
            .entry(handle.session_id)
            .or_default()
            .push(handle.id);
        self.by_id.insert(handle.id, handle);
    }

    /// Removes a connection. Exactly one caller gets `Some` per connection.
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        let (_, handle) = self.by_id.remove(conn_id)?;
        if let Some(mut ids) = self.by_session.get_mut(&handle.session_id) {
            ids.retain(|id| id != conn_id);
        }
        self.by_session
            .remove_if(&handle.session_id, |_, ids| ids.is_empty());
        Some(handle)
    }

    /// Gets a specific connection by ID.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(conn_id).map(|entry| entry.value().clone())
    }

    /// Gets all connections for a session.
    pub fn session_connections(&self, session_id: &SessionId) -> Vec<Arc<ConnectionHandle>> {
        let ids = self
            .by_session
            .get(session_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    /// Returns all connection handles.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Returns total number of open connections.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }
}
