//! Maps transport connections to sessions and keeps those sessions alive.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, warn};

use presencehub_auth::session::SessionExpiryWatcher;
use presencehub_core::config::RetryConfig;
use presencehub_core::error::AppError;
use presencehub_core::result::AppResult;
use presencehub_core::traits::SessionRepository;
use presencehub_core::types::{ConnectionId, SessionData, SessionId};

use crate::retry;

/// Connection → session binding plus session-store access with bounded retry.
pub struct SessionBridge {
    sessions: Arc<dyn SessionRepository>,
    watcher: Arc<SessionExpiryWatcher>,
    bindings: DashMap<ConnectionId, SessionId>,
    // bound connections per session; watch state changes under this entry
    session_refs: DashMap<SessionId, usize>,
    retry: RetryConfig,
}

impl std::fmt::Debug for SessionBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBridge")
            .field("bindings", &self.bindings.len())
            .field("sessions", &self.session_refs.len())
            .finish()
    }
}

impl SessionBridge {
    /// Creates a bridge over the session store.
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        watcher: Arc<SessionExpiryWatcher>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            sessions,
            watcher,
            bindings: DashMap::new(),
            session_refs: DashMap::new(),
            retry,
        }
    }

    /// Records the session a connection was opened for and starts watching it for expiry.
    pub fn bind(&self, connection_id: ConnectionId, session_id: SessionId) {
        if self.bindings.insert(connection_id, session_id).is_some() {
            return;
        }
        let mut refs = self.session_refs.entry(session_id).or_insert(0);
        *refs += 1;
        self.watcher.watch(session_id);
    }

    /// Forgets a connection's binding. Expiry watching stops with the
    /// session's last binding.
    pub fn unbind(&self, connection_id: &ConnectionId) -> Option<SessionId> {
        let (_, session_id) = self.bindings.remove(connection_id)?;
        if let Entry::Occupied(mut refs) = self.session_refs.entry(session_id) {
            *refs.get_mut() = refs.get().saturating_sub(1);
            if *refs.get() == 0 {
                self.watcher.unwatch(&session_id);
                refs.remove();
            }
        }
        Some(session_id)
    }

    /// Number of connections bound to a session.
    pub fn bound_connections(&self, session_id: &SessionId) -> usize {
        self.session_refs.get(session_id).map_or(0, |refs| *refs)
    }

    /// Session of a connection. Fails with a session error if it never completed the handshake.
    pub fn resolve(&self, connection_id: &ConnectionId) -> AppResult<SessionId> {
        self.bindings
            .get(connection_id)
            .map(|entry| *entry.value())
            .ok_or_else(|| {
                AppError::session(format!("Connection {connection_id} has no session"))
            })
    }

    /// Looks up a live session.
    pub async fn lookup(&self, session_id: &SessionId) -> AppResult<Option<SessionData>> {
        let sessions = &self.sessions;
        retry::with_backoff("session lookup", &self.retry, move || {
            sessions.get(session_id)
        })
        .await
    }

    /// Extends the session's expiry window.
    ///
    /// Fails with a session error if the session is gone; the expiry is then
    /// reported to the watcher so other connections of the session learn of it.
    pub async fn touch(&self, session_id: &SessionId) -> AppResult<()> {
        let sessions = &self.sessions;
        let alive = retry::with_backoff("session touch", &self.retry, move || {
            sessions.touch(session_id)
        })
        .await?;

        if alive {
            Ok(())
        } else {
            debug!(session_id = %session_id, "Touch found no session");
            self.watcher.notify_expired(*session_id);
            Err(AppError::session(format!("Session {session_id} has expired")))
        }
    }

    /// Forcibly expires a session (logout) and reports it immediately.
    pub async fn invalidate(&self, session_id: &SessionId) -> AppResult<()> {
        let sessions = &self.sessions;
        retry::with_backoff("session invalidate", &self.retry, move || {
            sessions.expire(session_id)
        })
        .await
        .inspect_err(|e| warn!(session_id = %session_id, error = %e, "Session invalidation failed"))?;

        self.watcher.notify_expired(*session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use presencehub_auth::session::CacheSessionStore;
    use presencehub_cache::memory::MemoryCacheProvider;
    use presencehub_core::config::session::SessionConfig;
    use presencehub_core::error::ErrorKind;
    use presencehub_core::types::Principal;

    fn bridge() -> (SessionBridge, Arc<SessionExpiryWatcher>, Arc<CacheSessionStore>) {
        let store = Arc::new(CacheSessionStore::new(
            Arc::new(MemoryCacheProvider::default()),
            SessionConfig::default(),
        ));
        let watcher = Arc::new(SessionExpiryWatcher::new(
            store.clone(),
            Duration::from_secs(5),
        ));
        (
            SessionBridge::new(store.clone(), watcher.clone(), RetryConfig::default()),
            watcher,
            store,
        )
    }

    #[tokio::test]
    async fn test_resolve_requires_binding() {
        let (bridge, watcher, _) = bridge();
        let conn = ConnectionId::new();
        let err = bridge.resolve(&conn).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Session);

        let sid = SessionId::new();
        bridge.bind(conn, sid);
        assert_eq!(bridge.resolve(&conn).unwrap(), sid);
        assert!(watcher.is_watched(&sid));

        assert_eq!(bridge.unbind(&conn), Some(sid));
        assert!(bridge.resolve(&conn).is_err());
    }

    #[tokio::test]
    async fn test_watch_follows_last_binding() {
        let (bridge, watcher, _) = bridge();
        let sid = SessionId::new();
        let (c1, c2, c3) = (ConnectionId::new(), ConnectionId::new(), ConnectionId::new());

        bridge.bind(c1, sid);
        bridge.bind(c2, sid);
        assert_eq!(bridge.bound_connections(&sid), 2);

        bridge.unbind(&c1);
        assert!(watcher.is_watched(&sid));

        bridge.unbind(&c2);
        assert!(!watcher.is_watched(&sid));
        assert_eq!(bridge.bound_connections(&sid), 0);
        assert!(bridge.unbind(&c2).is_none());

        bridge.bind(c3, sid);
        assert!(watcher.is_watched(&sid));
    }

    #[test]
    fn test_concurrent_bind_and_unbind_keep_watch() {
        let (bridge, watcher, _) = bridge();
        let bridge = Arc::new(bridge);
        let sid = SessionId::new();

        for _ in 0..200 {
            let first = ConnectionId::new();
            bridge.bind(first, sid);

            let unbinding = {
                let bridge = bridge.clone();
                std::thread::spawn(move || bridge.unbind(&first))
            };
            let second = ConnectionId::new();
            let binding = {
                let bridge = bridge.clone();
                std::thread::spawn(move || bridge.bind(second, sid))
            };
            unbinding.join().unwrap();
            binding.join().unwrap();

            assert_eq!(bridge.bound_connections(&sid), 1);
            assert!(watcher.is_watched(&sid));
            bridge.unbind(&second);
            assert!(!watcher.is_watched(&sid));
        }
    }

    #[tokio::test]
    async fn test_touch_live_and_expired() {
        let (bridge, watcher, store) = bridge();
        let session = store.create(Principal::named("alice")).await.unwrap();
        bridge.bind(ConnectionId::new(), session.id);
        let mut events = watcher.subscribe();

        bridge.touch(&session.id).await.unwrap();

        store.expire(&session.id).await.unwrap();
        let err = bridge.touch(&session.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Session);
        assert_eq!(events.recv().await.unwrap().session_id, session.id);
    }

    #[tokio::test]
    async fn test_invalidate_notifies() {
        let (bridge, watcher, store) = bridge();
        let session = store.create(Principal::named("bob")).await.unwrap();
        bridge.bind(ConnectionId::new(), session.id);
        let mut events = watcher.subscribe();

        bridge.invalidate(&session.id).await.unwrap();
        assert!(bridge.lookup(&session.id).await.unwrap().is_none());
        assert_eq!(events.recv().await.unwrap().session_id, session.id);
    }
}
