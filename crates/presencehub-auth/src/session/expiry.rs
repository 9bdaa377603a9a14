//! Session expiry detection.
//!
//! The cache expires sessions silently, so sessions that back live
//! connections are registered here and polled. Explicit invalidation
//! reports through [`SessionExpiryWatcher::notify_expired`] without waiting
//! for the next poll.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use presencehub_core::traits::SessionRepository;
use presencehub_core::types::SessionId;

/// Emitted once per watched session when it disappears from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionExpired {
    /// The session that is gone.
    pub session_id: SessionId,
}

/// Polls watched sessions and broadcasts [`SessionExpired`] events.
pub struct SessionExpiryWatcher {
    sessions: Arc<dyn SessionRepository>,
    watched: DashSet<SessionId>,
    events: broadcast::Sender<SessionExpired>,
    poll_interval: Duration,
}

impl std::fmt::Debug for SessionExpiryWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionExpiryWatcher")
            .field("watched", &self.watched.len())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl SessionExpiryWatcher {
    /// Creates a watcher polling every `poll_interval`.
    pub fn new(sessions: Arc<dyn SessionRepository>, poll_interval: Duration) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            sessions,
            watched: DashSet::new(),
            events,
            poll_interval,
        }
    }

    /// Starts watching a session.
    pub fn watch(&self, session_id: SessionId) {
        self.watched.insert(session_id);
    }

    /// Stops watching a session. Returns true if it was watched.
    pub fn unwatch(&self, session_id: &SessionId) -> bool {
        self.watched.remove(session_id).is_some()
    }

    /// Whether `session_id` is currently watched.
    pub fn is_watched(&self, session_id: &SessionId) -> bool {
        self.watched.contains(session_id)
    }

    /// Subscribes to expiry events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionExpired> {
        self.events.subscribe()
    }

    /// Reports an expiry. Emits at most one event per watch registration.
    pub fn notify_expired(&self, session_id: SessionId) -> bool {
        if !self.unwatch(&session_id) {
            return false;
        }
        info!(session_id = %session_id, "Session expired");
        // no receivers is fine: nothing is connected to care
        let _ = self.events.send(SessionExpired { session_id });
        true
    }

    /// Runs one polling pass. Returns the number of sessions found expired.
    pub async fn poll_once(&self) -> usize {
        let ids: Vec<SessionId> = self.watched.iter().map(|id| *id).collect();
        let mut expired = 0;

        for id in ids {
            match self.sessions.get(&id).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    if self.notify_expired(id) {
                        expired += 1;
                    }
                }
                Err(e) => {
                    // transient: try again on the next pass
                    warn!(session_id = %id, error = %e, "Session expiry probe failed");
                }
            }
        }

        if expired > 0 {
            debug!(expired, "Session expiry poll completed");
        }
        expired
    }

    /// Polls until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        info!(interval = ?self.poll_interval, "Session expiry watcher started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }
        }
        info!("Session expiry watcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::CacheSessionStore;
    use presencehub_cache::memory::MemoryCacheProvider;
    use presencehub_core::config::session::SessionConfig;
    use presencehub_core::types::Principal;

    fn setup() -> (Arc<CacheSessionStore>, Arc<SessionExpiryWatcher>) {
        let store = Arc::new(CacheSessionStore::new(
            Arc::new(MemoryCacheProvider::default()),
            SessionConfig::default(),
        ));
        let watcher = Arc::new(SessionExpiryWatcher::new(
            store.clone(),
            Duration::from_secs(5),
        ));
        (store, watcher)
    }

    #[tokio::test]
    async fn test_poll_detects_removed_session_once() {
        let (store, watcher) = setup();
        let live = store.create(Principal::named("alice")).await.unwrap();
        let gone = store.create(Principal::named("bob")).await.unwrap();
        watcher.watch(live.id);
        watcher.watch(gone.id);
        let mut rx = watcher.subscribe();

        store.expire(&gone.id).await.unwrap();
        assert_eq!(watcher.poll_once().await, 1);
        assert_eq!(rx.recv().await.unwrap().session_id, gone.id);

        assert_eq!(watcher.poll_once().await, 0);
        assert!(watcher.is_watched(&live.id));
        assert!(!watcher.is_watched(&gone.id));
    }

    #[tokio::test]
    async fn test_notify_only_watched() {
        let (_store, watcher) = setup();
        let id = SessionId::new();
        assert!(!watcher.notify_expired(id));
        watcher.watch(id);
        assert!(watcher.notify_expired(id));
        assert!(!watcher.notify_expired(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_cancel() {
        let (store, watcher) = setup();
        let session = store.create(Principal::named("dave")).await.unwrap();
        watcher.watch(session.id);
        let mut rx = watcher.subscribe();

        let cancel = CancellationToken::new();
        let task = tokio::spawn(watcher.clone().run(cancel.clone()));

        store.expire(&session.id).await.unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(rx.recv().await.unwrap().session_id, session.id);

        cancel.cancel();
        task.await.unwrap();
    }
}
