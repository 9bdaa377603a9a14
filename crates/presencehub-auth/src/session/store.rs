//! Session store over the configured cache provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use presencehub_cache::keys;
use presencehub_core::config::session::SessionConfig;
use presencehub_core::result::AppResult;
use presencehub_core::traits::SessionRepository;
use presencehub_core::traits::cache::{CacheProvider, CacheProviderExt};
use presencehub_core::types::{Principal, SessionData, SessionId};

/// Sessions stored as JSON under `presencehub:session:<id>` with an idle TTL.
#[derive(Debug, Clone)]
pub struct CacheSessionStore {
    /// Backing key-value store.
    cache: Arc<dyn CacheProvider>,
    /// Session configuration.
    config: SessionConfig,
}

impl CacheSessionStore {
    /// Creates a new session store.
    pub fn new(cache: Arc<dyn CacheProvider>, config: SessionConfig) -> Self {
        Self { cache, config }
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds)
    }
}

#[async_trait]
impl SessionRepository for CacheSessionStore {
    async fn create(&self, principal: Principal) -> AppResult<SessionData> {
        let session = SessionData::new(principal, self.config.timeout_seconds);
        self.cache
            .set_json(&keys::session(&session.id), &session, self.ttl())
            .await?;
        debug!(session_id = %session.id, username = %session.principal, "Session created");
        Ok(session)
    }

    async fn get(&self, id: &SessionId) -> AppResult<Option<SessionData>> {
        self.cache.get_json(&keys::session(id)).await
    }

    async fn touch(&self, id: &SessionId) -> AppResult<bool> {
        // TTL-only refresh: a removed key is never recreated
        self.cache.expire(&keys::session(id), self.ttl()).await
    }

    async fn expire(&self, id: &SessionId) -> AppResult<()> {
        self.cache.delete(&keys::session(id)).await?;
        debug!(session_id = %id, "Session expired");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presencehub_cache::memory::MemoryCacheProvider;

    fn store(timeout_seconds: u64) -> CacheSessionStore {
        let config = SessionConfig {
            timeout_seconds,
            ..SessionConfig::default()
        };
        CacheSessionStore::new(Arc::new(MemoryCacheProvider::default()), config)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = store(60);
        let session = store.create(Principal::named("alice")).await.unwrap();
        let loaded = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded, session);
        assert_eq!(loaded.max_inactive_seconds, 60);
    }

    #[tokio::test]
    async fn test_touch_live_and_missing() {
        let store = store(60);
        let session = store.create(Principal::named("bob")).await.unwrap();
        assert!(store.touch(&session.id).await.unwrap());
        assert!(!store.touch(&SessionId::new()).await.unwrap());
    }

    #[tokio::test]
    async fn test_expire_is_idempotent_and_blocks_touch() {
        let store = store(60);
        let session = store.create(Principal::named("carol")).await.unwrap();
        store.expire(&session.id).await.unwrap();
        store.expire(&session.id).await.unwrap();
        assert!(store.get(&session.id).await.unwrap().is_none());
        assert!(!store.touch(&session.id).await.unwrap());
        assert!(store.get(&session.id).await.unwrap().is_none());
    }
}
