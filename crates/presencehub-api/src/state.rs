//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use presencehub_cache::CacheManager;
use presencehub_core::config::AppConfig;
use presencehub_core::traits::{Authenticator, SessionRepository};
use presencehub_realtime::RealtimeEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Cache manager (Redis or in-memory)
    pub cache: Arc<CacheManager>,
    /// HTTP session store
    pub sessions: Arc<dyn SessionRepository>,
    /// Credential verification
    pub authenticator: Arc<dyn Authenticator>,
    /// Real-time engine
    pub realtime: RealtimeEngine,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Name of the session cookie.
    pub fn cookie_name(&self) -> &str {
        &self.config.session.cookie_name
    }
}
