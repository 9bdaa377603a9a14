//! Application builder: wires state, router and middleware into an Axum app.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use presencehub_auth::{CacheSessionStore, UserDirectory};
use presencehub_cache::CacheManager;
use presencehub_core::config::AppConfig;
use presencehub_core::error::AppError;
use presencehub_core::result::AppResult;
use presencehub_core::traits::{Authenticator, SessionRepository};
use presencehub_realtime::RealtimeEngine;

use crate::router::build_router;
use crate::state::AppState;

/// Builds the shared state: cache, session store, credentials and the
/// real-time engine.
pub async fn build_state(config: AppConfig) -> AppResult<AppState> {
    info!(provider = %config.cache.provider, "Initializing cache");
    let cache = Arc::new(CacheManager::new(&config.cache).await?);

    let sessions: Arc<dyn SessionRepository> = Arc::new(CacheSessionStore::new(
        cache.clone(),
        config.session.clone(),
    ));

    let directory = UserDirectory::new(&config.auth)?;
    if directory.is_empty() {
        warn!("No user accounts configured; every login will be rejected");
    }
    let authenticator: Arc<dyn Authenticator> = Arc::new(directory);

    let realtime = RealtimeEngine::new(&config, sessions.clone())?;

    Ok(AppState {
        config: Arc::new(config),
        cache,
        sessions,
        authenticator,
        realtime,
        started_at: Instant::now(),
    })
}

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Serves `state` on `listener` until `shutdown` resolves.
///
/// Starts the engine's background tasks first. On shutdown every open
/// connection is disconnected, bounded by `server.shutdown_grace_seconds`.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let engine = state.realtime.clone();
    let grace = Duration::from_secs(state.config.server.shutdown_grace_seconds);
    engine.start();

    let addr = listener
        .local_addr()
        .map_err(|e| AppError::internal(format!("Listener has no address: {e}")))?;
    info!(address = %addr, "PresenceHub server listening");

    let app = build_app(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Shutdown signal received, closing connections");
            match tokio::time::timeout(grace, engine.shutdown()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Real-time engine shutdown failed"),
                Err(_) => warn!(grace_seconds = grace.as_secs(), "Real-time engine shutdown timed out"),
            }
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    info!("PresenceHub server stopped");
    Ok(())
}

/// Builds the state, binds the configured address and serves until `shutdown`.
pub async fn run_server<F>(config: AppConfig, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.server.bind_address();
    let state = build_state(config).await?;

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    serve(listener, state, shutdown).await
}
