//! Route definitions for the PresenceHub HTTP surface.
//!
//! Login, logout and the websocket endpoint live at the root; JSON
//! endpoints are mounted under `/api`.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let endpoint = state.config.realtime.endpoint_path.clone();

    Router::new()
        .merge(auth_routes())
        .route(&endpoint, get(handlers::ws::ws_handler))
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Session cookie endpoints
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
}

/// JSON endpoints
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/presence", get(handlers::presence::online_users))
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}
