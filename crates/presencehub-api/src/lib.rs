//! # presencehub-api
//!
//! HTTP surface for PresenceHub built on Axum.
//!
//! Provides form/JSON login and logout backed by the `SESSION` cookie, the
//! websocket endpoint that feeds the real-time engine, presence and health
//! endpoints, the cookie session extractor, and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, build_state, run_server, serve};
pub use error::{ApiError, ApiResult};
pub use state::AppState;
