//! # presencehub-realtime
//!
//! Presence state machine and message gateway for PresenceHub.
//!
//! - `connection` — per-connection lifecycle, policy gate, heartbeat, release guard
//! - `presence` — registry of connected sessions
//! - `bridge` — connection → session binding and session-store access
//! - `broker` — send/subscribe facade and the in-process broker
//! - `handler` — `/app/**` command handlers
//! - `message` — wire frames and payloads
//! - `metrics` — counters
//! - `server` — [`RealtimeEngine`] wiring and lifecycle

pub mod bridge;
pub mod broker;
pub mod connection;
pub mod handler;
pub mod message;
pub mod metrics;
pub mod presence;
pub mod retry;
pub mod server;

pub use bridge::SessionBridge;
pub use broker::{BrokerFacade, SimpleBroker};
pub use connection::{ConnectionGuard, ConnectionLifecycleManager, FrameOutcome};
pub use presence::PresenceRegistry;
pub use server::RealtimeEngine;
