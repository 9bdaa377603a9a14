//! Server heartbeats and idle-timeout detection.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use presencehub_core::config::realtime::RealtimeConfig;

use crate::message::ServerFrame;

use super::handle::ConnectionHandle;

/// Heartbeat configuration
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    /// Interval between server heartbeats
    pub interval: Duration,
    /// Inbound silence after which the transport counts as dead
    pub timeout: Duration,
}

impl From<&RealtimeConfig> for HeartbeatConfig {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.heartbeat_interval_seconds.max(1)),
            timeout: Duration::from_secs(config.heartbeat_timeout_seconds.max(1)),
        }
    }
}

/// Why the heartbeat loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatExit {
    /// The connection was closed by someone else.
    Closed,
    /// No inbound frame within the timeout; the connection was closed.
    TimedOut,
}

/// Run heartbeat loop for a connection.
///
/// Sends a heartbeat every interval and closes the connection when the
/// client has been silent for longer than the timeout. Closing goes through
/// the connection's cancel token, so the normal disconnect path runs.
pub async fn run_heartbeat(handle: Arc<ConnectionHandle>, config: HeartbeatConfig) -> HeartbeatExit {
    let mut interval = time::interval(config.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    let cancel = handle.cancel_token();
    let exit = loop {
        tokio::select! {
            _ = cancel.cancelled() => break HeartbeatExit::Closed,
            _ = interval.tick() => {}
        }

        let idle = handle.idle_for();
        if idle > config.timeout {
            warn!(
                conn_id = %handle.id,
                idle_ms = idle.as_millis() as u64,
                "Connection heartbeat timeout"
            );
            handle.close();
            break HeartbeatExit::TimedOut;
        }

        handle.send(ServerFrame::Heartbeat);
    };

    debug!(conn_id = %handle.id, ?exit, "Heartbeat loop ended");
    exit
}
