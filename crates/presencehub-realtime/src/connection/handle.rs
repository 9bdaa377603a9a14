//! Individual connection handle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use presencehub_core::types::{ConnectionId, Principal, SessionId};

use crate::message::ServerFrame;

use super::state::{AtomicConnectionState, ConnectionState};

/// A handle to a single client connection.
///
/// Holds the sender for pushing frames to the client, the session and
/// principal it was opened for, and the token that stops its tasks.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Session this connection belongs to
    pub session_id: SessionId,
    /// Principal of the session
    pub principal: Principal,
    /// When the transport was opened
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<ServerFrame>,
    state: AtomicConnectionState,
    cancel: CancellationToken,
    opened: Instant,
    /// Milliseconds after `opened` of the last inbound frame.
    last_activity_ms: AtomicU64,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(
        session_id: SessionId,
        principal: Principal,
        sender: mpsc::Sender<ServerFrame>,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            session_id,
            principal,
            connected_at: Utc::now(),
            sender,
            state: AtomicConnectionState::new(),
            cancel: CancellationToken::new(),
            opened: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
        }
    }

    /// User name of the principal.
    pub fn username(&self) -> &str {
        &self.principal.username
    }

    /// Queue a frame for the client. Returns false if it was dropped.
    pub fn send(&self, frame: ServerFrame) -> bool {
        if self.is_closed() {
            return false;
        }
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(conn_id = %self.id, "Connection send buffer full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(conn_id = %self.id, "Connection writer gone");
                self.close();
                false
            }
        }
    }

    /// A sender for this connection's outbound queue.
    pub fn sender(&self) -> mpsc::Sender<ServerFrame> {
        self.sender.clone()
    }

    /// Lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub(crate) fn lifecycle(&self) -> &AtomicConnectionState {
        &self.state
    }

    /// Signals every task serving this connection to stop.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Whether [`ConnectionHandle::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token cancelled when the connection is closed.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Record inbound traffic.
    pub fn record_activity(&self) {
        let elapsed = self.opened.elapsed().as_millis() as u64;
        self.last_activity_ms.store(elapsed, Ordering::Relaxed);
    }

    /// Time since the last inbound frame (or since open).
    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_activity_ms.load(Ordering::Relaxed));
        self.opened.elapsed().saturating_sub(last)
    }

    /// Get a snapshot of connection info
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            session_id: self.session_id,
            username: self.principal.username.clone(),
            connected_at: self.connected_at,
            state: self.state().to_string(),
        }
    }
}

/// Snapshot of connection info (serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Connection ID
    pub id: ConnectionId,
    /// Session ID
    pub session_id: SessionId,
    /// Username
    pub username: String,
    /// Connected at
    pub connected_at: DateTime<Utc>,
    /// Lifecycle state
    pub state: String,
}
