//! Per-connection lifecycle state machine.
//!
//! `Connecting -> Connected -> Disconnecting -> Disconnected`. A connection
//! that never completed the handshake goes straight from `Connecting` to
//! `Disconnecting`. `Disconnected` is terminal.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// Transport open, handshake not yet accepted.
    Connecting = 0,
    /// Handshake accepted; the session is present.
    Connected = 1,
    /// Release in progress.
    Disconnecting = 2,
    /// Released. Terminal.
    Disconnected = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Connected,
            2 => Self::Disconnecting,
            _ => Self::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "CONNECTING"),
            Self::Connected => write!(f, "CONNECTED"),
            Self::Disconnecting => write!(f, "DISCONNECTING"),
            Self::Disconnected => write!(f, "DISCONNECTED"),
        }
    }
}

/// Lock-free holder of a [`ConnectionState`] with compare-and-swap transitions.
#[derive(Debug)]
pub struct AtomicConnectionState(AtomicU8);

impl AtomicConnectionState {
    /// Starts in `Connecting`.
    pub fn new() -> Self {
        Self(AtomicU8::new(ConnectionState::Connecting as u8))
    }

    /// Current state.
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// `Connecting -> Connected`. Fails if the handshake already happened or
    /// the connection is going away.
    pub fn mark_connected(&self) -> bool {
        self.transition(ConnectionState::Connecting, ConnectionState::Connected)
    }

    /// Moves a live connection to `Disconnecting`. Only the first caller wins.
    pub fn begin_disconnect(&self) -> bool {
        self.transition(ConnectionState::Connected, ConnectionState::Disconnecting)
            || self.transition(ConnectionState::Connecting, ConnectionState::Disconnecting)
    }

    /// Marks the connection fully released.
    pub fn finish(&self) {
        self.0
            .store(ConnectionState::Disconnected as u8, Ordering::Release);
    }

    fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for AtomicConnectionState {
    fn default() -> Self {
        Self::new()
    }
}
