//! Inbound message classification used by the authorization policy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type of an inbound frame, independent of its wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Protocol handshake frame.
    Connect,
    /// Client publish (`SEND`) to a destination.
    Message,
    /// Subscription request for a destination.
    Subscribe,
    /// Subscription cancellation.
    Unsubscribe,
    /// Graceful disconnect frame.
    Disconnect,
    /// Anything else (heartbeats, unknown commands).
    Other,
}

impl MessageType {
    /// Uppercase protocol name, as used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Message => "MESSAGE",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Disconnect => "DISCONNECT",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
