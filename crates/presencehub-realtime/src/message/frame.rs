//! JSON wire frames, tagged by `command` like STOMP commands.

use serde::{Deserialize, Serialize};

use presencehub_core::result::AppResult;
use presencehub_core::types::MessageType;

/// Frames sent by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "UPPERCASE")]
pub enum ClientFrame {
    /// Protocol handshake; makes the connection's session present.
    Connect,
    /// Subscribe to a destination under a client-chosen id.
    Subscribe {
        /// Subscription id, unique per connection.
        id: String,
        /// Destination to receive from.
        destination: String,
    },
    /// Cancel a subscription.
    Unsubscribe {
        /// Subscription id.
        id: String,
    },
    /// Publish to a destination.
    Send {
        /// Target destination.
        destination: String,
        /// Payload.
        #[serde(default)]
        body: serde_json::Value,
    },
    /// Graceful disconnect.
    Disconnect {
        /// Receipt id to acknowledge before closing.
        #[serde(default)]
        receipt: Option<String>,
    },
    /// Client keepalive.
    Heartbeat,
}

impl ClientFrame {
    /// Parses a text frame.
    pub fn parse(text: &str) -> AppResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Classification used by the authorization policy.
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Connect => MessageType::Connect,
            Self::Subscribe { .. } => MessageType::Subscribe,
            Self::Unsubscribe { .. } => MessageType::Unsubscribe,
            Self::Send { .. } => MessageType::Message,
            Self::Disconnect { .. } => MessageType::Disconnect,
            Self::Heartbeat => MessageType::Other,
        }
    }

    /// Destination carried by the frame, if any.
    pub fn destination(&self) -> Option<&str> {
        match self {
            Self::Subscribe { destination, .. } | Self::Send { destination, .. } => {
                Some(destination.as_str())
            }
            _ => None,
        }
    }
}

/// Frames sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "UPPERCASE")]
pub enum ServerFrame {
    /// Handshake accepted.
    Connected {
        /// Authenticated user name.
        user: String,
        /// Server heartbeat interval.
        heartbeat_ms: u64,
    },
    /// A message delivered to one subscription.
    Message {
        /// Subscription id the message is delivered for.
        subscription: String,
        /// Destination it was published to.
        destination: String,
        /// Unique message id.
        message_id: String,
        /// Payload.
        body: serde_json::Value,
    },
    /// Acknowledges a frame that requested a receipt.
    Receipt {
        /// Receipt id from the client frame.
        receipt_id: String,
    },
    /// Protocol-level error.
    Error {
        /// Description.
        message: String,
    },
    /// Server keepalive.
    Heartbeat,
}

impl ServerFrame {
    /// Shorthand for an error frame.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
