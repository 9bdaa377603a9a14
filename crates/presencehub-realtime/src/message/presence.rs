//! Presence broadcast payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a presence change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PresenceKind {
    /// A session of the user connected.
    Online,
    /// A session of the user disconnected.
    Offline,
}

/// Payload published on the sign-in / sign-out topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEvent {
    /// Online or offline.
    #[serde(rename = "type")]
    pub kind: PresenceKind,
    /// User whose presence changed.
    pub username: String,
    /// When the change happened.
    pub timestamp: DateTime<Utc>,
}

impl PresenceEvent {
    /// Online event stamped now.
    pub fn online(username: impl Into<String>) -> Self {
        Self::now(PresenceKind::Online, username)
    }

    /// Offline event stamped now.
    pub fn offline(username: impl Into<String>) -> Self {
        Self::now(PresenceKind::Offline, username)
    }

    fn now(kind: PresenceKind, username: impl Into<String>) -> Self {
        Self {
            kind,
            username: username.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let value = serde_json::to_value(PresenceEvent::online("alice")).unwrap();
        assert_eq!(value["type"], "ONLINE");
        assert_eq!(value["username"], "alice");
        assert!(value["timestamp"].is_string());
    }
}
