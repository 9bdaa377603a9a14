//! The view of one inbound message that the policy evaluates.

use presencehub_core::types::{MessageType, Principal, SessionId};

/// Transient description of an inbound message.
///
/// Built by the connection layer for a single evaluation. Whether the
/// originating session is registered as connected is resolved by the caller
/// and carried here, so the policy itself stays free of shared state.
#[derive(Debug, Clone, Copy)]
pub struct MessageEnvelope<'a> {
    /// Message classification.
    pub message_type: MessageType,
    /// Destination, absent for pure protocol frames.
    pub destination: Option<&'a str>,
    /// Session the message arrived on.
    pub origin_session: SessionId,
    /// Authenticated principal, if any.
    pub principal: Option<&'a Principal>,
    /// Whether `origin_session` currently has a live presence entry.
    pub session_connected: bool,
}

impl<'a> MessageEnvelope<'a> {
    /// Envelope with no destination, no principal and no live session.
    pub fn new(message_type: MessageType, origin_session: SessionId) -> Self {
        Self {
            message_type,
            destination: None,
            origin_session,
            principal: None,
            session_connected: false,
        }
    }

    /// Sets the destination.
    pub fn with_destination(mut self, destination: &'a str) -> Self {
        self.destination = Some(destination);
        self
    }

    /// Sets an optional destination.
    pub fn with_optional_destination(mut self, destination: Option<&'a str>) -> Self {
        self.destination = destination;
        self
    }

    /// Sets the principal.
    pub fn with_principal(mut self, principal: &'a Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Records whether the origin session is registered as connected.
    pub fn with_session_connected(mut self, connected: bool) -> Self {
        self.session_connected = connected;
        self
    }
}
