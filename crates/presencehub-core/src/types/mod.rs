//! Shared domain types: identifiers, principals, sessions, message types.

pub mod id;
pub mod message_type;
pub mod principal;
pub mod session;

pub use id::{ConnectionId, SessionId};
pub use message_type::MessageType;
pub use principal::Principal;
pub use session::SessionData;
