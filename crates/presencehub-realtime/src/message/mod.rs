//! Wire frames and payloads.

pub mod frame;
pub mod instant;
pub mod presence;
pub mod validator;

pub use frame::{ClientFrame, ServerFrame};
pub use instant::{InstantMessage, InstantMessageRequest};
pub use presence::{PresenceEvent, PresenceKind};
