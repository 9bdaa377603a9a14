//! Presence tracking.

pub mod registry;

pub use registry::{Detached, OnlineUser, PresenceEntry, PresenceRegistry};
