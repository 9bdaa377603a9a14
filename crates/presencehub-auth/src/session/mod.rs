//! Session storage and expiry detection.

pub mod expiry;
pub mod store;

pub use expiry::{SessionExpired, SessionExpiryWatcher};
pub use store::CacheSessionStore;
