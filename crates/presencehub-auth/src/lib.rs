//! # presencehub-auth
//!
//! Authentication, sessions, and message authorization for PresenceHub.
//!
//! ## Modules
//!
//! - `credentials` — configured user directory implementing `Authenticator`
//! - `password` — Argon2id password hashing
//! - `session` — cache-backed session store and expiry watcher
//! - `policy` — ordered first-match-wins authorization of inbound messages

pub mod credentials;
pub mod password;
pub mod policy;
pub mod session;

pub use credentials::UserDirectory;
pub use password::PasswordHasher;
pub use policy::{MessageEnvelope, PolicyEngine, Verdict};
pub use session::{CacheSessionStore, SessionExpired, SessionExpiryWatcher};
