//! Collaborator traits. Implementations live in the cache and auth crates.

pub mod authenticator;
pub mod cache;
pub mod session;

pub use authenticator::Authenticator;
pub use cache::CacheProvider;
pub use session::SessionRepository;
