//! Custom Axum extractors.

pub mod credentials;
pub mod session;

pub use credentials::LoginForm;
pub use session::{AuthSession, session_cookie};
