//! Credential verification contract.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::Principal;

/// Verifies credentials and produces the authenticated principal.
#[async_trait]
pub trait Authenticator: Send + Sync + std::fmt::Debug + 'static {
    /// Returns the principal, or an [`crate::error::ErrorKind::Authentication`] error.
    async fn authenticate(&self, username: &str, password: &str) -> AppResult<Principal>;
}
