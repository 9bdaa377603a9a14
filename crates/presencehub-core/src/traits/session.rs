//! Contract of the external session store.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::{Principal, SessionData, SessionId};

/// Key-value session service with an idle TTL.
///
/// All operations are fast key-value calls; failures are reported as
/// transient [`crate::error::ErrorKind::Cache`] errors so callers can retry.
#[async_trait]
pub trait SessionRepository: Send + Sync + std::fmt::Debug + 'static {
    /// Creates a new session holding `principal`.
    async fn create(&self, principal: Principal) -> AppResult<SessionData>;

    /// Looks up a live session.
    async fn get(&self, id: &SessionId) -> AppResult<Option<SessionData>>;

    /// Extends the session's expiry window. Returns `false` if the session is gone.
    async fn touch(&self, id: &SessionId) -> AppResult<bool>;

    /// Forcibly expires the session. Idempotent.
    async fn expire(&self, id: &SessionId) -> AppResult<()>;
}
