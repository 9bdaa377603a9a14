//! Server-side session record held by the external session store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::SessionId;
use super::principal::Principal;

/// State of one authenticated HTTP session.
///
/// The record is written once at login; activity only extends its TTL in
/// the store, so a concurrent invalidation can never be undone by a touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    /// Session identifier (the value of the session cookie).
    pub id: SessionId,
    /// Principal attached at login.
    pub principal: Principal,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Idle timeout in seconds; the session expires this long after the last touch.
    pub max_inactive_seconds: u64,
}

impl SessionData {
    /// Creates a fresh session for `principal`.
    pub fn new(principal: Principal, max_inactive_seconds: u64) -> Self {
        Self {
            id: SessionId::new(),
            principal,
            created_at: Utc::now(),
            max_inactive_seconds,
        }
    }
}
