//! Cache key builders for every PresenceHub cache entry.

use presencehub_core::types::SessionId;

/// Prefix applied to all PresenceHub cache keys.
const PREFIX: &str = "presencehub";

/// Cache key for a session record.
pub fn session(session_id: &SessionId) -> String {
    format!("{PREFIX}:session:{session_id}")
}
