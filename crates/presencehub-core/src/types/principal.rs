//! Authenticated identity attached to a session.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An authenticated user: identifier plus granted authorities.
///
/// Attached to a session at authentication time and never mutated afterwards.
/// One principal may own several live sessions (multi-device).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Principal {
    /// Unique user name.
    pub username: String,
    /// Granted authorities / roles (e.g. `ROLE_USER`).
    #[serde(default)]
    pub authorities: BTreeSet<String>,
}

impl Principal {
    /// Creates a principal with the given authorities.
    pub fn new<I, S>(username: impl Into<String>, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            username: username.into(),
            authorities: authorities.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a principal with no authorities.
    pub fn named(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            authorities: BTreeSet::new(),
        }
    }

    /// Returns true if the principal was granted `authority`.
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}
