//! Credential configuration.

use serde::{Deserialize, Serialize};

/// Static user directory consulted at login.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Known users.
    #[serde(default)]
    pub users: Vec<UserCredentialConfig>,
}

/// One user account.
#[derive(Clone, Serialize, Deserialize)]
pub struct UserCredentialConfig {
    /// Login name.
    pub username: String,
    /// Argon2 PHC-format password hash.
    pub password_hash: String,
    /// Granted authorities.
    #[serde(default = "default_authorities")]
    pub authorities: Vec<String>,
}

impl std::fmt::Debug for UserCredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCredentialConfig")
            .field("username", &self.username)
            .field("authorities", &self.authorities)
            .finish()
    }
}

fn default_authorities() -> Vec<String> {
    vec!["ROLE_USER".to_string()]
}
