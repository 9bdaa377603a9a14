//! Configured user directory implementing the authentication collaborator.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, warn};

use presencehub_core::config::auth::AuthConfig;
use presencehub_core::error::AppError;
use presencehub_core::result::AppResult;
use presencehub_core::traits::Authenticator;
use presencehub_core::types::Principal;

use crate::password::PasswordHasher;

struct Account {
    password_hash: String,
    principal: Principal,
}

/// Verifies credentials against the `auth.users` list.
pub struct UserDirectory {
    accounts: HashMap<String, Account>,
    hasher: PasswordHasher,
    /// Verified for unknown users so both paths cost one argon2 run.
    dummy_hash: String,
}

impl std::fmt::Debug for UserDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDirectory")
            .field("users", &self.accounts.len())
            .finish()
    }
}

impl UserDirectory {
    /// Builds the directory from configuration.
    pub fn new(config: &AuthConfig) -> AppResult<Self> {
        let hasher = PasswordHasher::new();
        let dummy_hash = hasher.hash_password("presencehub-unknown-user")?;

        let accounts = config
            .users
            .iter()
            .map(|user| {
                (
                    user.username.clone(),
                    Account {
                        password_hash: user.password_hash.clone(),
                        principal: Principal::new(&user.username, &user.authorities),
                    },
                )
            })
            .collect();

        Ok(Self {
            accounts,
            hasher,
            dummy_hash,
        })
    }

    /// Number of configured users.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// True when no users are configured.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl Authenticator for UserDirectory {
    async fn authenticate(&self, username: &str, password: &str) -> AppResult<Principal> {
        let Some(account) = self.accounts.get(username) else {
            let _ = self.hasher.verify_password(password, &self.dummy_hash);
            warn!(username = %username, "Login attempt for unknown user");
            return Err(AppError::authentication("Invalid username or password"));
        };

        if self.hasher.verify_password(password, &account.password_hash)? {
            debug!(username = %username, "Credentials verified");
            Ok(account.principal.clone())
        } else {
            warn!(username = %username, "Invalid password");
            Err(AppError::authentication("Invalid username or password"))
        }
    }
}
