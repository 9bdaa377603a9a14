//! HTTP session configuration.

use serde::{Deserialize, Serialize};

use super::retry::RetryConfig;

/// Session lifetime and store access settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle timeout in seconds; every touch extends the session by this much.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// How often watched sessions are probed for expiry, in seconds.
    #[serde(default = "default_poll_interval")]
    pub expiry_poll_interval_seconds: u64,
    /// Retry policy for session-store calls.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            cookie_name: default_cookie_name(),
            expiry_poll_interval_seconds: default_poll_interval(),
            retry: RetryConfig::default(),
        }
    }
}

fn default_timeout() -> u64 {
    1800
}

fn default_cookie_name() -> String {
    "SESSION".to_string()
}

fn default_poll_interval() -> u64 {
    5
}
