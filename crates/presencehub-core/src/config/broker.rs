//! Destination namespaces and broker settings.

use serde::{Deserialize, Serialize};

use super::retry::RetryConfig;

/// Destination naming contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Prefix of client-writable application commands.
    #[serde(default = "default_application_prefix")]
    pub application_prefix: String,
    /// Prefix of per-user destinations.
    #[serde(default = "default_user_prefix")]
    pub user_prefix: String,
    /// Broker-owned broadcast namespaces.
    #[serde(default = "default_broker_prefixes")]
    pub broker_prefixes: Vec<String>,
    /// Retry policy for server-originated publishes.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            application_prefix: default_application_prefix(),
            user_prefix: default_user_prefix(),
            broker_prefixes: default_broker_prefixes(),
            retry: RetryConfig::default(),
        }
    }
}

fn default_application_prefix() -> String {
    "/app/".to_string()
}

fn default_user_prefix() -> String {
    "/user/".to_string()
}

fn default_broker_prefixes() -> Vec<String> {
    vec!["/topic/".to_string(), "/queue/".to_string()]
}
