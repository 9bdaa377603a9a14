//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section. Every field carries a serde default, so an empty file yields a
//! working single-node configuration.

pub mod app;
pub mod auth;
pub mod broker;
pub mod cache;
pub mod logging;
pub mod policy;
pub mod realtime;
pub mod retry;
pub mod session;

use serde::{Deserialize, Serialize};

use self::app::ServerConfig;
use self::auth::AuthConfig;
use self::broker::BrokerConfig;
use self::cache::CacheConfig;
use self::logging::LoggingConfig;
use self::policy::PolicyConfig;
use self::realtime::RealtimeConfig;
use self::session::SessionConfig;

use crate::error::AppError;

pub use self::realtime::ExpiredSessionPolicy;
pub use self::retry::RetryConfig;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Session-store backend settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// HTTP session settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Credential settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Websocket / presence settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Destination namespaces and broker retry settings.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Ordered inbound message authorization rules.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `PRESENCEHUB__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PRESENCEHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Parse a configuration from a TOML string (used by tests and tooling).
    pub fn from_toml(toml: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}
