//! Websocket and presence configuration.

use serde::{Deserialize, Serialize};

/// Real-time (websocket) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Path of the websocket endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint_path: String,
    /// Outbound frame buffer per connection.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Interval between server heartbeats, in seconds.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
    /// Inbound silence after which the transport is considered dead, in seconds.
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_seconds: u64,
    /// Maximum broker subscriptions per connection.
    #[serde(default = "default_max_subscriptions")]
    pub max_subscriptions_per_connection: usize,
    /// What to do with open connections whose session expired.
    #[serde(default)]
    pub on_session_expired: ExpiredSessionPolicy,
    /// Presence broadcast destinations.
    #[serde(default)]
    pub presence: PresenceTopicsConfig,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            endpoint_path: default_endpoint(),
            channel_buffer_size: default_channel_buffer(),
            heartbeat_interval_seconds: default_heartbeat_interval(),
            heartbeat_timeout_seconds: default_heartbeat_timeout(),
            max_subscriptions_per_connection: default_max_subscriptions(),
            on_session_expired: ExpiredSessionPolicy::default(),
            presence: PresenceTopicsConfig::default(),
        }
    }
}

/// Handling of a connection whose backing session expired while the
/// transport is still open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiredSessionPolicy {
    /// Proactively disconnect every connection of the session.
    #[default]
    CloseConnection,
    /// Keep the transport; the next inbound message is denied and the
    /// connection terminated.
    DenyNextMessage,
}

/// Topics presence deltas are published to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceTopicsConfig {
    /// Destination for ONLINE events.
    #[serde(default = "default_signin_topic")]
    pub signin_topic: String,
    /// Destination for OFFLINE events.
    #[serde(default = "default_signout_topic")]
    pub signout_topic: String,
}

impl Default for PresenceTopicsConfig {
    fn default() -> Self {
        Self {
            signin_topic: default_signin_topic(),
            signout_topic: default_signout_topic(),
        }
    }
}

fn default_endpoint() -> String {
    "/messages".to_string()
}

fn default_channel_buffer() -> usize {
    256
}

fn default_heartbeat_interval() -> u64 {
    10
}

fn default_heartbeat_timeout() -> u64 {
    30
}

fn default_max_subscriptions() -> usize {
    50
}

fn default_signin_topic() -> String {
    "/topic/friends/signin".to_string()
}

fn default_signout_topic() -> String {
    "/topic/friends/signout".to_string()
}
