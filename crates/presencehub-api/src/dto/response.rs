//! Response DTOs.

use serde::{Deserialize, Serialize};

use presencehub_realtime::metrics::MetricsSnapshot;
use presencehub_realtime::presence::OnlineUser;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Login response. The session id itself travels only in the cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Authenticated user name.
    pub username: String,
    /// Granted authorities.
    pub authorities: Vec<String>,
    /// Idle timeout of the new session.
    pub expires_in_seconds: u64,
}

/// Simple message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message.
    pub message: String,
}

/// Online users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceResponse {
    /// Users sorted by name.
    pub users: Vec<OnlineUser>,
    /// Live sessions across all users.
    pub sessions: usize,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
    /// Uptime.
    pub uptime_seconds: u64,
}

/// Detailed health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedHealthResponse {
    /// Overall status.
    pub status: String,
    /// Cache status.
    pub cache: String,
    /// WebSocket connections.
    pub ws_connections: usize,
    /// Live sessions.
    pub live_sessions: usize,
    /// Distinct online users.
    pub online_users: usize,
    /// Real-time counters.
    pub metrics: MetricsSnapshot,
}
