//! Instant messages exchanged through the `/app/im` command.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use presencehub_core::error::AppError;
use presencehub_core::result::AppResult;

use super::validator::validate_segment;

/// Maximum instant message length in characters.
pub const MAX_MESSAGE_CHARS: usize = 4_096;

/// Body of a `SEND /app/im` frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InstantMessageRequest {
    /// Recipient user name.
    pub to: String,
    /// Text.
    pub message: String,
}

impl InstantMessageRequest {
    /// Reads a request from a frame body. Bodies sent as JSON text are accepted too.
    pub fn from_body(body: serde_json::Value) -> AppResult<Self> {
        let request: Self = match body {
            serde_json::Value::String(text) => serde_json::from_str(&text)?,
            other => serde_json::from_value(other)?,
        };

        if request.to.trim().is_empty() {
            return Err(AppError::validation("Recipient is required"));
        }
        validate_segment(&request.to)
            .map_err(|_| AppError::validation(format!("Invalid recipient: {}", request.to)))?;
        if request.message.is_empty() {
            return Err(AppError::validation("Message is empty"));
        }
        if request.message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::validation(format!(
                "Message exceeds {MAX_MESSAGE_CHARS} characters"
            )));
        }
        Ok(request)
    }
}

/// Message as delivered to sender and recipient, stamped by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstantMessage {
    /// Sender, taken from the authenticated principal.
    pub from: String,
    /// Recipient.
    pub to: String,
    /// Text.
    pub message: String,
    /// Server receive time.
    pub created: DateTime<Utc>,
}

impl InstantMessage {
    /// Stamps a request with its sender and the current time.
    pub fn stamp(from: impl Into<String>, request: InstantMessageRequest) -> Self {
        Self {
            from: from.into(),
            to: request.to,
            message: request.message,
            created: Utc::now(),
        }
    }
}
