//! Handlers for the client-writable `/app/**` command namespace.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use presencehub_core::config::broker::BrokerConfig;
use presencehub_core::result::AppResult;

use crate::broker::BrokerFacade;
use crate::connection::handle::ConnectionHandle;
use crate::message::{InstantMessage, InstantMessageRequest, ServerFrame};
use crate::metrics::RealtimeMetrics;
use crate::presence::PresenceRegistry;

/// Command that sends an instant message.
const IM_COMMAND: &str = "im";
/// Command that replies with the online users.
const USERS_COMMAND: &str = "users";

/// Per-user queue receiving instant messages.
pub const MESSAGES_QUEUE: &str = "/queue/messages";
/// Per-user queue receiving command errors.
pub const ERRORS_QUEUE: &str = "/queue/errors";

/// Routes allowed `/app/**` frames to application logic.
#[derive(Debug)]
pub struct ApplicationHandler {
    broker: Arc<dyn BrokerFacade>,
    presence: Arc<PresenceRegistry>,
    metrics: Arc<RealtimeMetrics>,
    config: BrokerConfig,
}

impl ApplicationHandler {
    /// Creates the handler.
    pub fn new(
        broker: Arc<dyn BrokerFacade>,
        presence: Arc<PresenceRegistry>,
        metrics: Arc<RealtimeMetrics>,
        config: BrokerConfig,
    ) -> Self {
        Self {
            broker,
            presence,
            metrics,
            config,
        }
    }

    /// Whether `destination` is in the application namespace.
    pub fn handles(&self, destination: &str) -> bool {
        self.command(destination).is_some()
    }

    fn command<'a>(&self, destination: &'a str) -> Option<&'a str> {
        destination.strip_prefix(self.config.application_prefix.as_str())
    }

    /// Handles `SEND /app/<command>`.
    pub async fn on_send(
        &self,
        handle: &ConnectionHandle,
        destination: &str,
        body: serde_json::Value,
    ) -> AppResult<()> {
        match self.command(destination) {
            Some(IM_COMMAND) => self.instant_message(handle, body).await,
            _ => {
                debug!(conn_id = %handle.id, destination = %destination, "Ignoring unknown command");
                Ok(())
            }
        }
    }

    /// Handles `SUBSCRIBE /app/<command>`. Replies once on the subscription;
    /// nothing is recorded with the broker.
    pub fn on_subscribe(&self, handle: &ConnectionHandle, subscription_id: &str, destination: &str) {
        match self.command(destination) {
            Some(USERS_COMMAND) => {
                let users = self.presence.online_usernames();
                handle.send(ServerFrame::Message {
                    subscription: subscription_id.to_string(),
                    destination: destination.to_string(),
                    message_id: Uuid::new_v4().to_string(),
                    body: json!(users),
                });
                self.metrics.messages_delivered(1);
            }
            _ => {
                debug!(conn_id = %handle.id, destination = %destination, "Ignoring unknown subscription");
            }
        }
    }

    async fn instant_message(
        &self,
        handle: &ConnectionHandle,
        body: serde_json::Value,
    ) -> AppResult<()> {
        let from = handle.username();

        let request = match InstantMessageRequest::from_body(body) {
            Ok(request) => request,
            Err(e) => {
                warn!(conn_id = %handle.id, error = %e, "Rejected instant message");
                let delivered = self
                    .broker
                    .send_to_user(from, ERRORS_QUEUE, json!({ "error": e.message }))
                    .await?;
                self.metrics.messages_delivered(delivered);
                return Ok(());
            }
        };

        let message = InstantMessage::stamp(from, request);
        let payload = serde_json::to_value(&message)?;

        let mut delivered = self
            .broker
            .send_to_user(&message.to, MESSAGES_QUEUE, payload.clone())
            .await?;
        if message.to != message.from {
            delivered += self
                .broker
                .send_to_user(&message.from, MESSAGES_QUEUE, payload)
                .await?;
        }
        self.metrics.messages_delivered(delivered);

        debug!(from = %message.from, to = %message.to, delivered, "Instant message delivered");
        Ok(())
    }
}
