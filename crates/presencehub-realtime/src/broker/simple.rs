//! In-process broker serving `/topic/**`, `/queue/**` and user destinations.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use presencehub_core::config::RetryConfig;
use presencehub_core::error::AppError;
use presencehub_core::result::AppResult;
use presencehub_core::types::ConnectionId;

use crate::message::ServerFrame;
use crate::retry;

use super::facade::{BrokerFacade, Subscription};
use super::registry::SubscriptionRegistry;

/// Single-node broker with an explicit lifecycle.
///
/// Constructed at startup and torn down with [`SimpleBroker::shutdown`];
/// afterwards every delivery fails with a transient `ServiceUnavailable`.
#[derive(Debug)]
pub struct SimpleBroker {
    subscriptions: SubscriptionRegistry,
    retry: RetryConfig,
    closed: AtomicBool,
}

impl SimpleBroker {
    /// Creates a running broker.
    pub fn new(retry: RetryConfig) -> Self {
        Self {
            subscriptions: SubscriptionRegistry::new(),
            retry,
            closed: AtomicBool::new(false),
        }
    }

    /// Stops accepting deliveries and drops all subscriptions.
    pub fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.subscriptions.clear();
            info!("Broker shut down");
        }
    }

    /// Whether [`SimpleBroker::shutdown`] was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> AppResult<()> {
        if self.is_closed() {
            Err(AppError::service_unavailable("Broker is shut down"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BrokerFacade for SimpleBroker {
    async fn publish(&self, destination: &str, payload: serde_json::Value) -> AppResult<usize> {
        let payload = &payload;
        retry::with_backoff("broker publish", &self.retry, move || {
            self.deliver_to_subscribers(destination, payload)
        })
        .await
    }

    async fn deliver_to_subscribers(
        &self,
        destination: &str,
        payload: &serde_json::Value,
    ) -> AppResult<usize> {
        self.ensure_open()?;

        let routes = self.subscriptions.routes_for(destination);
        let mut delivered = 0;
        for route in routes {
            let frame = ServerFrame::Message {
                subscription: route.subscription_id,
                destination: destination.to_string(),
                message_id: Uuid::new_v4().to_string(),
                body: payload.clone(),
            };
            match route.sender.try_send(frame) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        conn_id = %route.connection_id,
                        destination = %destination,
                        "Subscriber buffer full, dropping message"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(conn_id = %route.connection_id, "Subscriber gone");
                }
            }
        }

        debug!(destination = %destination, delivered, "Message delivered");
        Ok(delivered)
    }

    fn subscribe(&self, subscription: Subscription) -> AppResult<()> {
        self.ensure_open()?;
        debug!(
            conn_id = %subscription.connection_id,
            subscription = %subscription.id,
            destination = %subscription.destination,
            "Subscribed"
        );
        self.subscriptions.insert(subscription)
    }

    fn unsubscribe(&self, connection_id: ConnectionId, subscription_id: &str) -> bool {
        self.subscriptions.remove(connection_id, subscription_id)
    }

    fn unsubscribe_all(&self, connection_id: ConnectionId) -> usize {
        self.subscriptions.remove_connection(connection_id)
    }

    fn subscription_count(&self, connection_id: ConnectionId) -> usize {
        self.subscriptions.count(connection_id)
    }
}
