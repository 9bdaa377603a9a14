//! Send/subscribe abstraction over the pub/sub transport.

use async_trait::async_trait;
use tokio::sync::mpsc;

use presencehub_core::result::AppResult;
use presencehub_core::types::ConnectionId;

use crate::message::ServerFrame;

use super::destination::user_destination;

/// A client subscription as seen by the broker.
#[derive(Debug, Clone)]
pub struct Subscription {
    /// Client-chosen id, unique per connection.
    pub id: String,
    /// Owning connection.
    pub connection_id: ConnectionId,
    /// Destination or destination pattern.
    pub destination: String,
    /// Outbound queue of the owning connection.
    pub sender: mpsc::Sender<ServerFrame>,
}

/// Thin send/subscribe abstraction with no business logic.
///
/// Delivery failures are reported, never swallowed: callers log and meter
/// every failed publish.
#[async_trait]
pub trait BrokerFacade: Send + Sync + std::fmt::Debug + 'static {
    /// Publishes a server-originated payload, retrying transient failures.
    /// Returns the number of subscriptions reached.
    async fn publish(&self, destination: &str, payload: serde_json::Value) -> AppResult<usize>;

    /// Single fan-out attempt to the destination's current subscribers.
    async fn deliver_to_subscribers(
        &self,
        destination: &str,
        payload: &serde_json::Value,
    ) -> AppResult<usize>;

    /// Publishes to every live session of `username` (`/user/<username><destination>`).
    async fn send_to_user(
        &self,
        username: &str,
        destination: &str,
        payload: serde_json::Value,
    ) -> AppResult<usize> {
        self.publish(&user_destination(username, destination), payload)
            .await
    }

    /// Records a subscription.
    fn subscribe(&self, subscription: Subscription) -> AppResult<()>;

    /// Removes one subscription. Returns false if it did not exist.
    fn unsubscribe(&self, connection_id: ConnectionId, subscription_id: &str) -> bool;

    /// Removes every subscription of a connection. Returns how many were removed.
    fn unsubscribe_all(&self, connection_id: ConnectionId) -> usize;

    /// Number of subscriptions held by a connection.
    fn subscription_count(&self, connection_id: ConnectionId) -> usize;
}
