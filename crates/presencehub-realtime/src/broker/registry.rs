//! Subscription bookkeeping for the in-process broker.

use std::collections::HashMap;

use dashmap::DashMap;
use tokio::sync::mpsc;

use presencehub_auth::policy::DestinationPattern;
use presencehub_auth::policy::pattern::has_wildcard;
use presencehub_core::error::AppError;
use presencehub_core::result::AppResult;
use presencehub_core::types::ConnectionId;

use crate::message::ServerFrame;

use super::facade::Subscription;

/// Where a matching message is delivered.
#[derive(Debug, Clone)]
pub struct Route {
    /// Owning connection.
    pub connection_id: ConnectionId,
    /// Subscription id on that connection.
    pub subscription_id: String,
    /// Outbound queue.
    pub sender: mpsc::Sender<ServerFrame>,
}

impl From<&Subscription> for Route {
    fn from(sub: &Subscription) -> Self {
        Self {
            connection_id: sub.connection_id,
            subscription_id: sub.id.clone(),
            sender: sub.sender.clone(),
        }
    }
}

/// Exact and pattern subscriptions, indexed for delivery and for cleanup.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    /// Destination → routes for literal subscriptions.
    exact: DashMap<String, Vec<Route>>,
    /// (connection, subscription id) → compiled pattern and route.
    patterns: DashMap<(ConnectionId, String), (DestinationPattern, Route)>,
    /// Connection → subscription id → destination.
    by_connection: DashMap<ConnectionId, HashMap<String, String>>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscription. Ids must be unique per connection.
    pub fn insert(&self, sub: Subscription) -> AppResult<()> {
        let pattern = if has_wildcard(&sub.destination) {
            Some(DestinationPattern::parse(&sub.destination)?)
        } else {
            None
        };

        {
            let mut subs = self.by_connection.entry(sub.connection_id).or_default();
            if subs.contains_key(&sub.id) {
                return Err(AppError::conflict(format!(
                    "Subscription id '{}' already in use",
                    sub.id
                )));
            }
            subs.insert(sub.id.clone(), sub.destination.clone());
        }

        let route = Route::from(&sub);
        match pattern {
            Some(pattern) => {
                self.patterns
                    .insert((sub.connection_id, sub.id), (pattern, route));
            }
            None => self.exact.entry(sub.destination).or_default().push(route),
        }
        Ok(())
    }

    /// Removes one subscription.
    pub fn remove(&self, connection_id: ConnectionId, subscription_id: &str) -> bool {
        let destination = self
            .by_connection
            .get_mut(&connection_id)
            .and_then(|mut subs| subs.remove(subscription_id));
        self.by_connection
            .remove_if(&connection_id, |_, subs| subs.is_empty());

        match destination {
            Some(destination) => {
                self.remove_route(connection_id, subscription_id, &destination);
                true
            }
            None => false,
        }
    }

    /// Removes every subscription of a connection.
    pub fn remove_connection(&self, connection_id: ConnectionId) -> usize {
        let Some((_, subs)) = self.by_connection.remove(&connection_id) else {
            return 0;
        };
        for (id, destination) in &subs {
            self.remove_route(connection_id, id, destination);
        }
        subs.len()
    }

    /// Routes for every subscription matching `destination`.
    pub fn routes_for(&self, destination: &str) -> Vec<Route> {
        let mut routes = self
            .exact
            .get(destination)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        routes.extend(
            self.patterns
                .iter()
                .filter(|entry| entry.value().0.matches(destination))
                .map(|entry| entry.value().1.clone()),
        );
        routes
    }

    /// Subscriptions held by a connection.
    pub fn count(&self, connection_id: ConnectionId) -> usize {
        self.by_connection
            .get(&connection_id)
            .map(|subs| subs.len())
            .unwrap_or(0)
    }

    /// Drops everything.
    pub fn clear(&self) {
        self.exact.clear();
        self.patterns.clear();
        self.by_connection.clear();
    }

    fn remove_route(&self, connection_id: ConnectionId, subscription_id: &str, destination: &str) {
        if self
            .patterns
            .remove(&(connection_id, subscription_id.to_string()))
            .is_some()
        {
            return;
        }
        if let Some(mut routes) = self.exact.get_mut(destination) {
            routes.retain(|r| !(r.connection_id == connection_id && r.subscription_id == subscription_id));
        }
        self.exact.remove_if(destination, |_, routes| routes.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(conn: ConnectionId, id: &str, destination: &str) -> Subscription {
        let (sender, _rx) = mpsc::channel(1);
        Subscription {
            id: id.to_string(),
            connection_id: conn,
            destination: destination.to_string(),
            sender,
        }
    }

    #[test]
    fn test_exact_and_pattern_routes() {
        let registry = SubscriptionRegistry::new();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        registry.insert(sub(a, "s1", "/topic/friends/signin")).unwrap();
        registry.insert(sub(b, "s1", "/topic/friends/*")).unwrap();

        assert_eq!(registry.routes_for("/topic/friends/signin").len(), 2);
        assert_eq!(registry.routes_for("/topic/friends/signout").len(), 1);
        assert_eq!(registry.routes_for("/topic/friends/a/b").len(), 0);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let registry = SubscriptionRegistry::new();
        let a = ConnectionId::new();
        registry.insert(sub(a, "s1", "/topic/x")).unwrap();
        assert!(registry.insert(sub(a, "s1", "/topic/y")).is_err());
        assert_eq!(registry.count(a), 1);
    }

    #[test]
    fn test_remove_and_remove_connection() {
        let registry = SubscriptionRegistry::new();
        let a = ConnectionId::new();
        registry.insert(sub(a, "s1", "/topic/x")).unwrap();
        registry.insert(sub(a, "s2", "/topic/**")).unwrap();
        registry.insert(sub(a, "s3", "/topic/y")).unwrap();

        assert!(registry.remove(a, "s1"));
        assert!(!registry.remove(a, "s1"));
        assert_eq!(registry.routes_for("/topic/x").len(), 1);

        assert_eq!(registry.remove_connection(a), 2);
        assert!(registry.routes_for("/topic/y").is_empty());
        assert_eq!(registry.count(a), 0);
    }
}
