//! Connection lifecycle manager: connect/disconnect state machine, policy
//! gate and frame dispatch.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use presencehub_auth::policy::{MessageEnvelope, PolicyEngine};
use presencehub_auth::session::SessionExpired;
use presencehub_core::config::ExpiredSessionPolicy;
use presencehub_core::config::broker::BrokerConfig;
use presencehub_core::config::realtime::RealtimeConfig;
use presencehub_core::error::ErrorKind;
use presencehub_core::types::{ConnectionId, SessionData, SessionId};

use crate::bridge::SessionBridge;
use crate::broker::destination::resolve_user_subscription;
use crate::broker::{BrokerFacade, Subscription};
use crate::handler::ApplicationHandler;
use crate::message::validator::{validate_destination, validate_inbound};
use crate::message::{ClientFrame, PresenceEvent, ServerFrame};
use crate::metrics::RealtimeMetrics;
use crate::presence::{PresenceEntry, PresenceRegistry};

use super::handle::{ConnectionHandle, ConnectionInfo};
use super::pool::ConnectionPool;

/// What the transport loop should do after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Keep reading.
    Continue,
    /// Close the transport.
    Close,
}

/// Result of releasing a connection.
#[derive(Debug)]
pub struct Released {
    /// The released connection.
    pub handle: Arc<ConnectionHandle>,
    /// Set when this release removed an announced session from the registry.
    pub offline: Option<PresenceEntry>,
}

/// Coordinates the session bridge, the presence registry and the broker for
/// every connection.
///
/// Per connection: `CONNECTING -> CONNECTED -> DISCONNECTING -> DISCONNECTED`.
/// A graceful DISCONNECT frame, a transport close, a heartbeat timeout and a
/// session expiry all end in [`ConnectionLifecycleManager::release`]. Removal
/// from the pool gates it, so at most one OFFLINE broadcast is emitted per
/// session no matter how many of those signals arrive.
#[derive(Debug)]
pub struct ConnectionLifecycleManager {
    pool: ConnectionPool,
    presence: Arc<PresenceRegistry>,
    bridge: Arc<SessionBridge>,
    policy: Arc<PolicyEngine>,
    broker: Arc<dyn BrokerFacade>,
    commands: ApplicationHandler,
    metrics: Arc<RealtimeMetrics>,
    config: RealtimeConfig,
    broker_config: BrokerConfig,
}

impl ConnectionLifecycleManager {
    /// Creates a manager from its collaborators.
    pub fn new(
        config: RealtimeConfig,
        broker_config: BrokerConfig,
        presence: Arc<PresenceRegistry>,
        bridge: Arc<SessionBridge>,
        policy: Arc<PolicyEngine>,
        broker: Arc<dyn BrokerFacade>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        let commands = ApplicationHandler::new(
            broker.clone(),
            presence.clone(),
            metrics.clone(),
            broker_config.clone(),
        );
        Self {
            pool: ConnectionPool::new(),
            presence,
            bridge,
            policy,
            broker,
            commands,
            metrics,
            config,
            broker_config,
        }
    }

    /// Registers a new transport connection for an authenticated session.
    ///
    /// The connection starts in `CONNECTING`; the session becomes present
    /// once a CONNECT frame is accepted. Returns the handle and the receiver
    /// for outbound frames.
    pub fn open(&self, session: &SessionData) -> (Arc<ConnectionHandle>, mpsc::Receiver<ServerFrame>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size.max(1));
        let handle = Arc::new(ConnectionHandle::new(
            session.id,
            session.principal.clone(),
            tx,
        ));

        self.pool.add(handle.clone());
        self.bridge.bind(handle.id, session.id);
        self.metrics.connection_opened();

        info!(
            conn_id = %handle.id,
            session_id = %session.id,
            username = %session.principal,
            "Connection opened"
        );

        (handle, rx)
    }

    /// Processes one raw text frame.
    pub async fn handle_text(&self, handle: &ConnectionHandle, raw: &str) -> FrameOutcome {
        handle.record_activity();

        let frame = match validate_inbound(raw).and_then(|()| ClientFrame::parse(raw)) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(conn_id = %handle.id, error = %e, "Malformed frame");
                handle.send(ServerFrame::error(format!("Malformed frame: {}", e.message)));
                return FrameOutcome::Continue;
            }
        };

        self.handle_frame(handle, frame).await
    }

    /// Authorizes and dispatches one parsed frame.
    pub async fn handle_frame(&self, handle: &ConnectionHandle, frame: ClientFrame) -> FrameOutcome {
        self.metrics.message_received();

        if let Some(destination) = frame.destination() {
            if let Err(e) = validate_destination(destination) {
                handle.send(ServerFrame::error(e.message));
                return FrameOutcome::Continue;
            }
        }

        let session_id = match self.bridge.resolve(&handle.id) {
            Ok(session_id) => session_id,
            Err(e) => {
                warn!(conn_id = %handle.id, error = %e, "Frame without session");
                return FrameOutcome::Close;
            }
        };

        let envelope = MessageEnvelope::new(frame.message_type(), session_id)
            .with_optional_destination(frame.destination())
            .with_principal(&handle.principal)
            .with_session_connected(self.presence.is_attached(&session_id, &handle.id));

        let decision = self.policy.decide(&envelope);
        if !decision.verdict.is_allowed() {
            // dropped without an ERROR frame so destinations cannot be probed
            self.metrics.message_denied();
            warn!(
                conn_id = %handle.id,
                session_id = %session_id,
                message_type = %envelope.message_type,
                destination = envelope.destination.unwrap_or("-"),
                rule = ?decision.rule,
                "Message denied by policy"
            );
            return FrameOutcome::Continue;
        }

        if let Err(e) = self.bridge.touch(&session_id).await {
            if e.kind == ErrorKind::Session {
                info!(conn_id = %handle.id, session_id = %session_id, "Session gone, closing connection");
                return FrameOutcome::Close;
            }
            // retries exhausted: fail closed for this message only
            error!(conn_id = %handle.id, error = %e, "Session touch failed, dropping message");
            return FrameOutcome::Continue;
        }

        self.dispatch(handle, frame).await
    }

    async fn dispatch(&self, handle: &ConnectionHandle, frame: ClientFrame) -> FrameOutcome {
        match frame {
            ClientFrame::Connect => {
                self.connect(handle).await;
                handle.send(ServerFrame::Connected {
                    user: handle.username().to_string(),
                    heartbeat_ms: self.config.heartbeat_interval_seconds * 1_000,
                });
            }
            ClientFrame::Subscribe { id, destination } => {
                self.subscribe(handle, id, destination);
            }
            ClientFrame::Unsubscribe { id } => {
                if !self.broker.unsubscribe(handle.id, &id) {
                    debug!(conn_id = %handle.id, subscription = %id, "Unknown subscription");
                }
            }
            ClientFrame::Send { destination, body } => {
                self.send(handle, &destination, body).await;
            }
            ClientFrame::Disconnect { receipt } => {
                if let Some(receipt_id) = receipt {
                    handle.send(ServerFrame::Receipt { receipt_id });
                }
                self.disconnect(&handle.id).await;
                return FrameOutcome::Close;
            }
            ClientFrame::Heartbeat => {}
        }
        FrameOutcome::Continue
    }

    fn subscribe(&self, handle: &ConnectionHandle, id: String, destination: String) {
        if self.commands.handles(&destination) {
            self.commands.on_subscribe(handle, &id, &destination);
            return;
        }

        let destination = match resolve_user_subscription(
            &self.broker_config.user_prefix,
            handle.username(),
            &destination,
        ) {
            Some(user_destination) => user_destination,
            None if self.is_broker_destination(&destination) => destination,
            None => {
                handle.send(ServerFrame::error(format!("Unknown destination: {destination}")));
                return;
            }
        };

        let limit = self.config.max_subscriptions_per_connection;
        if self.broker.subscription_count(handle.id) >= limit {
            handle.send(ServerFrame::error(format!(
                "Maximum subscriptions ({limit}) reached"
            )));
            return;
        }

        let subscription = Subscription {
            id,
            connection_id: handle.id,
            destination,
            sender: handle.sender(),
        };
        if let Err(e) = self.broker.subscribe(subscription) {
            handle.send(ServerFrame::error(e.message));
            return;
        }

        // lost a race with release: do not leave a subscription behind
        if handle.is_closed() {
            self.broker.unsubscribe_all(handle.id);
        }
    }

    async fn send(&self, handle: &ConnectionHandle, destination: &str, body: serde_json::Value) {
        let result = if self.commands.handles(destination) {
            self.commands.on_send(handle, destination, body).await
        } else if self.is_broker_destination(destination) {
            self.broker
                .publish(destination, body)
                .await
                .map(|delivered| self.metrics.messages_delivered(delivered))
        } else {
            debug!(conn_id = %handle.id, destination = %destination, "Ignoring send to unknown destination");
            Ok(())
        };

        if let Err(e) = result {
            self.metrics.publish_failed();
            error!(
                conn_id = %handle.id,
                destination = %destination,
                error = %e,
                "Failed to deliver message"
            );
        }
    }

    fn is_broker_destination(&self, destination: &str) -> bool {
        self.broker_config
            .broker_prefixes
            .iter()
            .any(|prefix| destination.starts_with(prefix.as_str()))
    }

    /// `CONNECTING -> CONNECTED`: makes the session present and broadcasts
    /// ONLINE if it was not present already. Returns false if the connection
    /// was not in `CONNECTING`.
    pub async fn connect(&self, handle: &ConnectionHandle) -> bool {
        if !handle.lifecycle().mark_connected() {
            debug!(conn_id = %handle.id, state = %handle.state(), "Ignoring repeated CONNECT");
            return false;
        }

        let added = self
            .presence
            .attach(handle.session_id, handle.principal.clone(), handle.id);

        // release may have run between the state change and the attach
        if handle.is_closed() {
            if let Some(detached) = self.presence.detach(&handle.session_id, &handle.id) {
                if detached.announced {
                    self.broadcast_offline(detached.entry).await;
                }
            }
            return false;
        }

        info!(
            conn_id = %handle.id,
            session_id = %handle.session_id,
            username = %handle.principal,
            new_session = added,
            "Connection connected"
        );

        if added {
            self.broadcast_online(handle.username()).await;
            if !self.presence.mark_announced(&handle.session_id, &handle.id) {
                // removed while ONLINE was in flight; its release held OFFLINE back
                self.broadcast_offline_user(handle.username()).await;
            }
        }
        true
    }

    /// Releases a connection: removes it from the pool, the broker and the
    /// bridge, and detaches it from its session's presence slot.
    ///
    /// Synchronous so it can run from `Drop`. Exactly one caller per
    /// connection gets `Some`.
    pub fn release(&self, conn_id: &ConnectionId) -> Option<Released> {
        let handle = self.pool.remove(conn_id)?;

        handle.lifecycle().begin_disconnect();
        handle.close();

        self.broker.unsubscribe_all(handle.id);
        self.bridge.unbind(&handle.id);

        let offline = self
            .presence
            .detach(&handle.session_id, &handle.id)
            .filter(|detached| detached.announced)
            .map(|detached| detached.entry);
        handle.lifecycle().finish();
        self.metrics.connection_closed();

        info!(
            conn_id = %handle.id,
            session_id = %handle.session_id,
            session_offline = offline.is_some(),
            "Connection released"
        );

        Some(Released { handle, offline })
    }

    /// `CONNECTED -> DISCONNECTED`: releases the connection and broadcasts
    /// OFFLINE if this removed the session. Returns false if it was already released.
    pub async fn disconnect(&self, conn_id: &ConnectionId) -> bool {
        let Some(released) = self.release(conn_id) else {
            return false;
        };
        if let Some(entry) = released.offline {
            self.broadcast_offline(entry).await;
        }
        true
    }

    /// Applies the configured policy to a session that expired while connected.
    pub async fn on_session_expired(&self, session_id: &SessionId) -> usize {
        let connections = self.pool.session_connections(session_id);
        if connections.is_empty() {
            return 0;
        }

        match self.config.on_session_expired {
            ExpiredSessionPolicy::CloseConnection => {
                info!(
                    session_id = %session_id,
                    count = connections.len(),
                    "Session expired, closing its connections"
                );
                let mut closed = 0;
                for handle in connections {
                    handle.send(ServerFrame::error("Session expired"));
                    if self.disconnect(&handle.id).await {
                        closed += 1;
                    }
                }
                closed
            }
            ExpiredSessionPolicy::DenyNextMessage => {
                debug!(session_id = %session_id, "Session expired, connections close on next message");
                0
            }
        }
    }

    /// Consumes expiry events until `cancel` fires or the sender is dropped.
    pub async fn run_expiry_listener(
        self: Arc<Self>,
        mut events: broadcast::Receiver<SessionExpired>,
        cancel: CancellationToken,
    ) {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => event,
            };
            match event {
                Ok(SessionExpired { session_id }) => {
                    self.on_session_expired(&session_id).await;
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    // affected connections still close on their next message
                    warn!(missed, "Session expiry listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!("Session expiry listener stopped");
    }

    /// Disconnects every connection.
    pub async fn close_all(&self) -> usize {
        let all = self.pool.all_connections();
        let mut closed = 0;
        for handle in &all {
            if self.disconnect(&handle.id).await {
                closed += 1;
            }
        }
        info!(count = closed, "All connections closed");
        closed
    }

    async fn broadcast_online(&self, username: &str) {
        let topic = self.config.presence.signin_topic.clone();
        self.broadcast_presence(&topic, PresenceEvent::online(username))
            .await;
    }

    /// Publishes OFFLINE for a removed presence entry.
    pub async fn broadcast_offline(&self, entry: PresenceEntry) {
        self.broadcast_offline_user(&entry.principal.username).await;
    }

    async fn broadcast_offline_user(&self, username: &str) {
        let topic = self.config.presence.signout_topic.clone();
        self.broadcast_presence(&topic, PresenceEvent::offline(username))
            .await;
    }

    async fn broadcast_presence(&self, topic: &str, event: PresenceEvent) {
        let payload = match serde_json::to_value(&event) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "Failed to serialize presence event");
                return;
            }
        };

        // the registry mutation stands even if the broadcast fails
        match self.broker.publish(topic, payload).await {
            Ok(delivered) => {
                self.metrics.presence_broadcast();
                self.metrics.messages_delivered(delivered);
                debug!(topic = %topic, username = %event.username, delivered, "Presence broadcast");
            }
            Err(e) => {
                self.metrics.publish_failed();
                error!(topic = %topic, username = %event.username, error = %e, "Presence broadcast failed");
            }
        }
    }

    /// Gets a connection by id.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.pool.get(conn_id)
    }

    /// Info for every open connection.
    pub fn connections(&self) -> Vec<ConnectionInfo> {
        self.pool
            .all_connections()
            .iter()
            .map(|handle| handle.info())
            .collect()
    }

    /// Returns the total connection count.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// The presence registry.
    pub fn presence(&self) -> &Arc<PresenceRegistry> {
        &self.presence
    }

    /// Realtime configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }
}
