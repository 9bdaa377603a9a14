//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use presencehub_auth::policy::PolicyEngine;
use presencehub_auth::session::SessionExpiryWatcher;
use presencehub_core::config::AppConfig;
use presencehub_core::result::AppResult;
use presencehub_core::traits::SessionRepository;

use crate::bridge::SessionBridge;
use crate::broker::SimpleBroker;
use crate::connection::manager::ConnectionLifecycleManager;
use crate::metrics::RealtimeMetrics;
use crate::presence::PresenceRegistry;

/// Central real-time engine, assembled once at startup.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection lifecycle manager.
    pub connections: Arc<ConnectionLifecycleManager>,
    /// Presence registry.
    pub presence: Arc<PresenceRegistry>,
    /// Session bridge.
    pub bridge: Arc<SessionBridge>,
    /// In-process broker.
    pub broker: Arc<SimpleBroker>,
    /// Authorization policy.
    pub policy: Arc<PolicyEngine>,
    /// Session expiry watcher.
    pub watcher: Arc<SessionExpiryWatcher>,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
    /// Shutdown signal for background tasks.
    shutdown: CancellationToken,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

impl RealtimeEngine {
    /// Creates the engine. Fails if the policy rules do not compile.
    pub fn new(config: &AppConfig, sessions: Arc<dyn SessionRepository>) -> AppResult<Self> {
        let policy = Arc::new(PolicyEngine::from_config(&config.policy)?);
        let metrics = Arc::new(RealtimeMetrics::new());
        let presence = Arc::new(PresenceRegistry::new());
        let broker = Arc::new(SimpleBroker::new(config.broker.retry));
        let watcher = Arc::new(SessionExpiryWatcher::new(
            sessions.clone(),
            Duration::from_secs(config.session.expiry_poll_interval_seconds.max(1)),
        ));
        let bridge = Arc::new(SessionBridge::new(
            sessions,
            watcher.clone(),
            config.session.retry,
        ));
        let connections = Arc::new(ConnectionLifecycleManager::new(
            config.realtime.clone(),
            config.broker.clone(),
            presence.clone(),
            bridge.clone(),
            policy.clone(),
            broker.clone(),
            metrics.clone(),
        ));

        info!(rules = policy.rules().len(), "Real-time engine initialized");

        Ok(Self {
            connections,
            presence,
            bridge,
            broker,
            policy,
            watcher,
            metrics,
            shutdown: CancellationToken::new(),
        })
    }

    /// Spawns the expiry watcher and the expiry listener.
    pub fn start(&self) {
        let events = self.watcher.subscribe();
        tokio::spawn(
            self.connections
                .clone()
                .run_expiry_listener(events, self.shutdown.child_token()),
        );
        tokio::spawn(self.watcher.clone().run(self.shutdown.child_token()));
        info!("Real-time engine started");
    }

    /// Token cancelled on shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stops background tasks, disconnects every client and closes the broker.
    pub async fn shutdown(&self) -> AppResult<()> {
        info!("Shutting down real-time engine");

        self.shutdown.cancel();
        self.connections.close_all().await;
        self.broker.shutdown();

        info!("Real-time engine shut down");
        Ok(())
    }
}
