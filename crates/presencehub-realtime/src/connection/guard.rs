//! Scoped release of a connection.

use std::sync::Arc;

use tracing::warn;

use presencehub_core::types::ConnectionId;

use super::manager::ConnectionLifecycleManager;

/// Releases its connection when dropped.
///
/// Held by the task serving the transport, so the presence slot is freed on
/// every exit path, including cancellation and panics. If the drop performs
/// the release, the OFFLINE broadcast is spawned onto the runtime.
#[derive(Debug)]
pub struct ConnectionGuard {
    manager: Arc<ConnectionLifecycleManager>,
    conn_id: ConnectionId,
}

impl ConnectionGuard {
    /// Guards `conn_id`.
    pub fn new(manager: Arc<ConnectionLifecycleManager>, conn_id: ConnectionId) -> Self {
        Self { manager, conn_id }
    }

    /// The guarded connection.
    pub fn connection_id(&self) -> ConnectionId {
        self.conn_id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let Some(released) = self.manager.release(&self.conn_id) else {
            return;
        };
        let Some(entry) = released.offline else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let manager = self.manager.clone();
                runtime.spawn(async move { manager.broadcast_offline(entry).await });
            }
            Err(_) => warn!(
                conn_id = %self.conn_id,
                username = %entry.principal,
                "No runtime to broadcast OFFLINE"
            ),
        }
    }
}
