//! Connection lifecycle.

pub mod guard;
pub mod handle;
pub mod heartbeat;
pub mod manager;
pub mod pool;
pub mod state;

pub use guard::ConnectionGuard;
pub use handle::{ConnectionHandle, ConnectionInfo};
pub use heartbeat::{HeartbeatConfig, HeartbeatExit, run_heartbeat};
pub use manager::{ConnectionLifecycleManager, FrameOutcome, Released};
pub use state::ConnectionState;
