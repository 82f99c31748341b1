//! Content-addressed snapshot store and the durable idempotency cache.

pub mod idempotency;
pub mod store;

pub use idempotency::{IdempotencyCache, IdempotencyConfig, IdempotencyEntry};
pub use store::{SnapshotMeta, SnapshotStore, write_atomic};

/// Service-private state directory under the project root.
pub const AGENT_DIR: &str = ".webgal_agent";
/// Snapshot bodies and metadata live here.
pub const SNAPSHOT_DIR: &str = "snapshots";
/// Persisted idempotency document.
pub const IDEM_FILE: &str = "idem.json";
/// Single-instance lock file.
pub const LOCK_FILE: &str = "agent.lock";
