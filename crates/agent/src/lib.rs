//! webgal-agent: a mediated mutation service for WebGAL project trees.
//!
//! An external agent issues read, search, mutate, validate, preview and
//! rollback requests over stdio JSON-RPC. The service enforces a path
//! sandbox, computes structured diffs, snapshots every mutation into a
//! content-addressed store, keeps idempotency durable across restarts, and
//! guards the project with a single-instance lock.

pub mod config;
pub mod diff;
pub mod error;
pub mod exec;
pub mod hash;
pub mod lock;
pub mod rpc;
pub mod sandbox;
pub mod script;
pub mod snapshot;
pub mod tools;

pub use config::{AgentConfig, ConfigOverrides};
pub use error::{ErrorCode, ErrorEnvelope, ToolError};
pub use lock::{LockInfo, ProjectLock};
pub use rpc::RpcServer;
pub use sandbox::PathSandbox;
pub use tools::{ToolContext, ToolRegistry};

/// Server identity reported by `initialize` and `get_runtime_info`.
pub const SERVER_NAME: &str = "webgal-agent";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
