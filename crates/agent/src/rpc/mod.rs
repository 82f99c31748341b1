//! Stdio JSON-RPC transport, protocol envelopes, and prompt templates.

pub mod prompts;
pub mod protocol;
pub mod server;

pub use protocol::{RpcError, RpcRequest, RpcResponse};
pub use server::RpcServer;
