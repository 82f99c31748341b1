pub mod builtins;
pub mod context;
pub mod fs_ops;
pub mod registry;

pub use context::{Tool, ToolContext, ToolDefinition};
pub use fs_ops::{FileOps, FileEntry, ReadResult, SearchMatch, WriteMode, WriteResult};
pub use registry::ToolRegistry;
