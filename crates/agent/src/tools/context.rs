//! Tool trait and the shared execution context.

use crate::config::{AgentConfig, ConfigOverrides};
use crate::error::ToolError;
use crate::exec::{BrowserDriver, CommandExecutor, NoBrowserDriver, ProcessExecutor};
use crate::lock::LockInfo;
use crate::sandbox::PathSandbox;
use crate::snapshot::SnapshotStore;
use crate::tools::fs_ops::FileOps;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Registry entry shape returned by `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// One named operation of the RPC surface.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn definition(&self) -> ToolDefinition;

    /// Execute with schema-shaped arguments. Expected failures come back as
    /// [`ToolError`]; the RPC layer renders the envelope.
    async fn call(&self, args: Value, context: &ToolContext) -> Result<Value, ToolError>;
}

/// Everything a tool may touch, created once at launcher time and owned by
/// the RPC server for its lifetime.
pub struct ToolContext {
    project_root: PathBuf,
    pub sandbox: Arc<PathSandbox>,
    pub fs: FileOps,
    pub config: Arc<AgentConfig>,
    pub lock: Option<LockInfo>,
    pub executor: Arc<dyn CommandExecutor>,
    pub browser: Arc<dyn BrowserDriver>,
    tool_names: parking_lot::RwLock<Vec<String>>,
}

impl ToolContext {
    pub fn new(
        project_root: PathBuf,
        config: AgentConfig,
        lock: Option<LockInfo>,
        executor: Arc<dyn CommandExecutor>,
        browser: Arc<dyn BrowserDriver>,
    ) -> Arc<Self> {
        let sandbox = PathSandbox::new(
            project_root.clone(),
            config.sandbox.forbidden_dirs.clone(),
            config.sandbox.max_read_bytes,
            config.sandbox.text_encoding.clone(),
        );
        let store = SnapshotStore::new(
            &project_root,
            config.snapshot_retention,
            config.idempotency.clone(),
        );
        let fs = FileOps::new(Arc::clone(&sandbox), store);
        Arc::new(Self {
            project_root,
            sandbox,
            fs,
            config: Arc::new(config),
            lock,
            executor,
            browser,
            tool_names: parking_lot::RwLock::new(Vec::new()),
        })
    }

    /// Context with default configuration, the process executor, and no
    /// browser driver attached.
    pub fn with_defaults(project_root: &Path) -> Result<Arc<Self>, ToolError> {
        let resolved = crate::config::resolve(project_root, None, &ConfigOverrides::default())?;
        Ok(Self::new(
            project_root.to_path_buf(),
            resolved.config,
            None,
            Arc::new(ProcessExecutor),
            Arc::new(NoBrowserDriver),
        ))
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Set by the RPC server once the registry is built.
    pub fn set_tool_names(&self, names: Vec<String>) {
        *self.tool_names.write() = names;
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tool_names.read().clone()
    }
}
