//! Tool registry: the static set of named operations exposed over RPC.

use crate::tools::Tool;
use crate::tools::builtins;
use crate::tools::context::ToolDefinition;
use std::sync::Arc;

/// Registration order is the wire order of `tools/list`.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// The full built-in surface, gated tools included (they reject their
    /// own calls when the matching config section is absent).
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .add(Arc::new(builtins::ListFilesTool))
            .add(Arc::new(builtins::ReadFileTool))
            .add(Arc::new(builtins::WriteToFileTool))
            .add(Arc::new(builtins::ReplaceInFileTool))
            .add(Arc::new(builtins::SearchFilesTool))
            .add(Arc::new(builtins::ValidateScriptTool))
            .add(Arc::new(builtins::ListProjectResourcesTool))
            .add(Arc::new(builtins::ListSnapshotsTool))
            .add(Arc::new(builtins::RestoreSnapshotTool))
            .add(Arc::new(builtins::PreviewSceneTool))
            .add(Arc::new(builtins::AskFollowupQuestionTool))
            .add(Arc::new(builtins::AttemptCompletionTool))
            .add(Arc::new(builtins::GetRuntimeInfoTool))
            .add(Arc::new(builtins::ExecuteCommandTool))
            .add(Arc::new(builtins::BrowserActionTool));
        registry
    }

    pub fn add(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        self.tools.push(tool);
        self
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }
}
