//! Snapshot listing and restore tools.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::ToolError;
use crate::tools::builtins::helpers::{optional_f64, optional_str, required_str};
use crate::tools::{Tool, ToolContext, ToolDefinition};

pub struct ListSnapshotsTool;

#[async_trait]
impl Tool for ListSnapshotsTool {
    fn name(&self) -> &'static str {
        "list_snapshots"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "List stored snapshots, newest first, optionally filtered by \
                          path prefix."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "integer",
                        "description": "Maximum entries; defaults to 50, capped at 1000.",
                        "default": 50
                    },
                    "path": {
                        "type": "string",
                        "description": "Keep only snapshots whose path starts with this prefix."
                    }
                }
            }),
        }
    }

    async fn call(&self, args: Value, context: &ToolContext) -> Result<Value, ToolError> {
        let limit = optional_f64(&args, "limit");
        let path = optional_str(&args, "path");
        let snapshots = context.fs.list_snapshots(path, limit).await?;
        Ok(json!({ "snapshots": snapshots }))
    }
}

pub struct RestoreSnapshotTool;

#[async_trait]
impl Tool for RestoreSnapshotTool {
    fn name(&self) -> &'static str {
        "restore_snapshot"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "Read back a snapshot's path and content by id. Writing the \
                          content back restores the file."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "snapshot_id": {
                        "type": "string",
                        "description": "Id of the form snap_<yyyymmddThhmmss>_<8 hex>.",
                        "pattern": "^snap_\\d{8}T\\d{6}_[0-9a-f]{8}$"
                    }
                },
                "required": ["snapshot_id"]
            }),
        }
    }

    async fn call(&self, args: Value, context: &ToolContext) -> Result<Value, ToolError> {
        let snapshot_id = required_str(&args, "snapshot_id")?;
        let (path, content) = context.fs.restore_snapshot(snapshot_id).await?;
        Ok(json!({ "path": path, "content": content }))
    }
}
