//! Two-phase write tool: dry-run returns the diff and records a fingerprint,
//! apply performs the atomic write behind the conflict check.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::ToolError;
use crate::tools::builtins::helpers::{optional_str, required_str};
use crate::tools::fs_ops::WriteMode;
use crate::tools::{Tool, ToolContext, ToolDefinition};

pub struct WriteToFileTool;

#[async_trait]
impl Tool for WriteToFileTool {
    fn name(&self) -> &'static str {
        "write_to_file"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "Write a file in two phases: call with dry_run=true to preview \
                          the diff, then dry_run=false to apply atomically. Every apply \
                          is snapshotted and reversible; an idempotency_key makes \
                          retries safe across restarts."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Project-relative file path."
                    },
                    "content": {
                        "type": "string",
                        "description": "Content to write (or append)."
                    },
                    "mode": {
                        "type": "string",
                        "enum": ["overwrite", "append"],
                        "default": "overwrite"
                    },
                    "dry_run": {
                        "type": "boolean",
                        "description": "true: compute the diff only; false: apply."
                    },
                    "idempotency_key": {
                        "type": "string",
                        "description": "Caller-supplied retry token."
                    }
                },
                "required": ["path", "content", "dry_run"]
            }),
        }
    }

    async fn call(&self, args: Value, context: &ToolContext) -> Result<Value, ToolError> {
        let path = required_str(&args, "path")?;
        let content = required_str(&args, "content")?;
        let dry_run = args
            .get("dry_run")
            .and_then(Value::as_bool)
            .ok_or_else(|| ToolError::bad_args("dry_run is required"))?;
        let mode = match optional_str(&args, "mode") {
            None => WriteMode::Overwrite,
            Some("overwrite") => WriteMode::Overwrite,
            Some("append") => WriteMode::Append,
            Some(other) => {
                return Err(ToolError::bad_args(format!("unknown write mode: {other}")));
            }
        };
        let idempotency_key = optional_str(&args, "idempotency_key");

        let result = context
            .fs
            .write_to_file(path, content, mode, dry_run, idempotency_key)
            .await?;
        Ok(serde_json::to_value(result)?)
    }
}
