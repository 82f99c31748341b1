//! File reading tool.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::ToolError;
use crate::tools::builtins::helpers::{optional_u64, required_str};
use crate::tools::{Tool, ToolContext, ToolDefinition};

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "Read a UTF-8 file under the project root. Refuses files larger \
                          than the configured cap."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Project-relative file path."
                    },
                    "max_bytes": {
                        "type": "integer",
                        "description": "Optional per-call size cap; the configured sandbox cap still applies.",
                        "minimum": 1
                    }
                },
                "required": ["path"]
            }),
        }
    }

    async fn call(&self, args: Value, context: &ToolContext) -> Result<Value, ToolError> {
        let path = required_str(&args, "path")?;
        let max_bytes = optional_u64(&args, "max_bytes");
        let result = context.fs.read_file(path, max_bytes).await?;
        Ok(serde_json::to_value(result)?)
    }
}
