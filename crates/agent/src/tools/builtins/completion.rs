//! Completion acknowledgement tool.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::ToolError;
use crate::tools::builtins::helpers::{optional_str, required_str};
use crate::tools::{Tool, ToolContext, ToolDefinition};

pub struct AttemptCompletionTool;

#[async_trait]
impl Tool for AttemptCompletionTool {
    fn name(&self) -> &'static str {
        "attempt_completion"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "Signal that the requested work is finished. The hosting \
                          client decides whether to accept the result."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "result": {
                        "type": "string",
                        "description": "Summary of what was accomplished."
                    },
                    "command": {
                        "type": "string",
                        "description": "Optional command the user can run to inspect the result."
                    }
                },
                "required": ["result"]
            }),
        }
    }

    async fn call(&self, args: Value, _context: &ToolContext) -> Result<Value, ToolError> {
        let result = required_str(&args, "result")?;
        let command = optional_str(&args, "command");
        let mut response = json!({ "acknowledged": true, "result": result });
        if let Some(command) = command {
            response["command"] = json!(command);
        }
        Ok(response)
    }
}
