//! Regex substitution tool with an optimistic concurrency check.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::ToolError;
use crate::tools::builtins::helpers::{optional_str, required_str};
use crate::tools::{Tool, ToolContext, ToolDefinition};

pub struct ReplaceInFileTool;

#[async_trait]
impl Tool for ReplaceInFileTool {
    fn name(&self) -> &'static str {
        "replace_in_file"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "Run a regex substitution over a file. Zero matches leave the \
                          file untouched; a concurrent external edit fails the call."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Project-relative file path."
                    },
                    "find": {
                        "type": "string",
                        "description": "Regular expression to search for."
                    },
                    "replace": {
                        "type": "string",
                        "description": "Replacement text; $1-style group references are expanded."
                    },
                    "flags": {
                        "type": "string",
                        "description": "Regex flags out of g, i, m, s.",
                        "default": "g"
                    }
                },
                "required": ["path", "find", "replace"]
            }),
        }
    }

    async fn call(&self, args: Value, context: &ToolContext) -> Result<Value, ToolError> {
        let path = required_str(&args, "path")?;
        let find = required_str(&args, "find")?;
        let replace = required_str(&args, "replace")?;
        let flags = optional_str(&args, "flags");

        let count = context.fs.replace_in_file(path, find, replace, flags).await?;
        Ok(json!({ "count": count }))
    }
}
