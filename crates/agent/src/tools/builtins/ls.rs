//! Directory listing tool.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::ToolError;
use crate::tools::builtins::helpers::{optional_bool, optional_str_vec, required_str};
use crate::tools::{Tool, ToolContext, ToolDefinition};

pub struct ListFilesTool;

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &'static str {
        "list_files"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "List entries of a project directory. With globs, matches are \
                          collected recursively and returned relative to the directory."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Project-relative directory to list."
                    },
                    "globs": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Glob patterns matched against paths relative to `path`."
                    },
                    "dirs_only": {
                        "type": "boolean",
                        "description": "Return only directories.",
                        "default": false
                    }
                },
                "required": ["path"]
            }),
        }
    }

    async fn call(&self, args: Value, context: &ToolContext) -> Result<Value, ToolError> {
        let path = required_str(&args, "path")?;
        let globs = optional_str_vec(&args, "globs")?;
        let dirs_only = optional_bool(&args, "dirs_only").unwrap_or(false);

        let entries = context
            .fs
            .list_files(path, globs.as_deref(), dirs_only)
            .await?;
        Ok(json!({ "entries": entries }))
    }
}
