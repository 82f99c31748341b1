//! Content search tool.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::ToolError;
use crate::tools::builtins::helpers::{optional_str, optional_u64, required_str};
use crate::tools::{Tool, ToolContext, ToolDefinition};

const DEFAULT_MAX_MATCHES: u64 = 2_000;

pub struct SearchFilesTool;

#[async_trait]
impl Tool for SearchFilesTool {
    fn name(&self) -> &'static str {
        "search_files"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "Search file contents under a directory with a regular \
                          expression. Dotfiles are skipped; previews are truncated to \
                          200 characters."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Project-relative directory to search."
                    },
                    "regex": {
                        "type": "string",
                        "description": "Regular expression matched per line."
                    },
                    "file_pattern": {
                        "type": "string",
                        "description": "Glob filter on paths relative to `path` (e.g. \"scene/*.txt\")."
                    },
                    "max_matches": {
                        "type": "integer",
                        "description": "Stop after this many matches.",
                        "default": 2000,
                        "minimum": 1
                    }
                },
                "required": ["path", "regex"]
            }),
        }
    }

    async fn call(&self, args: Value, context: &ToolContext) -> Result<Value, ToolError> {
        let path = required_str(&args, "path")?;
        let regex = required_str(&args, "regex")?;
        let file_pattern = optional_str(&args, "file_pattern");
        let max_matches = optional_u64(&args, "max_matches").unwrap_or(DEFAULT_MAX_MATCHES) as usize;

        let matches = context
            .fs
            .search_files(path, regex, file_pattern, max_matches)
            .await?;
        Ok(json!({ "matches": matches }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn finds_matches() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("game/scene")).unwrap();
        std::fs::write(
            dir.path().join("game/scene/start.txt"),
            "intro:hi;\nsetVar:n=1;\n",
        )
        .unwrap();

        let context = ToolContext::with_defaults(dir.path()).unwrap();
        let result = SearchFilesTool
            .call(json!({"path": "game", "regex": "setVar"}), &context)
            .await
            .unwrap();
        let matches = result["matches"].as_array().unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0]["line"], 2);
    }
}
