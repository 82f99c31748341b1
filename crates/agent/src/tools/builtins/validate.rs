//! Scene-script validation tool.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::ToolError;
use crate::script;
use crate::tools::builtins::helpers::optional_str;
use crate::tools::{Tool, ToolContext, ToolDefinition};

pub struct ValidateScriptTool;

#[async_trait]
impl Tool for ValidateScriptTool {
    fn name(&self) -> &'static str {
        "validate_script"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "Lint a scene script, either inline content or a project file. \
                          Reports syntax and missing-resource diagnostics; never fails \
                          on script problems."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "content": {
                        "type": "string",
                        "description": "Inline script text to validate."
                    },
                    "path": {
                        "type": "string",
                        "description": "Project-relative script file to validate instead."
                    }
                }
            }),
        }
    }

    async fn call(&self, args: Value, context: &ToolContext) -> Result<Value, ToolError> {
        let content = match (optional_str(&args, "content"), optional_str(&args, "path")) {
            (Some(content), _) => content.to_string(),
            (None, Some(path)) => context.fs.read_file(path, None).await?.content,
            (None, None) => {
                return Err(ToolError::bad_args("either content or path is required"));
            }
        };

        let report = script::validate_script(&content, &context.sandbox);
        Ok(serde_json::to_value(report)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn validates_inline_content() {
        let dir = TempDir::new().unwrap();
        let context = ToolContext::with_defaults(dir.path()).unwrap();
        let result = ValidateScriptTool
            .call(
                json!({"content": "changeBg: nonexistent.jpg;\nchangeBg beach.jpg\n"}),
                &context,
            )
            .await
            .unwrap();
        assert_eq!(result["valid"], false);
        let diags = result["diagnostics"].as_array().unwrap();
        assert!(diags.iter().any(|d| d["line"] == 1 && d["kind"] == "resource"));
        assert!(diags.iter().any(|d| d["line"] == 2 && d["kind"] == "syntax"));
    }

    #[tokio::test]
    async fn validates_a_project_file() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("game/scene")).unwrap();
        std::fs::write(dir.path().join("game/scene/start.txt"), "你好;\nend;\n").unwrap();
        let context = ToolContext::with_defaults(dir.path()).unwrap();
        let result = ValidateScriptTool
            .call(json!({"path": "game/scene/start.txt"}), &context)
            .await
            .unwrap();
        assert_eq!(result["valid"], true);
        assert_eq!(result["diagnostics"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn requires_content_or_path() {
        let dir = TempDir::new().unwrap();
        let context = ToolContext::with_defaults(dir.path()).unwrap();
        let err = ValidateScriptTool.call(json!({}), &context).await.unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::BadArgs);
    }
}
