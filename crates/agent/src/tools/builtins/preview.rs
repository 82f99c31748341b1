//! Preview launcher: start the project's dev server and return its URL as
//! soon as a port shows up in the logs.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};
use std::path::PathBuf;

use crate::error::ToolError;
use crate::tools::builtins::helpers::optional_str;
use crate::tools::{Tool, ToolContext, ToolDefinition};

const PREVIEW_TIMEOUT_MS: u64 = 20_000;

static PORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:localhost|127\.0\.0\.1):(\d{2,5})").expect("static regex"));

pub struct PreviewSceneTool;

#[async_trait]
impl Tool for PreviewSceneTool {
    fn name(&self) -> &'static str {
        "preview_scene"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "Start the project's dev server and return a preview URL, \
                          optionally anchored to a scene. Requires execution to be \
                          enabled."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "scene_path": {
                        "type": "string",
                        "description": "Project-relative scene file to open, e.g. game/scene/start.txt."
                    }
                }
            }),
        }
    }

    async fn call(&self, args: Value, context: &ToolContext) -> Result<Value, ToolError> {
        let Some(execution) = context.config.execution.as_ref() else {
            return Err(ToolError::ToolDisabled {
                tool: self.name().to_string(),
            });
        };
        if !execution.allowed_commands.iter().any(|c| c == "dev") {
            return Err(ToolError::PolicyViolation {
                what: "the dev script is not in the allowed command list".to_string(),
            });
        }

        let fragment = match optional_str(&args, "scene_path") {
            Some(scene) => {
                let abs = context.sandbox.validate(scene)?;
                if !tokio::fs::try_exists(&abs).await.unwrap_or(false) {
                    return Err(ToolError::NotFound {
                        what: context.sandbox.relative_posix(&abs),
                    });
                }
                let stem = abs
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Some(stem)
            }
            None => None,
        };

        let cwd = match execution.working_dir.as_deref() {
            Some(dir) => context.sandbox.validate(dir)?,
            None => PathBuf::from(context.project_root()),
        };

        let args = vec!["run".to_string(), "dev".to_string()];
        let stream = context
            .executor
            .run_stream_until("npm", &args, &cwd, PREVIEW_TIMEOUT_MS, &PORT_RE)
            .await?;

        let Some(line) = stream.matched_line else {
            return Err(ToolError::PreviewFail {
                reason: "dev server produced no port before the timeout".to_string(),
                logs: stream.logs,
            });
        };
        let port = PORT_RE
            .captures(&line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ToolError::PreviewFail {
                reason: "port pattern matched but no port was captured".to_string(),
                logs: stream.logs.clone(),
            })?;

        let url = match fragment {
            Some(stem) => format!("http://localhost:{port}#scene={stem}"),
            None => format!("http://localhost:{port}"),
        };
        Ok(json!({ "url": url }))
    }
}
