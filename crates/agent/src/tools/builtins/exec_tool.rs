//! Gated command execution over the project's package scripts.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::PathBuf;

use crate::error::ToolError;
use crate::tools::builtins::helpers::{optional_str_vec, required_str};
use crate::tools::{Tool, ToolContext, ToolDefinition};

pub struct ExecuteCommandTool;

#[async_trait]
impl Tool for ExecuteCommandTool {
    fn name(&self) -> &'static str {
        "execute_command"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "Run a whitelisted package script (npm run <command>) and \
                          capture its output. Disabled unless execution is enabled."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "Script name from the allowed command list."
                    },
                    "args": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Extra arguments appended after the script name."
                    }
                },
                "required": ["command"]
            }),
        }
    }

    async fn call(&self, args: Value, context: &ToolContext) -> Result<Value, ToolError> {
        let Some(execution) = context.config.execution.as_ref() else {
            return Err(ToolError::ToolDisabled {
                tool: self.name().to_string(),
            });
        };

        let command = required_str(&args, "command")?;
        if !execution.allowed_commands.iter().any(|c| c == command) {
            return Err(ToolError::PolicyViolation {
                what: format!("command not whitelisted: {command}"),
            });
        }
        let extra = optional_str_vec(&args, "args")?.unwrap_or_default();

        let cwd = match execution.working_dir.as_deref() {
            Some(dir) => context.sandbox.validate(dir)?,
            None => PathBuf::from(context.project_root()),
        };

        let mut npm_args = vec!["run".to_string(), command.to_string()];
        npm_args.extend(extra);

        let outcome = context
            .executor
            .run(
                "npm",
                &npm_args,
                &cwd,
                execution.timeout_ms,
                &execution.redact_env,
            )
            .await?;
        Ok(serde_json::to_value(outcome)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn disabled_by_default() {
        let dir = TempDir::new().unwrap();
        let context = ToolContext::with_defaults(dir.path()).unwrap();
        let err = ExecuteCommandTool
            .call(json!({"command": "dev"}), &context)
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::ToolDisabled);
    }

    #[tokio::test]
    async fn non_whitelisted_command_is_a_policy_violation() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"scripts": {"dev": "terre dev"}}"#,
        )
        .unwrap();
        let overrides = crate::config::ConfigOverrides {
            enable_exec: true,
            ..Default::default()
        };
        let resolved = crate::config::resolve(dir.path(), None, &overrides).unwrap();
        let context = ToolContext::new(
            dir.path().to_path_buf(),
            resolved.config,
            None,
            std::sync::Arc::new(crate::exec::ProcessExecutor),
            std::sync::Arc::new(crate::exec::NoBrowserDriver),
        );

        let err = ExecuteCommandTool
            .call(json!({"command": "deploy"}), &context)
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::PolicyViolation);
    }
}
