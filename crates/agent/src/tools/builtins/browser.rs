//! Gated browser automation: host allow-list enforcement in front of the
//! attached driver.

use async_trait::async_trait;
use serde_json::{Value, json};
use url::Url;

use crate::error::ToolError;
use crate::tools::builtins::helpers::{optional_str, required_str};
use crate::tools::{Tool, ToolContext, ToolDefinition};

pub struct BrowserActionTool;

#[async_trait]
impl Tool for BrowserActionTool {
    fn name(&self) -> &'static str {
        "browser_action"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "Drive the attached browser (navigate, click, screenshot, …). \
                          URLs must target an allowed host. Disabled unless browser \
                          automation is enabled."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "description": "Driver action, e.g. navigate, click, screenshot, close."
                    },
                    "url": {
                        "type": "string",
                        "description": "Target URL for navigation actions."
                    },
                    "params": {
                        "type": "object",
                        "description": "Action-specific parameters passed to the driver."
                    }
                },
                "required": ["action"]
            }),
        }
    }

    async fn call(&self, args: Value, context: &ToolContext) -> Result<Value, ToolError> {
        let Some(browser) = context.config.browser.as_ref() else {
            return Err(ToolError::ToolDisabled {
                tool: self.name().to_string(),
            });
        };

        let action = required_str(&args, "action")?;
        if let Some(raw) = optional_str(&args, "url") {
            let parsed = Url::parse(raw)
                .map_err(|e| ToolError::bad_args(format!("bad url '{raw}': {e}")))?;
            let host = parsed.host_str().unwrap_or_default();
            if !browser.allowed_hosts.iter().any(|h| h == host) {
                return Err(ToolError::PolicyViolation {
                    what: format!("host not whitelisted: {host}"),
                });
            }
        }

        let mut params = args
            .get("params")
            .cloned()
            .unwrap_or_else(|| json!({}));
        if !params.is_object() {
            return Err(ToolError::bad_args("params must be an object"));
        }
        if let Some(url) = optional_str(&args, "url") {
            params["url"] = json!(url);
        }
        context.browser.perform(action, &params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOverrides;
    use crate::exec::{BrowserDriver, ProcessExecutor};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct RecordingDriver;

    #[async_trait]
    impl BrowserDriver for RecordingDriver {
        async fn perform(&self, action: &str, params: &Value) -> Result<Value, ToolError> {
            Ok(json!({ "performed": action, "params": params }))
        }
    }

    fn context(dir: &TempDir, enabled: bool) -> Arc<ToolContext> {
        let overrides = ConfigOverrides {
            enable_browser: enabled,
            ..Default::default()
        };
        let resolved = crate::config::resolve(dir.path(), None, &overrides).unwrap();
        ToolContext::new(
            dir.path().to_path_buf(),
            resolved.config,
            None,
            Arc::new(ProcessExecutor),
            Arc::new(RecordingDriver),
        )
    }

    #[tokio::test]
    async fn disabled_by_default() {
        let dir = TempDir::new().unwrap();
        let context = context(&dir, false);
        let err = BrowserActionTool
            .call(json!({"action": "navigate", "url": "http://localhost:3001"}), &context)
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::ToolDisabled);
    }

    #[tokio::test]
    async fn foreign_hosts_are_policy_violations() {
        let dir = TempDir::new().unwrap();
        let context = context(&dir, true);
        let err = BrowserActionTool
            .call(
                json!({"action": "navigate", "url": "https://example.com/steal"}),
                &context,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::PolicyViolation);
    }

    #[tokio::test]
    async fn allowed_host_reaches_the_driver() {
        let dir = TempDir::new().unwrap();
        let context = context(&dir, true);
        let result = BrowserActionTool
            .call(
                json!({"action": "navigate", "url": "http://localhost:3001#scene=start"}),
                &context,
            )
            .await
            .unwrap();
        assert_eq!(result["performed"], "navigate");
        assert_eq!(result["params"]["url"], "http://localhost:3001#scene=start");
    }
}
