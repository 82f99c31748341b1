//! Runtime reflection: resolved config, live lock, and the tool list, with
//! secret-looking fields stripped.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};

use crate::error::ToolError;
use crate::tools::{Tool, ToolContext, ToolDefinition};
use crate::{SERVER_NAME, SERVER_VERSION};

static SECRET_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(api[_-]?key|token|secret|password|authorization)").expect("static regex")
});

pub struct GetRuntimeInfoTool;

#[async_trait]
impl Tool for GetRuntimeInfoTool {
    fn name(&self) -> &'static str {
        "get_runtime_info"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "Report the frozen configuration, the live project lock, and \
                          the registered tool names. Secret-looking fields are redacted."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    async fn call(&self, _args: Value, context: &ToolContext) -> Result<Value, ToolError> {
        let mut config = serde_json::to_value(context.config.as_ref())?;
        redact(&mut config);

        let mut result = json!({
            "server": { "name": SERVER_NAME, "version": SERVER_VERSION },
            "project_root": context.project_root().display().to_string(),
            "config": config,
            "tools": context.tool_names(),
        });
        if let Some(lock) = &context.lock {
            result["lock"] = serde_json::to_value(lock)?;
        }
        Ok(result)
    }
}

/// Drop `redactEnv` and any key that looks like a credential, recursively.
fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| key != "redactEnv" && !SECRET_KEY_RE.is_match(key));
            for child in map.values_mut() {
                redact(child);
            }
        }
        Value::Array(items) => {
            for child in items {
                redact(child);
            }
        }
        _ => {}
    }
}
