//! Stdio JSON-RPC server: one JSON document per line in, one per line out.
//!
//! Tool calls run behind a per-method timeout; expected failures come back
//! as error envelopes inside the content wrapper, panics are converted to
//! `E_INTERNAL`, and the loop itself never dies on a bad request.

use crate::error::{ErrorEnvelope, ToolError};
use crate::rpc::protocol::{
    INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR, RpcError, RpcRequest,
    RpcResponse, error_content, tool_content,
};
use crate::rpc::prompts;
use crate::tools::{ToolContext, ToolRegistry};
use crate::{SERVER_NAME, SERVER_VERSION};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const SEARCH_TIMEOUT: Duration = Duration::from_secs(45);
const PREVIEW_TIMEOUT: Duration = Duration::from_secs(60);

pub struct RpcServer {
    registry: ToolRegistry,
    context: Arc<ToolContext>,
    /// Test hook: overrides every per-call timeout when set.
    call_timeout_override: Option<Duration>,
}

impl RpcServer {
    pub fn new(context: Arc<ToolContext>) -> Self {
        let registry = ToolRegistry::builtin();
        context.set_tool_names(registry.names());
        Self {
            registry,
            context,
            call_timeout_override: None,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_override = Some(timeout);
        self
    }

    /// Serve until stdin closes.
    #[tracing::instrument(name = "rpc.serve_stdio", skip_all)]
    pub async fn serve_stdio(&self) -> std::io::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        let mut lines = stdin.lines();

        log::info!("rpc server listening on stdio");
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line).await {
                stdout.write_all(response.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }
        log::info!("stdin closed, rpc server stopping");
        Ok(())
    }

    /// Handle one wire line; `None` means no response is due
    /// (notification).
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let parsed: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                let response = RpcResponse::failure(
                    Value::Null,
                    RpcError::new(PARSE_ERROR, format!("parse error: {e}")),
                );
                return serde_json::to_string(&response).ok();
            }
        };
        let id = parsed.get("id").cloned();
        let request: RpcRequest = match serde_json::from_value(parsed) {
            Ok(request) => request,
            Err(e) => {
                let response = RpcResponse::failure(
                    id.unwrap_or(Value::Null),
                    RpcError::new(INVALID_REQUEST, format!("invalid request: {e}")),
                );
                return serde_json::to_string(&response).ok();
            }
        };

        let response = self.dispatch(request).await?;
        serde_json::to_string(&response).ok()
    }

    /// Dispatch one request. Notifications (no id) are acknowledged
    /// silently.
    pub async fn dispatch(&self, request: RpcRequest) -> Option<RpcResponse> {
        let Some(id) = request.id else {
            log::debug!("notification: {}", request.method);
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => RpcResponse::success(
                id,
                json!({
                    "server_info": { "name": SERVER_NAME, "version": SERVER_VERSION },
                    "capabilities": { "tools": {}, "prompts": {} },
                }),
            ),
            "tools/list" => RpcResponse::success(
                id,
                json!({ "tools": self.registry.definitions() }),
            ),
            "tools/call" => {
                let result = self.call_tool(request.params.unwrap_or_else(|| json!({}))).await;
                RpcResponse::success(id, result)
            }
            "prompts/list" => RpcResponse::success(id, json!({ "prompts": prompts::list() })),
            "prompts/get" => match self.get_prompt(request.params) {
                Ok(result) => RpcResponse::success(id, result),
                Err(error) => RpcResponse::failure(id, error),
            },
            other => RpcResponse::failure(
                id,
                RpcError::new(METHOD_NOT_FOUND, format!("method not found: {other}")),
            ),
        };
        Some(response)
    }

    fn get_prompt(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params = params.unwrap_or_else(|| json!({}));
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::new(INVALID_PARAMS, "prompt name is required"))?;
        let arguments = params
            .get("arguments")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let (description, text) = prompts::render(name, &arguments)
            .ok_or_else(|| RpcError::new(INVALID_PARAMS, format!("unknown prompt: {name}")))?;
        Ok(json!({
            "description": description,
            "messages": [{
                "role": "user",
                "content": { "type": "text", "text": text }
            }]
        }))
    }

    /// Run a named tool with a per-call timeout. The result is always a
    /// content envelope; failures never escape as transport errors.
    #[tracing::instrument(name = "rpc.tool_call", skip_all)]
    async fn call_tool(&self, params: Value) -> Value {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            let err = ToolError::bad_args("tool name is required");
            return error_content(&err.envelope());
        };
        let name = name.to_string();
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        let Some(tool) = self.registry.find(&name) else {
            let err = ToolError::Unsupported {
                what: format!("unknown tool: {name}"),
            };
            return error_content(&err.envelope());
        };

        let hex = Uuid::new_v4().simple().to_string();
        let op_id = format!("op_{}", &hex[..8]);
        let timeout = self.timeout_for(&name);
        log::debug!("{op_id}: calling {name}");

        let context = Arc::clone(&self.context);
        let handle = tokio::spawn(async move { tool.call(arguments, &context).await });

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(Ok(result))) => {
                log::debug!("{op_id}: {name} ok");
                tool_content(&result, false)
            }
            Ok(Ok(Err(err))) => {
                log::debug!("{op_id}: {name} failed: {err}");
                error_content(&err.envelope())
            }
            Ok(Err(join_err)) => {
                log::error!("{op_id}: {name} panicked: {join_err}");
                let envelope = ErrorEnvelope::internal(
                    format!("tool {name} failed unexpectedly"),
                    json!({ "op_id": op_id, "cause": join_err.to_string() }),
                );
                error_content(&envelope)
            }
            Err(_) => {
                log::warn!("{op_id}: {name} timed out after {}ms", timeout.as_millis());
                let err = ToolError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                    op_id,
                };
                error_content(&err.envelope())
            }
        }
    }

    fn timeout_for(&self, tool: &str) -> Duration {
        if let Some(timeout) = self.call_timeout_override {
            return timeout;
        }
        match tool {
            "search_files" => SEARCH_TIMEOUT,
            "preview_scene" => PREVIEW_TIMEOUT,
            _ => DEFAULT_TIMEOUT,
        }
    }
}
