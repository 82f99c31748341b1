//! Structured error type for the mutation service.
//!
//! Every expected failure travels as a `ToolError` variant carrying typed
//! context. The RPC layer renders errors into the wire envelope
//! `{code, message, details?, hint?, recoverable?}`; the code set is closed.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Closed set of wire error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "E_DENY_PATH")]
    DenyPath,
    #[serde(rename = "E_NOT_FOUND")]
    NotFound,
    #[serde(rename = "E_IO")]
    Io,
    #[serde(rename = "E_TOO_LARGE")]
    TooLarge,
    #[serde(rename = "E_ENCODING")]
    Encoding,
    #[serde(rename = "E_PARSE_FAIL")]
    ParseFail,
    #[serde(rename = "E_LINT_FAIL")]
    LintFail,
    #[serde(rename = "E_CONFLICT")]
    Conflict,
    #[serde(rename = "E_PREVIEW_FAIL")]
    PreviewFail,
    #[serde(rename = "E_TIMEOUT")]
    Timeout,
    #[serde(rename = "E_POLICY_VIOLATION")]
    PolicyViolation,
    #[serde(rename = "E_TOOL_DISABLED")]
    ToolDisabled,
    #[serde(rename = "E_UNSUPPORTED")]
    Unsupported,
    #[serde(rename = "E_BAD_ARGS")]
    BadArgs,
    #[serde(rename = "E_INTERNAL")]
    Internal,
    #[serde(rename = "E_LOCK_HELD")]
    LockHeld,
}

/// Domain error for every tool and component.
///
/// Variants map 1:1 onto [`ErrorCode`]; context fields feed the envelope's
/// `details` object.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ToolError {
    #[error("path not allowed: {path} ({reason})")]
    DenyPath { path: String, reason: String },

    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("i/o failure: {context}")]
    Io { context: String },

    #[error("file too large: {path} is {size} bytes (limit {limit})")]
    TooLarge { path: String, size: u64, limit: u64 },

    #[error("not valid utf-8: {path}")]
    Encoding { path: String },

    #[error("parse failure: {what}")]
    ParseFail { what: String },

    #[error("conflict: {reason}")]
    Conflict {
        reason: String,
        expected: String,
        actual: String,
    },

    #[error("preview failed: {reason}")]
    PreviewFail { reason: String, logs: Vec<String> },

    #[error("operation timed out after {timeout_ms}ms (op {op_id})")]
    Timeout { timeout_ms: u64, op_id: String },

    #[error("policy violation: {what}")]
    PolicyViolation { what: String },

    #[error("tool disabled: {tool}")]
    ToolDisabled { tool: String },

    #[error("unsupported: {what}")]
    Unsupported { what: String },

    #[error("bad arguments: {reason}")]
    BadArgs { reason: String },

    #[error("internal error: {reason}")]
    Internal {
        reason: String,
        details: Option<Value>,
    },

    #[error("project lock held by another instance")]
    LockHeld { owner: Value },
}

impl ToolError {
    /// Classify an I/O failure: missing targets become `E_NOT_FOUND`,
    /// everything else `E_IO`.
    pub fn from_io(what: impl Into<String>, err: &std::io::Error) -> Self {
        let what = what.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            ToolError::NotFound { what }
        } else {
            ToolError::Io {
                context: format!("{what}: {err}"),
            }
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        ToolError::Internal {
            reason: reason.into(),
            details: None,
        }
    }

    pub fn bad_args(reason: impl Into<String>) -> Self {
        ToolError::BadArgs {
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ToolError::DenyPath { .. } => ErrorCode::DenyPath,
            ToolError::NotFound { .. } => ErrorCode::NotFound,
            ToolError::Io { .. } => ErrorCode::Io,
            ToolError::TooLarge { .. } => ErrorCode::TooLarge,
            ToolError::Encoding { .. } => ErrorCode::Encoding,
            ToolError::ParseFail { .. } => ErrorCode::ParseFail,
            ToolError::Conflict { .. } => ErrorCode::Conflict,
            ToolError::PreviewFail { .. } => ErrorCode::PreviewFail,
            ToolError::Timeout { .. } => ErrorCode::Timeout,
            ToolError::PolicyViolation { .. } => ErrorCode::PolicyViolation,
            ToolError::ToolDisabled { .. } => ErrorCode::ToolDisabled,
            ToolError::Unsupported { .. } => ErrorCode::Unsupported,
            ToolError::BadArgs { .. } => ErrorCode::BadArgs,
            ToolError::Internal { .. } => ErrorCode::Internal,
            ToolError::LockHeld { .. } => ErrorCode::LockHeld,
        }
    }

    /// Callers may retry these without changing anything else first.
    pub fn recoverable(&self) -> bool {
        matches!(
            self,
            ToolError::Conflict { .. } | ToolError::TooLarge { .. }
        )
    }

    fn hint(&self) -> Option<&'static str> {
        match self {
            ToolError::DenyPath { .. } => {
                Some("use a project-relative path without '..' segments")
            }
            ToolError::Conflict { .. } => {
                Some("re-run the dry-run to refresh the diff, then apply again")
            }
            ToolError::TooLarge { .. } => Some("pass a smaller max_bytes or split the file"),
            ToolError::ToolDisabled { .. } => {
                Some("enable the feature in the policy file or via a CLI switch")
            }
            _ => None,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            ToolError::TooLarge { path, size, limit } => Some(json!({
                "path": path, "size": size, "limit": limit,
            })),
            ToolError::Conflict {
                expected, actual, ..
            } => Some(json!({
                "expected_hash": expected, "actual_hash": actual,
            })),
            ToolError::PreviewFail { logs, .. } => Some(json!({ "logs": logs })),
            ToolError::Timeout { timeout_ms, op_id } => Some(json!({
                "timeout_ms": timeout_ms, "op_id": op_id,
            })),
            ToolError::Internal { details, .. } => details.clone(),
            ToolError::LockHeld { owner } => Some(owner.clone()),
            _ => None,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            code: self.code(),
            message: self.to_string(),
            details: self.details(),
            hint: self.hint().map(str::to_string),
            recoverable: if self.recoverable() { Some(true) } else { None },
        }
    }
}

/// Wire shape of a failed tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recoverable: Option<bool>,
}

impl ErrorEnvelope {
    /// Envelope for an unexpected failure surfaced at the RPC boundary.
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        ErrorEnvelope {
            code: ErrorCode::Internal,
            message: message.into(),
            details: Some(details),
            hint: None,
            recoverable: None,
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        ToolError::ParseFail {
            what: e.to_string(),
        }
    }
}
