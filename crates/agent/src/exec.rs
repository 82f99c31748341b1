//! Command execution seam.
//!
//! The service treats process execution and browser automation as external
//! collaborators: tools talk to the [`CommandExecutor`] / [`BrowserDriver`]
//! traits, and the launcher decides which implementations to attach.

use crate::error::ToolError;
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

/// Cap on captured log lines in stream mode.
const MAX_LOG_LINES: usize = 400;

#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub timed_out: bool,
}

#[derive(Debug, Clone)]
pub struct StreamResult {
    /// First line matching the caller's pattern, if any appeared in time.
    pub matched_line: Option<String>,
    pub logs: Vec<String>,
}

#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run to completion, capturing output. A timeout kills the child and
    /// reports `timed_out` instead of failing.
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        timeout_ms: u64,
        redact_env: &[String],
    ) -> Result<CommandOutcome, ToolError>;

    /// Stream mode: scan stdout/stderr lines for `pattern` and return as
    /// soon as it matches; the child is killed on early return.
    async fn run_stream_until(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        timeout_ms: u64,
        pattern: &Regex,
    ) -> Result<StreamResult, ToolError>;
}

/// Browser automation collaborator. The default deployment attaches no
/// driver; the tool surface still validates policy before delegating here.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn perform(
        &self,
        action: &str,
        params: &serde_json::Value,
    ) -> Result<serde_json::Value, ToolError>;
}

pub struct NoBrowserDriver;

#[async_trait]
impl BrowserDriver for NoBrowserDriver {
    async fn perform(
        &self,
        action: &str,
        _params: &serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        // Deliberately not E_UNSUPPORTED — that code means "unknown tool
        // name". A known, enabled tool missing its collaborator is a
        // deployment fault.
        Err(ToolError::Internal {
            reason: "no browser driver attached".to_string(),
            details: Some(serde_json::json!({ "action": action })),
        })
    }
}

/// [`CommandExecutor`] backed by `tokio::process`.
pub struct ProcessExecutor;

impl ProcessExecutor {
    fn command(
        program: &str,
        args: &[String],
        cwd: &Path,
        redact_env: &[String],
    ) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for name in redact_env {
            cmd.env_remove(name);
        }
        cmd
    }
}

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        timeout_ms: u64,
        redact_env: &[String],
    ) -> Result<CommandOutcome, ToolError> {
        let started = std::time::Instant::now();
        let mut child = Self::command(program, args, cwd, redact_env)
            .spawn()
            .map_err(|e| ToolError::Io {
                context: format!("spawn {program}: {e}"),
            })?;

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        let collected = tokio::time::timeout(Duration::from_millis(timeout_ms), async {
            let mut stdout = String::new();
            let mut stderr = String::new();
            let out_fut = async {
                if let Some(pipe) = stdout_pipe.as_mut() {
                    let _ = pipe.read_to_string(&mut stdout).await;
                }
                stdout
            };
            let err_fut = async {
                if let Some(pipe) = stderr_pipe.as_mut() {
                    let _ = pipe.read_to_string(&mut stderr).await;
                }
                stderr
            };
            let (stdout, stderr) = tokio::join!(out_fut, err_fut);
            let status = child.wait().await;
            (stdout, stderr, status)
        })
        .await;

        let duration_ms = started.elapsed().as_millis() as u64;
        match collected {
            Ok((stdout, stderr, status)) => Ok(CommandOutcome {
                exit_code: status.ok().and_then(|s| s.code()),
                stdout,
                stderr,
                duration_ms,
                timed_out: false,
            }),
            // The child was moved into the timed-out future and is killed on
            // drop; its partial output is gone with it.
            Err(_) => Ok(CommandOutcome {
                exit_code: None,
                stdout: String::new(),
                stderr: String::new(),
                duration_ms,
                timed_out: true,
            }),
        }
    }

    async fn run_stream_until(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        timeout_ms: u64,
        pattern: &Regex,
    ) -> Result<StreamResult, ToolError> {
        let mut child = Self::command(program, args, cwd, &[])
            .spawn()
            .map_err(|e| ToolError::Io {
                context: format!("spawn {program}: {e}"),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| ToolError::internal("child stdout missing"))?;
        let stderr = child.stderr.take().ok_or_else(|| ToolError::internal("child stderr missing"))?;
        let mut out_lines = BufReader::new(stdout).lines();
        let mut err_lines = BufReader::new(stderr).lines();
        let mut out_done = false;
        let mut err_done = false;
        let mut logs: Vec<String> = Vec::new();
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);

        while !(out_done && err_done) {
            tokio::select! {
                line = out_lines.next_line(), if !out_done => match line {
                    Ok(Some(line)) => {
                        if logs.len() < MAX_LOG_LINES {
                            logs.push(line.clone());
                        }
                        if pattern.is_match(&line) {
                            return Ok(StreamResult {
                                matched_line: Some(line),
                                logs,
                            });
                        }
                    }
                    _ => out_done = true,
                },
                line = err_lines.next_line(), if !err_done => match line {
                    Ok(Some(line)) => {
                        if logs.len() < MAX_LOG_LINES {
                            logs.push(line);
                        }
                    }
                    _ => err_done = true,
                },
                _ = tokio::time::sleep_until(deadline) => {
                    return Ok(StreamResult {
                        matched_line: None,
                        logs,
                    });
                }
            }
        }

        // Process closed both pipes without ever matching.
        Ok(StreamResult {
            matched_line: None,
            logs,
        })
    }
}
