//! Command-line surface of the launcher.

use clap::Parser;
use std::path::PathBuf;
use webgal_agent::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(
    name = "webgal-agent",
    version,
    about = "Mediated mutation service for WebGAL project trees"
)]
pub struct CliArgs {
    /// Project root directory (falls back to WEBGAL_AGENT_PROJECT /
    /// WEBGAL_PROJECT_ROOT).
    #[arg(long)]
    pub project: Option<PathBuf>,

    /// Policy document path (default: <project>/configs/policies.json, then
    /// <project>/policies.json).
    #[arg(long)]
    pub policies: Option<PathBuf>,

    /// Snapshot retention cap.
    #[arg(long)]
    pub retention: Option<usize>,

    /// Enable the execute_command / preview_scene surface.
    #[arg(long)]
    pub enable_exec: bool,

    /// Enable the browser_action surface.
    #[arg(long)]
    pub enable_browser: bool,

    /// Raise the default log filter to debug.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit one health JSON line and exit.
    #[arg(long)]
    pub health: bool,

    /// Forbidden path segments, comma-separated.
    #[arg(long, value_delimiter = ',')]
    pub sandbox_forbidden: Option<Vec<String>>,

    /// Read size cap in bytes.
    #[arg(long)]
    pub sandbox_max_bytes: Option<u64>,

    /// Text encoding label (only utf-8 is honored).
    #[arg(long)]
    pub sandbox_encoding: Option<String>,

    /// Allowed package scripts, comma-separated.
    #[arg(long, value_delimiter = ',')]
    pub exec_allowed: Option<Vec<String>>,

    /// Command timeout in milliseconds.
    #[arg(long)]
    pub exec_timeout: Option<u64>,

    /// Environment variable names scrubbed from child processes,
    /// comma-separated.
    #[arg(long, value_delimiter = ',')]
    pub exec_redact_env: Option<Vec<String>>,

    /// Working directory for executed commands, project-relative.
    #[arg(long)]
    pub exec_workdir: Option<String>,

    /// Hosts the browser may visit, comma-separated.
    #[arg(long, value_delimiter = ',')]
    pub browser_allowed_hosts: Option<Vec<String>>,

    /// Browser action timeout in milliseconds.
    #[arg(long)]
    pub browser_timeout: Option<u64>,

    /// Directory for browser screenshots.
    #[arg(long)]
    pub browser_screenshot_dir: Option<String>,
}

impl CliArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            snapshot_retention: self.retention,
            enable_exec: self.enable_exec,
            enable_browser: self.enable_browser,
            sandbox_forbidden: trim_list(&self.sandbox_forbidden),
            sandbox_max_bytes: self.sandbox_max_bytes,
            sandbox_encoding: self.sandbox_encoding.clone(),
            exec_allowed: trim_list(&self.exec_allowed),
            exec_timeout_ms: self.exec_timeout,
            exec_redact_env: trim_list(&self.exec_redact_env),
            exec_workdir: self.exec_workdir.clone(),
            browser_allowed_hosts: trim_list(&self.browser_allowed_hosts),
            browser_timeout_ms: self.browser_timeout,
            browser_screenshot_dir: self.browser_screenshot_dir.clone(),
        }
    }
}

/// Comma-separated list values arrive untrimmed; empty items are dropped.
fn trim_list(values: &Option<Vec<String>>) -> Option<Vec<String>> {
    values.as_ref().map(|items| {
        items
            .iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    })
}
