//! Configuration resolution: built-in defaults ← policy document ← caller
//! overrides, frozen at startup into one read-only [`AgentConfig`].

use crate::error::ToolError;
use crate::snapshot::IdempotencyConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_RETENTION: usize = 20;
pub const DEFAULT_MAX_READ_BYTES: u64 = 1_048_576;
pub const DEFAULT_TEXT_ENCODING: &str = "utf-8";
pub const DEFAULT_EXEC_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_BROWSER_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_FORBIDDEN_SEGMENTS: &[&str] =
    &[".git", "node_modules", ".env", ".webgal_agent"];
/// Scripts that may be harvested from `package.json` when execution is
/// enabled without an explicit allow-list.
pub const SAFE_SCRIPTS: &[&str] = &["dev", "build", "lint", "test", "start", "preview"];

// ---------------------------------------------------------------------------
// Frozen output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub snapshot_retention: usize,
    pub idempotency: IdempotencyConfig,
    pub sandbox: SandboxOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<BrowserOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<ModelOptions>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxOptions {
    pub forbidden_dirs: Vec<String>,
    pub max_read_bytes: u64,
    pub text_encoding: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOptions {
    pub allowed_commands: Vec<String>,
    pub timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    /// Environment variable names scrubbed from child processes and from
    /// runtime-info output.
    pub redact_env: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserOptions {
    pub allowed_hosts: Vec<String>,
    pub timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_dir: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    #[serde(rename = "baseURL", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Policy document (all fields optional)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyDoc {
    pub snapshot_retention: Option<usize>,
    pub writes: Option<WritesPolicy>,
    pub idempotency: Option<IdempotencyPolicy>,
    pub sandbox: Option<SandboxPolicy>,
    pub execution: Option<ExecutionPolicy>,
    pub browser: Option<BrowserPolicy>,
    pub models: Option<ModelOptions>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WritesPolicy {
    pub snapshot_retention: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdempotencyPolicy {
    pub max_entries: Option<usize>,
    pub max_age_days: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SandboxPolicy {
    pub forbidden_dirs: Option<Vec<String>>,
    pub max_read_bytes: Option<u64>,
    pub text_encoding: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionPolicy {
    pub enabled: Option<bool>,
    pub allowed_commands: Option<Vec<String>>,
    pub timeout_ms: Option<u64>,
    pub working_dir: Option<String>,
    pub redact_env: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrowserPolicy {
    pub enabled: Option<bool>,
    pub allowed_hosts: Option<Vec<String>>,
    pub timeout_ms: Option<u64>,
    pub screenshot_dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Caller overrides (from the CLI)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub snapshot_retention: Option<usize>,
    pub enable_exec: bool,
    pub enable_browser: bool,
    pub sandbox_forbidden: Option<Vec<String>>,
    pub sandbox_max_bytes: Option<u64>,
    pub sandbox_encoding: Option<String>,
    pub exec_allowed: Option<Vec<String>>,
    pub exec_timeout_ms: Option<u64>,
    pub exec_redact_env: Option<Vec<String>>,
    pub exec_workdir: Option<String>,
    pub browser_allowed_hosts: Option<Vec<String>>,
    pub browser_timeout_ms: Option<u64>,
    pub browser_screenshot_dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ResolvedConfig {
    pub config: AgentConfig,
    /// The policy file actually used, if any — surfaced by the health check.
    pub policies_path: Option<PathBuf>,
}

/// Locate the policy document: explicit caller path, else
/// `R/configs/policies.json`, else `R/policies.json`.
pub fn discover_policies_path(project_root: &Path, explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    for candidate in ["configs/policies.json", "policies.json"] {
        let path = project_root.join(candidate);
        if path.is_file() {
            return Some(path);
        }
    }
    None
}

/// Layer defaults ← policy document ← caller overrides and freeze.
pub fn resolve(
    project_root: &Path,
    policies_path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<ResolvedConfig, ToolError> {
    let found = discover_policies_path(project_root, policies_path);
    let policy = match &found {
        Some(path) => {
            let bytes = std::fs::read(path)
                .map_err(|e| ToolError::from_io(format!("policy file {}", path.display()), &e))?;
            serde_json::from_slice::<PolicyDoc>(&bytes).map_err(|e| ToolError::ParseFail {
                what: format!("policy file {}: {e}", path.display()),
            })?
        }
        None => PolicyDoc::default(),
    };

    let snapshot_retention = overrides
        .snapshot_retention
        .or(policy.snapshot_retention)
        .or(policy.writes.as_ref().and_then(|w| w.snapshot_retention))
        .unwrap_or(DEFAULT_RETENTION)
        .clamp(1, 10_000);

    let idem_policy = policy.idempotency.clone().unwrap_or_default();
    let idem_defaults = IdempotencyConfig::default();
    let idempotency = IdempotencyConfig {
        max_entries: idem_policy.max_entries.unwrap_or(idem_defaults.max_entries),
        max_age_days: idem_policy.max_age_days.unwrap_or(idem_defaults.max_age_days),
    };

    let sandbox_policy = policy.sandbox.clone().unwrap_or_default();
    let sandbox = SandboxOptions {
        forbidden_dirs: overrides
            .sandbox_forbidden
            .clone()
            .or(sandbox_policy.forbidden_dirs)
            .unwrap_or_else(|| {
                DEFAULT_FORBIDDEN_SEGMENTS
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            }),
        max_read_bytes: overrides
            .sandbox_max_bytes
            .or(sandbox_policy.max_read_bytes)
            .unwrap_or(DEFAULT_MAX_READ_BYTES),
        text_encoding: overrides
            .sandbox_encoding
            .clone()
            .or(sandbox_policy.text_encoding)
            .unwrap_or_else(|| DEFAULT_TEXT_ENCODING.to_string()),
    };

    let exec_policy = policy.execution.clone().unwrap_or_default();
    let exec_enabled = overrides.enable_exec || exec_policy.enabled.unwrap_or(false);
    let execution = if exec_enabled {
        let mut allowed = overrides
            .exec_allowed
            .clone()
            .or(exec_policy.allowed_commands)
            .unwrap_or_default();
        if allowed.is_empty() {
            allowed = harvest_package_scripts(project_root);
        }
        Some(ExecutionOptions {
            allowed_commands: allowed,
            timeout_ms: overrides
                .exec_timeout_ms
                .or(exec_policy.timeout_ms)
                .unwrap_or(DEFAULT_EXEC_TIMEOUT_MS),
            working_dir: overrides.exec_workdir.clone().or(exec_policy.working_dir),
            redact_env: overrides
                .exec_redact_env
                .clone()
                .or(exec_policy.redact_env)
                .unwrap_or_default(),
        })
    } else {
        None
    };

    let browser_policy = policy.browser.clone().unwrap_or_default();
    let browser_enabled = overrides.enable_browser || browser_policy.enabled.unwrap_or(false);
    let browser = if browser_enabled {
        Some(BrowserOptions {
            allowed_hosts: overrides
                .browser_allowed_hosts
                .clone()
                .or(browser_policy.allowed_hosts)
                .unwrap_or_else(|| vec!["localhost".to_string(), "127.0.0.1".to_string()]),
            timeout_ms: overrides
                .browser_timeout_ms
                .or(browser_policy.timeout_ms)
                .unwrap_or(DEFAULT_BROWSER_TIMEOUT_MS),
            screenshot_dir: overrides
                .browser_screenshot_dir
                .clone()
                .or(browser_policy.screenshot_dir),
        })
    } else {
        None
    };

    Ok(ResolvedConfig {
        config: AgentConfig {
            snapshot_retention,
            idempotency,
            sandbox,
            execution,
            browser,
            models: policy.models,
        },
        policies_path: found,
    })
}

/// Scripts from `R/package.json`, restricted to the safe subset and returned
/// in the safe-subset order.
fn harvest_package_scripts(project_root: &Path) -> Vec<String> {
    let Ok(bytes) = std::fs::read(project_root.join("package.json")) else {
        return Vec::new();
    };
    let Ok(doc) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
        log::warn!("package.json is not valid JSON, no scripts harvested");
        return Vec::new();
    };
    let Some(scripts) = doc.get("scripts").and_then(|s| s.as_object()) else {
        return Vec::new();
    };
    SAFE_SCRIPTS
        .iter()
        .filter(|name| scripts.contains_key(**name))
        .map(|name| name.to_string())
        .collect()
}
