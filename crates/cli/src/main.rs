//! Launcher: resolve the project root, acquire the single-instance lock,
//! freeze the configuration, and serve the RPC surface over stdio.

use anyhow::{Context, anyhow};
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use webgal_agent::exec::{NoBrowserDriver, ProcessExecutor};
use webgal_agent::{
    ProjectLock, RpcServer, SERVER_NAME, SERVER_VERSION, ToolContext, ToolError, config,
};

mod cli_args;
mod tracing;

use cli_args::CliArgs;
use tracing::setup_logging;

const EXIT_OK: i32 = 0;
const EXIT_STARTUP: i32 = 1;
const EXIT_LOCK: i32 = 2;
const EXIT_SIGINT: i32 = 130;
const EXIT_SIGTERM: i32 = 143;

fn main() {
    let args = CliArgs::parse();
    setup_logging(args.verbose);
    std::process::exit(run(args));
}

fn run(args: CliArgs) -> i32 {
    let root = match resolve_project_root(&args) {
        Ok(root) => root,
        Err(err) => {
            log::error!("{err:#}");
            return EXIT_STARTUP;
        }
    };

    if args.health {
        return health_check(&args, &root);
    }

    let mut lock = ProjectLock::new(&root);
    let lock_info = match lock.acquire(SERVER_NAME, SERVER_VERSION) {
        Ok(info) => info,
        Err(err @ ToolError::LockHeld { .. }) => {
            log::error!("E_LOCK_HELD: {err}");
            if let ToolError::LockHeld { owner } = &err {
                log::error!("held by: {owner}");
            }
            return EXIT_LOCK;
        }
        Err(err) => {
            log::error!("could not acquire project lock: {err}");
            return EXIT_STARTUP;
        }
    };
    log::info!(
        "serving project {} (pid {})",
        root.display(),
        lock_info.pid
    );

    let resolved = match config::resolve(&root, args.policies.as_deref(), &args.overrides()) {
        Ok(resolved) => resolved,
        Err(err) => {
            log::error!("configuration failed: {err}");
            lock.release();
            return EXIT_STARTUP;
        }
    };

    let context = ToolContext::new(
        root,
        resolved.config,
        Some(lock_info),
        Arc::new(ProcessExecutor),
        Arc::new(NoBrowserDriver),
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("runtime startup failed: {err}");
            lock.release();
            return EXIT_STARTUP;
        }
    };

    let exit_code = runtime.block_on(serve(context));

    lock.release();
    log::info!("shutdown complete (exit {exit_code})");
    exit_code
}

async fn serve(context: Arc<ToolContext>) -> i32 {
    let server = RpcServer::new(context);
    tokio::select! {
        result = server.serve_stdio() => match result {
            Ok(()) => EXIT_OK,
            Err(err) => {
                log::error!("transport failed: {err}");
                EXIT_STARTUP
            }
        },
        code = shutdown_signal() => code,
    }
}

/// Resolve 130 for SIGINT, 143 for SIGTERM.
async fn shutdown_signal() -> i32 {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("received SIGINT, shutting down");
            EXIT_SIGINT
        }
        _ = terminate => {
            log::info!("received SIGTERM, shutting down");
            EXIT_SIGTERM
        }
    }
}

fn resolve_project_root(args: &CliArgs) -> anyhow::Result<PathBuf> {
    let candidate = args
        .project
        .clone()
        .or_else(|| std::env::var_os("WEBGAL_AGENT_PROJECT").map(PathBuf::from))
        .or_else(|| std::env::var_os("WEBGAL_PROJECT_ROOT").map(PathBuf::from))
        .or_else(|| {
            if args.health {
                std::env::current_dir().ok()
            } else {
                None
            }
        })
        .ok_or_else(|| anyhow!("no project root: pass --project or set WEBGAL_AGENT_PROJECT"))?;

    let canonical = candidate
        .canonicalize()
        .with_context(|| format!("project root {}", candidate.display()))?;
    if !canonical.is_dir() {
        return Err(anyhow!(
            "project root is not a directory: {}",
            canonical.display()
        ));
    }
    Ok(canonical)
}

/// One JSON line on stdout; exit 0 when healthy, 2 when not. A live lock
/// counts as unhealthy.
fn health_check(args: &CliArgs, root: &std::path::Path) -> i32 {
    let lock = ProjectLock::new(root);
    let held = lock.held_by_live_owner();
    let policies = config::discover_policies_path(root, args.policies.as_deref());
    let healthy = held.is_none();

    let mut doc = json!({
        "healthy": healthy,
        "version": SERVER_VERSION,
        "projectRoot": root.display().to_string(),
    });
    if let Some(path) = policies {
        doc["policiesPath"] = json!(path.display().to_string());
    }
    if let Some(info) = held {
        doc["lock"] = serde_json::to_value(info).unwrap_or_default();
    }

    println!("{doc}");
    if healthy { EXIT_OK } else { EXIT_LOCK }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn base_args(project: &std::path::Path) -> CliArgs {
        CliArgs::parse_from(["webgal-agent", "--project", project.to_str().unwrap()])
    }

    #[test]
    fn project_root_must_exist() {
        let args = CliArgs::parse_from(["webgal-agent", "--project", "/definitely/not/here"]);
        assert!(resolve_project_root(&args).is_err());
    }

    #[test]
    fn project_root_resolves_from_flag() {
        let dir = TempDir::new().unwrap();
        let args = base_args(dir.path());
        let root = resolve_project_root(&args).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn health_check_is_healthy_on_a_fresh_project() {
        let dir = TempDir::new().unwrap();
        let args = base_args(dir.path());
        let root = resolve_project_root(&args).unwrap();
        assert_eq!(health_check(&args, &root), EXIT_OK);
    }

    #[test]
    fn health_check_reports_a_live_lock_as_unhealthy() {
        let dir = TempDir::new().unwrap();
        let args = base_args(dir.path());
        let root = resolve_project_root(&args).unwrap();
        let mut lock = ProjectLock::new(&root);
        lock.acquire("other-instance", "0.0.1").unwrap();
        assert_eq!(health_check(&args, &root), EXIT_LOCK);
        lock.release();
        assert_eq!(health_check(&args, &root), EXIT_OK);
    }
}
