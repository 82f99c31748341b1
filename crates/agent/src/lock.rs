//! Single-instance project lock with stale-owner reclaim.
//!
//! The lock is acquired once at launcher time and released at shutdown, so
//! all operations here are synchronous `std::fs`.

use crate::error::ToolError;
use crate::snapshot::{AGENT_DIR, LOCK_FILE};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// Owner record persisted as `agent.lock`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockInfo {
    pub owner: String,
    pub pid: u32,
    pub host: String,
    /// Milliseconds since epoch.
    pub started_at: i64,
    pub version: String,
}

pub struct ProjectLock {
    path: PathBuf,
    held: bool,
}

impl ProjectLock {
    pub fn new(project_root: &Path) -> Self {
        Self {
            path: project_root.join(AGENT_DIR).join(LOCK_FILE),
            held: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the current lock file, if any. Corrupt files read as `None`.
    pub fn read(&self) -> Option<LockInfo> {
        let bytes = std::fs::read(&self.path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// True when the lock file names an owner that is still alive.
    pub fn held_by_live_owner(&self) -> Option<LockInfo> {
        let info = self.read()?;
        if owner_is_alive(&info) { Some(info) } else { None }
    }

    /// Acquire the lock, reclaiming it from a dead owner if necessary.
    pub fn acquire(&mut self, owner: &str, version: &str) -> Result<LockInfo, ToolError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ToolError::from_io("create lock directory", &e))?;
        }

        if let Ok(bytes) = std::fs::read(&self.path) {
            match serde_json::from_slice::<LockInfo>(&bytes) {
                Ok(existing) if owner_is_alive(&existing) => {
                    return Err(lock_held(existing));
                }
                Ok(existing) => {
                    log::info!(
                        "reclaiming stale lock from pid {} on {}",
                        existing.pid,
                        existing.host
                    );
                }
                Err(e) => {
                    log::warn!("replacing corrupt lock file: {e}");
                }
            }
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != ErrorKind::NotFound {
                    return Err(ToolError::from_io("remove stale lock", &e));
                }
            }
        }

        let info = LockInfo {
            owner: owner.to_string(),
            pid: std::process::id(),
            host: current_host(),
            started_at: (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64,
            version: version.to_string(),
        };
        let bytes = serde_json::to_vec_pretty(&info)?;

        // Exclusive create: losing the race means another instance won.
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => {
                use std::io::Write;
                let mut file = file;
                file.write_all(&bytes)
                    .map_err(|e| ToolError::from_io("write lock file", &e))?;
                file.sync_all()
                    .map_err(|e| ToolError::from_io("sync lock file", &e))?;
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let winner = self.read().map(lock_held).unwrap_or_else(|| {
                    ToolError::internal("lock race lost and winner record unreadable")
                });
                return Err(winner);
            }
            Err(e) => return Err(ToolError::from_io("create lock file", &e)),
        }

        self.held = true;
        Ok(info)
    }

    /// Best-effort unlink; a missing file is not an error.
    pub fn release(&mut self) {
        if !self.held {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => log::warn!("could not release lock {}: {e}", self.path.display()),
        }
        self.held = false;
    }
}

fn lock_held(info: LockInfo) -> ToolError {
    let owner = serde_json::to_value(&info).unwrap_or_default();
    ToolError::LockHeld { owner }
}

fn current_host() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Liveness of the recorded owner.
///
/// Only same-host pids can be probed; a lock held on another host is treated
/// as alive and must be removed manually. On unix the probe is `kill(pid, 0)`:
/// ESRCH means dead, EPERM means alive-but-foreign.
fn owner_is_alive(info: &LockInfo) -> bool {
    if info.host != current_host() {
        return true;
    }
    pid_alive(info.pid)
}

#[cfg(unix)]
fn pid_alive(pid: u32) -> bool {
    let rc = unsafe { libc::kill(pid as libc::pid_t, 0) };
    if rc == 0 {
        return true;
    }
    let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
    errno == libc::EPERM
}

#[cfg(not(unix))]
fn pid_alive(_pid: u32) -> bool {
    // No portable probe; never reclaim automatically.
    true
}
