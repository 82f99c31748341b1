//! Snapshot store: one UTF-8 content body plus one metadata document per
//! mutation, with lazy retention enforcement and apply-time idempotency.

use crate::error::ToolError;
use crate::hash::ContentHash;
use crate::snapshot::idempotency::{IdempotencyCache, IdempotencyConfig};
use crate::snapshot::{AGENT_DIR, IDEM_FILE, SNAPSHOT_DIR};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::macros::format_description;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Public id contract, validated on restore inputs.
static SNAPSHOT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^snap_\d{8}T\d{6}_[0-9a-f]{8}$").expect("static regex"));

pub fn is_valid_snapshot_id(id: &str) -> bool {
    SNAPSHOT_ID_RE.is_match(id)
}

/// Metadata persisted beside each content body as `<id>.meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeta {
    pub id: String,
    /// Project-relative POSIX path whose post-mutation content is captured.
    pub path: String,
    /// Milliseconds since epoch.
    pub timestamp: i64,
    pub content_hash: ContentHash,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

/// Write `bytes` through a temp file, fsync, then rename into place. A crash
/// mid-write never leaves a truncated target.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&tmp, path).await
}

pub struct SnapshotStore {
    dir: PathBuf,
    retention: usize,
    idem: IdempotencyCache,
    initialized: bool,
}

fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

impl SnapshotStore {
    /// `retention` is clamped to `[1, 10_000]`.
    pub fn new(project_root: &Path, retention: usize, idem_config: IdempotencyConfig) -> Self {
        let agent_dir = project_root.join(AGENT_DIR);
        Self {
            dir: agent_dir.join(SNAPSHOT_DIR),
            retention: retention.clamp(1, 10_000),
            idem: IdempotencyCache::new(agent_dir.join(IDEM_FILE), idem_config),
            initialized: false,
        }
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    async fn ensure_init(&mut self) -> Result<(), ToolError> {
        if !self.initialized {
            tokio::fs::create_dir_all(&self.dir)
                .await
                .map_err(|e| ToolError::from_io("create snapshot directory", &e))?;
            self.idem.load().await?;
            self.initialized = true;
        }
        Ok(())
    }

    fn content_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.txt"))
    }

    fn meta_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.meta.json"))
    }

    async fn snapshot_present(&self, id: &str) -> bool {
        tokio::fs::try_exists(self.content_path(id)).await.unwrap_or(false)
            && tokio::fs::try_exists(self.meta_path(id)).await.unwrap_or(false)
    }

    /// Resolve an idempotency key to a still-present snapshot id, if any.
    ///
    /// This is the apply-time short-circuit: a hit means the caller must not
    /// mutate the target file and must report the cached id.
    pub async fn lookup_idempotent(&mut self, key: &str) -> Result<Option<String>, ToolError> {
        self.ensure_init().await?;
        let Some(entry) = self.idem.lookup(key) else {
            return Ok(None);
        };
        let id = entry.snapshot_id.clone();
        if self.snapshot_present(&id).await {
            Ok(Some(id))
        } else {
            Ok(None)
        }
    }

    /// Persist a snapshot of `content` for `path` and return its id.
    ///
    /// Ids are `snap_<UTC yyyymmddThhmmss>_<8 hex>`; the random suffix keeps
    /// same-second snapshots distinguishable and their ordering stable.
    pub async fn save(
        &mut self,
        path: &str,
        content: &str,
        idempotency_key: Option<&str>,
    ) -> Result<String, ToolError> {
        self.ensure_init().await?;

        if let Some(key) = idempotency_key {
            if let Some(existing) = self.lookup_idempotent(key).await? {
                return Ok(existing);
            }
        }

        let id = generate_id()?;
        let meta = SnapshotMeta {
            id: id.clone(),
            path: path.to_string(),
            timestamp: now_ms(),
            content_hash: ContentHash::of_str(content),
            idempotency_key: idempotency_key.map(str::to_string),
        };

        write_atomic(&self.content_path(&id), content.as_bytes())
            .await
            .map_err(|e| ToolError::from_io("write snapshot content", &e))?;
        let meta_bytes = serde_json::to_vec_pretty(&meta)?;
        write_atomic(&self.meta_path(&id), &meta_bytes)
            .await
            .map_err(|e| ToolError::from_io("write snapshot metadata", &e))?;

        if let Some(key) = idempotency_key {
            self.idem.insert(key, &id).await?;
        }

        self.enforce_retention().await;
        Ok(id)
    }

    /// List snapshot metadata, newest first (timestamp desc, id desc).
    ///
    /// Entries with a missing content body or unparseable metadata are
    /// skipped with a warning. `filter_path` keeps entries whose stored path
    /// has it as a POSIX prefix. `limit`: missing / negative / NaN → 50,
    /// capped at 1000.
    pub async fn list(
        &mut self,
        filter_path: Option<&str>,
        limit: Option<f64>,
    ) -> Result<Vec<SnapshotMeta>, ToolError> {
        self.ensure_init().await?;
        let mut metas = self.read_all_metas().await?;
        if let Some(prefix) = filter_path {
            metas.retain(|m| m.path.starts_with(prefix));
        }
        sort_newest_first(&mut metas);
        metas.truncate(normalize_limit(limit));
        Ok(metas)
    }

    /// Read back a snapshot by id.
    pub async fn restore(&mut self, id: &str) -> Result<(String, String), ToolError> {
        if !is_valid_snapshot_id(id) {
            return Err(ToolError::bad_args(format!("invalid snapshot id: {id}")));
        }
        self.ensure_init().await?;

        let meta_bytes = tokio::fs::read(self.meta_path(id))
            .await
            .map_err(|e| ToolError::from_io(format!("snapshot {id}"), &e))?;
        let meta: SnapshotMeta = serde_json::from_slice(&meta_bytes).map_err(|e| {
            ToolError::ParseFail {
                what: format!("snapshot metadata {id}: {e}"),
            }
        })?;
        let content = tokio::fs::read_to_string(self.content_path(id))
            .await
            .map_err(|e| ToolError::from_io(format!("snapshot {id}"), &e))?;
        Ok((meta.path, content))
    }

    async fn read_all_metas(&self) -> Result<Vec<SnapshotMeta>, ToolError> {
        let mut out = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| ToolError::from_io("read snapshot directory", &e))?;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(e)) => e,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("snapshot directory scan aborted: {e}");
                    break;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(id) = name.strip_suffix(".meta.json") else {
                continue;
            };
            let bytes = match tokio::fs::read(entry.path()).await {
                Ok(b) => b,
                Err(e) => {
                    log::warn!("skipping unreadable snapshot metadata {name}: {e}");
                    continue;
                }
            };
            let meta: SnapshotMeta = match serde_json::from_slice(&bytes) {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("skipping corrupt snapshot metadata {name}: {e}");
                    continue;
                }
            };
            if !tokio::fs::try_exists(self.content_path(id)).await.unwrap_or(false) {
                log::warn!("skipping snapshot {id}: content body missing");
                continue;
            }
            out.push(meta);
        }
        Ok(out)
    }

    /// Delete the oldest snapshots beyond the retention cap.
    async fn enforce_retention(&mut self) {
        let mut metas = match self.read_all_metas().await {
            Ok(m) => m,
            Err(e) => {
                log::warn!("retention sweep skipped: {e}");
                return;
            }
        };
        if metas.len() <= self.retention {
            return;
        }
        sort_newest_first(&mut metas);
        for meta in metas.split_off(self.retention) {
            if let Err(e) = tokio::fs::remove_file(self.meta_path(&meta.id)).await {
                log::warn!("retention: could not delete {}: {e}", meta.id);
            }
            if let Err(e) = tokio::fs::remove_file(self.content_path(&meta.id)).await {
                log::warn!("retention: could not delete {} body: {e}", meta.id);
            }
        }
    }
}

fn sort_newest_first(metas: &mut [SnapshotMeta]) {
    metas.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.id.cmp(&a.id))
    });
}

fn normalize_limit(limit: Option<f64>) -> usize {
    match limit {
        Some(x) if x.is_finite() && x >= 0.0 => (x as usize).min(1000),
        _ => 50,
    }
}

fn generate_id() -> Result<String, ToolError> {
    let stamp_format = format_description!("[year][month][day]T[hour][minute][second]");
    let stamp = OffsetDateTime::now_utc()
        .format(&stamp_format)
        .map_err(|e| ToolError::internal(format!("format snapshot timestamp: {e}")))?;
    let hex = Uuid::new_v4().simple().to_string();
    Ok(format!("snap_{stamp}_{}", &hex[..8]))
}
