//! Durable idempotency cache: caller-supplied key → snapshot id.
//!
//! The on-disk document is the source of truth; the in-memory map is a cache
//! loaded at startup. Retries of a mutation with the same key are therefore
//! safe across process restarts.

use crate::error::ToolError;
use crate::snapshot::store::write_atomic;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdempotencyEntry {
    pub snapshot_id: String,
    /// Milliseconds since epoch.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdempotencyConfig {
    pub max_entries: usize,
    pub max_age_days: u64,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            max_entries: 500,
            max_age_days: 7,
        }
    }
}

pub struct IdempotencyCache {
    path: PathBuf,
    config: IdempotencyConfig,
    entries: HashMap<String, IdempotencyEntry>,
    loaded: bool,
}

fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

impl IdempotencyCache {
    pub fn new(path: PathBuf, config: IdempotencyConfig) -> Self {
        Self {
            path,
            config,
            entries: HashMap::new(),
            loaded: false,
        }
    }

    /// Load the persisted document. A missing file is an empty cache; a
    /// corrupt file is logged and treated the same.
    pub async fn load(&mut self) -> Result<(), ToolError> {
        if self.loaded {
            return Ok(());
        }
        self.entries = self.read_document().await;
        self.loaded = true;
        Ok(())
    }

    async fn read_document(&self) -> HashMap<String, IdempotencyEntry> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    log::warn!(
                        "idempotency document {} is corrupt, starting empty: {e}",
                        self.path.display()
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                log::warn!(
                    "idempotency document {} unreadable, starting empty: {e}",
                    self.path.display()
                );
                HashMap::new()
            }
        }
    }

    pub fn lookup(&self, key: &str) -> Option<&IdempotencyEntry> {
        self.entries.get(key)
    }

    /// Insert a mapping and persist: read the document, apply, prune, write
    /// back atomically.
    pub async fn insert(&mut self, key: &str, snapshot_id: &str) -> Result<(), ToolError> {
        let mut document = self.read_document().await;
        document.insert(
            key.to_string(),
            IdempotencyEntry {
                snapshot_id: snapshot_id.to_string(),
                timestamp: now_ms(),
            },
        );
        prune(&mut document, &self.config, now_ms());

        let bytes = serde_json::to_vec_pretty(&document)?;
        write_atomic(&self.path, &bytes)
            .await
            .map_err(|e| ToolError::from_io("persist idempotency cache", &e))?;

        self.entries = document;
        self.loaded = true;
        Ok(())
    }
}

/// Drop entries older than `max_age_days`; if the map is still over
/// `max_entries`, keep only the newest by timestamp.
fn prune(
    entries: &mut HashMap<String, IdempotencyEntry>,
    config: &IdempotencyConfig,
    now_ms: i64,
) {
    let cutoff = now_ms - (config.max_age_days as i64) * 86_400_000;
    entries.retain(|_, entry| entry.timestamp >= cutoff);

    if entries.len() > config.max_entries {
        let mut by_age: Vec<(String, i64)> = entries
            .iter()
            .map(|(k, v)| (k.clone(), v.timestamp))
            .collect();
        // Newest first; stable key order as tiebreaker keeps pruning
        // deterministic.
        by_age.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let keep: std::collections::HashSet<String> = by_age
            .into_iter()
            .take(config.max_entries)
            .map(|(k, _)| k)
            .collect();
        entries.retain(|k, _| keep.contains(k));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache_at(dir: &TempDir) -> IdempotencyCache {
        IdempotencyCache::new(dir.path().join("idem.json"), IdempotencyConfig::default())
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let mut cache = cache_at(&dir);
        cache.load().await.unwrap();
        assert!(cache.lookup("k").is_none());
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("idem.json"), "{ not json").unwrap();
        let mut cache = cache_at(&dir);
        cache.load().await.unwrap();
        assert!(cache.lookup("k").is_none());
    }

    #[tokio::test]
    async fn insert_persists_and_survives_reload() {
        let dir = TempDir::new().unwrap();
        {
            let mut cache = cache_at(&dir);
            cache.load().await.unwrap();
            cache.insert("k", "snap_20250101T000000_deadbeef").await.unwrap();
        }
        // Fresh instance simulates a restart.
        let mut cache = cache_at(&dir);
        cache.load().await.unwrap();
        assert_eq!(
            cache.lookup("k").unwrap().snapshot_id,
            "snap_20250101T000000_deadbeef"
        );

        let raw = std::fs::read_to_string(dir.path().join("idem.json")).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["k"]["snapshotId"], "snap_20250101T000000_deadbeef");
        assert!(doc["k"]["timestamp"].is_i64());
    }

    #[test]
    fn prune_drops_expired_entries() {
        let config = IdempotencyConfig::default();
        let now = 10_000_000_000_i64;
        let mut entries = HashMap::new();
        entries.insert(
            "old".to_string(),
            IdempotencyEntry {
                snapshot_id: "s1".into(),
                timestamp: now - 8 * 86_400_000,
            },
        );
        entries.insert(
            "fresh".to_string(),
            IdempotencyEntry {
                snapshot_id: "s2".into(),
                timestamp: now - 1000,
            },
        );
        prune(&mut entries, &config, now);
        assert!(!entries.contains_key("old"));
        assert!(entries.contains_key("fresh"));
    }

    #[test]
    fn prune_keeps_newest_when_over_capacity() {
        let config = IdempotencyConfig {
            max_entries: 3,
            max_age_days: 7,
        };
        let now = 10_000_000_000_i64;
        let mut entries = HashMap::new();
        for i in 0..10 {
            entries.insert(
                format!("k{i}"),
                IdempotencyEntry {
                    snapshot_id: format!("s{i}"),
                    timestamp: now - 1000 + i,
                },
            );
        }
        prune(&mut entries, &config, now);
        assert_eq!(entries.len(), 3);
        assert!(entries.contains_key("k9"));
        assert!(entries.contains_key("k8"));
        assert!(entries.contains_key("k7"));
    }
}
