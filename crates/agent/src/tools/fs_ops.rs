//! File operations: list / read / write / replace / search plus the snapshot
//! wrappers. Every path goes through the sandbox; every write fans through
//! the diff engine, the snapshot store, and the idempotency cache.

use crate::diff::{self, Diff};
use crate::error::ToolError;
use crate::hash::ContentHash;
use crate::sandbox::PathSandbox;
use crate::snapshot::store::write_atomic;
use crate::snapshot::{SnapshotMeta, SnapshotStore};
use grep_regex::RegexMatcher;
use grep_searcher::Searcher;
use grep_searcher::sinks::Lossy;
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    pub name: String,
    /// Relative to the listed directory, POSIX separators.
    pub path: String,
    pub is_dir: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadResult {
    pub path: String,
    pub content: String,
    pub encoding: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    #[default]
    Overwrite,
    Append,
}

#[derive(Debug, Clone, Serialize)]
pub struct WriteResult {
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<Diff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_written: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    /// Project-relative POSIX path.
    pub path: String,
    pub line: u64,
    pub preview: String,
}

const PREVIEW_CHARS: usize = 200;

/// Owns the mutation pipeline. The snapshot store mutex serializes mutating
/// operations; the pending-fingerprint map is process-private and does not
/// survive restart.
pub struct FileOps {
    sandbox: Arc<PathSandbox>,
    store: tokio::sync::Mutex<SnapshotStore>,
    pending: parking_lot::Mutex<HashMap<String, ContentHash>>,
}

impl FileOps {
    pub fn new(sandbox: Arc<PathSandbox>, store: SnapshotStore) -> Self {
        Self {
            sandbox,
            store: tokio::sync::Mutex::new(store),
            pending: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// Fingerprint recorded by the last dry-run for `rel_path`, if any.
    pub fn pending_fingerprint(&self, rel_path: &str) -> Option<ContentHash> {
        self.pending.lock().get(rel_path).cloned()
    }

    // -- list -------------------------------------------------------------

    pub async fn list_files(
        &self,
        path: &str,
        globs: Option<&[String]>,
        dirs_only: bool,
    ) -> Result<Vec<FileEntry>, ToolError> {
        let abs = self.sandbox.validate(path)?;
        let meta = tokio::fs::metadata(&abs)
            .await
            .map_err(|e| ToolError::from_io(path, &e))?;
        if !meta.is_dir() {
            return Err(ToolError::bad_args(format!("not a directory: {path}")));
        }

        let mut entries = match globs {
            None => self.list_children(&abs).await?,
            Some(patterns) => self.list_matching(&abs, patterns)?,
        };
        if dirs_only {
            entries.retain(|e| e.is_dir);
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn list_children(&self, dir: &Path) -> Result<Vec<FileEntry>, ToolError> {
        let mut out = Vec::new();
        let mut reader = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| ToolError::from_io("read directory", &e))?;
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| ToolError::from_io("read directory", &e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            out.push(FileEntry {
                path: name.clone(),
                name,
                is_dir,
            });
        }
        Ok(out)
    }

    fn list_matching(&self, dir: &Path, patterns: &[String]) -> Result<Vec<FileEntry>, ToolError> {
        let compiled: Vec<glob::Pattern> = patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(p)
                    .map_err(|e| ToolError::bad_args(format!("bad glob '{p}': {e}")))
            })
            .collect::<Result<_, _>>()?;

        let mut out = Vec::new();
        for result in WalkBuilder::new(dir).standard_filters(false).build() {
            let entry = match result {
                Ok(e) => e,
                Err(_) => continue,
            };
            if entry.depth() == 0 {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(dir) else {
                continue;
            };
            if !compiled.iter().any(|p| p.matches_path(rel)) {
                continue;
            }
            let rel_posix = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            out.push(FileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: rel_posix,
                is_dir: entry.file_type().is_some_and(|t| t.is_dir()),
            });
        }
        Ok(out)
    }

    // -- read -------------------------------------------------------------

    pub async fn read_file(
        &self,
        path: &str,
        max_bytes: Option<u64>,
    ) -> Result<ReadResult, ToolError> {
        let abs = self.sandbox.validate(path)?;
        let rel = self.sandbox.relative_posix(&abs);
        let meta = tokio::fs::metadata(&abs)
            .await
            .map_err(|e| ToolError::from_io(&rel, &e))?;
        if meta.is_dir() {
            return Err(ToolError::bad_args(format!("not a file: {path}")));
        }

        let limit = max_bytes
            .unwrap_or(u64::MAX)
            .min(self.sandbox.max_read_bytes());
        if meta.len() > limit {
            return Err(ToolError::TooLarge {
                path: rel,
                size: meta.len(),
                limit,
            });
        }

        let bytes = tokio::fs::read(&abs)
            .await
            .map_err(|e| ToolError::from_io(&rel, &e))?;
        let content = String::from_utf8(bytes).map_err(|_| ToolError::Encoding {
            path: rel.clone(),
        })?;
        Ok(ReadResult {
            path: rel,
            bytes: meta.len(),
            content,
            encoding: "utf-8".to_string(),
        })
    }

    // -- write ------------------------------------------------------------

    pub async fn write_to_file(
        &self,
        path: &str,
        content: &str,
        mode: WriteMode,
        dry_run: bool,
        idempotency_key: Option<&str>,
    ) -> Result<WriteResult, ToolError> {
        let abs = self.sandbox.validate(path)?;
        let rel = self.sandbox.relative_posix(&abs);

        // Serialize the whole mutation; dry-runs take the same lock so the
        // fingerprint they record is consistent.
        let mut store = self.store.lock().await;

        let (current, exists) = match tokio::fs::read_to_string(&abs).await {
            Ok(text) => (text, true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (String::new(), false),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(ToolError::Encoding { path: rel });
            }
            Err(e) => return Err(ToolError::from_io(&rel, &e)),
        };

        let new_content = match mode {
            WriteMode::Overwrite => content.to_string(),
            WriteMode::Append => format!("{current}{content}"),
        };

        if dry_run {
            let diff = diff::compute(&current, &new_content);
            if exists {
                self.pending
                    .lock()
                    .insert(rel, ContentHash::of_str(&current));
            }
            return Ok(WriteResult {
                applied: false,
                diff: Some(diff),
                snapshot_id: None,
                bytes_written: None,
            });
        }

        if let Some(key) = idempotency_key {
            if let Some(cached) = store.lookup_idempotent(key).await? {
                return Ok(WriteResult {
                    applied: true,
                    diff: None,
                    snapshot_id: Some(cached),
                    bytes_written: Some(0),
                });
            }
        }

        if let Some(expected) = self.pending.lock().get(&rel).cloned() {
            let actual = ContentHash::of_str(&current);
            if expected != actual {
                // The fingerprint stays pending; a fresh dry-run or a
                // successful apply clears it.
                return Err(ToolError::Conflict {
                    reason: format!("{rel} changed between dry-run and apply"),
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                });
            }
        }

        if let Some(parent) = abs.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::from_io("create parent directory", &e))?;
        }
        write_atomic(&abs, new_content.as_bytes())
            .await
            .map_err(|e| ToolError::from_io(&rel, &e))?;

        let snapshot_id = store.save(&rel, &new_content, idempotency_key).await?;
        self.pending.lock().remove(&rel);

        Ok(WriteResult {
            applied: true,
            diff: None,
            snapshot_id: Some(snapshot_id),
            bytes_written: Some(new_content.len() as u64),
        })
    }

    // -- replace ----------------------------------------------------------

    pub async fn replace_in_file(
        &self,
        path: &str,
        find: &str,
        replace: &str,
        flags: Option<&str>,
    ) -> Result<usize, ToolError> {
        let abs = self.sandbox.validate(path)?;
        let rel = self.sandbox.relative_posix(&abs);
        let (regex, global) = compile_with_flags(find, flags.unwrap_or("g"))?;

        let _store = self.store.lock().await;

        let current = match tokio::fs::read_to_string(&abs).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(ToolError::Encoding { path: rel });
            }
            Err(e) => return Err(ToolError::from_io(&rel, &e)),
        };
        let base_hash = ContentHash::of_str(&current);

        let matches = regex.find_iter(&current).count();
        let count = if global { matches } else { matches.min(1) };
        if count == 0 {
            return Ok(0);
        }

        let replaced = if global {
            regex.replace_all(&current, replace).into_owned()
        } else {
            regex.replace(&current, replace).into_owned()
        };

        // Optimistic concurrency: the substitution ran against `current`;
        // re-verify the file immediately before the rename.
        let latest = tokio::fs::read_to_string(&abs)
            .await
            .map_err(|e| ToolError::from_io(&rel, &e))?;
        let latest_hash = ContentHash::of_str(&latest);
        if latest_hash != base_hash {
            return Err(ToolError::Conflict {
                reason: format!("{rel} changed while computing the replacement"),
                expected: base_hash.to_string(),
                actual: latest_hash.to_string(),
            });
        }

        write_atomic(&abs, replaced.as_bytes())
            .await
            .map_err(|e| ToolError::from_io(&rel, &e))?;
        Ok(count)
    }

    // -- search -----------------------------------------------------------

    pub async fn search_files(
        &self,
        path: &str,
        pattern: &str,
        file_pattern: Option<&str>,
        max_matches: usize,
    ) -> Result<Vec<SearchMatch>, ToolError> {
        let abs = self.sandbox.validate(path)?;
        tokio::fs::metadata(&abs)
            .await
            .map_err(|e| ToolError::from_io(path, &e))?;

        let matcher = RegexMatcher::new(pattern)
            .map_err(|e| ToolError::bad_args(format!("bad regex '{pattern}': {e}")))?;
        let file_glob = file_pattern
            .map(|p| {
                glob::Pattern::new(p)
                    .map_err(|e| ToolError::bad_args(format!("bad file pattern '{p}': {e}")))
            })
            .transpose()?;

        let sandbox = Arc::clone(&self.sandbox);
        let root = abs.clone();
        let matches = tokio::task::spawn_blocking(move || {
            search_blocking(&sandbox, &root, &matcher, file_glob.as_ref(), max_matches)
        })
        .await
        .map_err(|e| ToolError::internal(format!("search task failed: {e}")))?;
        Ok(matches)
    }

    // -- snapshot wrappers ------------------------------------------------

    pub async fn list_snapshots(
        &self,
        filter_path: Option<&str>,
        limit: Option<f64>,
    ) -> Result<Vec<SnapshotMeta>, ToolError> {
        let normalized = match filter_path {
            Some(p) => {
                let abs = self.sandbox.validate(p)?;
                Some(self.sandbox.relative_posix(&abs))
            }
            None => None,
        };
        let mut store = self.store.lock().await;
        store.list(normalized.as_deref(), limit).await
    }

    pub async fn restore_snapshot(&self, snapshot_id: &str) -> Result<(String, String), ToolError> {
        let mut store = self.store.lock().await;
        store.restore(snapshot_id).await
    }
}

/// Walk `root` depth-first (dotfiles and forbidden segments pruned), running
/// the matcher over each file. Unreadable files are skipped silently.
fn search_blocking(
    sandbox: &PathSandbox,
    root: &Path,
    matcher: &RegexMatcher,
    file_glob: Option<&glob::Pattern>,
    max_matches: usize,
) -> Vec<SearchMatch> {
    let forbidden: Vec<String> = sandbox.forbidden_segments().to_vec();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(true)
        .filter_entry(move |entry| {
            let name = entry.file_name().to_string_lossy();
            !forbidden.iter().any(|f| f == name.as_ref())
        })
        .build();

    let mut out: Vec<SearchMatch> = Vec::new();
    for result in walker {
        if out.len() >= max_matches {
            break;
        }
        let entry = match result {
            Ok(e) => e,
            Err(_) => continue,
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        if let Some(pattern) = file_glob {
            let Ok(rel) = entry.path().strip_prefix(root) else {
                continue;
            };
            if !pattern.matches_path(rel) {
                continue;
            }
        }

        let rel_posix = sandbox.relative_posix(entry.path());
        let _ = Searcher::new().search_path(
            matcher,
            entry.path(),
            Lossy(|line_number, line| {
                if out.len() >= max_matches {
                    return Ok(false);
                }
                out.push(SearchMatch {
                    path: rel_posix.clone(),
                    line: line_number,
                    preview: truncate_chars(line.trim_end(), PREVIEW_CHARS),
                });
                Ok(true)
            }),
        );
    }
    out
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Compile a JS-style `(pattern, flags)` pair. `g` controls replace-all;
/// `i`, `m`, `s` become inline flags. Anything else is rejected.
fn compile_with_flags(pattern: &str, flags: &str) -> Result<(regex::Regex, bool), ToolError> {
    let mut global = false;
    let mut inline = String::new();
    for flag in flags.chars() {
        match flag {
            'g' => global = true,
            'i' | 'm' | 's' => inline.push(flag),
            other => {
                return Err(ToolError::bad_args(format!("unsupported regex flag: {other}")));
            }
        }
    }
    let full = if inline.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{inline}){pattern}")
    };
    let regex = regex::Regex::new(&full)
        .map_err(|e| ToolError::bad_args(format!("bad regex '{pattern}': {e}")))?;
    Ok((regex, global))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::snapshot::IdempotencyConfig;
    use tempfile::TempDir;

    fn ops(dir: &TempDir) -> FileOps {
        let sandbox = PathSandbox::new(
            dir.path().to_path_buf(),
            vec![
                ".git".into(),
                "node_modules".into(),
                ".env".into(),
                ".webgal_agent".into(),
            ],
            1_048_576,
            "utf-8".into(),
        );
        let store = SnapshotStore::new(dir.path(), 20, IdempotencyConfig::default());
        FileOps::new(sandbox, store)
    }

    fn seed(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    // -- list -------------------------------------------------------------

    #[tokio::test]
    async fn list_files_plain_and_dirs_only() {
        let dir = TempDir::new().unwrap();
        seed(&dir, "game/scene/start.txt", "end;\n");
        seed(&dir, "game/scene/ch1.txt", "end;\n");
        std::fs::create_dir_all(dir.path().join("game/scene/drafts")).unwrap();

        let ops = ops(&dir);
        let entries = ops.list_files("game/scene", None, false).await.unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["ch1.txt", "drafts", "start.txt"]);

        let dirs = ops.list_files("game/scene", None, true).await.unwrap();
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].name, "drafts");
    }

    #[tokio::test]
    async fn list_files_with_globs_is_recursive() {
        let dir = TempDir::new().unwrap();
        seed(&dir, "game/scene/start.txt", "end;\n");
        seed(&dir, "game/scene/drafts/wip.txt", "end;\n");
        seed(&dir, "game/scene/notes.md", "x");

        let ops = ops(&dir);
        let globs = vec!["**/*.txt".to_string()];
        let entries = ops
            .list_files("game/scene", Some(&globs), false)
            .await
            .unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["drafts/wip.txt", "start.txt"]);
    }

    #[tokio::test]
    async fn list_files_errors() {
        let dir = TempDir::new().unwrap();
        seed(&dir, "file.txt", "x");
        let ops = ops(&dir);
        assert_eq!(
            ops.list_files("nope", None, false).await.unwrap_err().code(),
            ErrorCode::NotFound
        );
        assert_eq!(
            ops.list_files("file.txt", None, false)
                .await
                .unwrap_err()
                .code(),
            ErrorCode::BadArgs
        );
        assert_eq!(
            ops.list_files("../elsewhere", None, false)
                .await
                .unwrap_err()
                .code(),
            ErrorCode::DenyPath
        );
    }

    // -- read -------------------------------------------------------------

    #[tokio::test]
    async fn read_file_returns_content_and_metadata() {
        let dir = TempDir::new().unwrap();
        seed(&dir, "game/scene/start.txt", "欢迎;\n");
        let ops = ops(&dir);
        let result = ops.read_file("game/scene/start.txt", None).await.unwrap();
        assert_eq!(result.path, "game/scene/start.txt");
        assert_eq!(result.content, "欢迎;\n");
        assert_eq!(result.encoding, "utf-8");
        assert_eq!(result.bytes, "欢迎;\n".len() as u64);
    }

    #[tokio::test]
    async fn read_file_enforces_the_size_cap() {
        let dir = TempDir::new().unwrap();
        seed(&dir, "big.txt", &"x".repeat(1000));
        let ops = ops(&dir);
        let err = ops.read_file("big.txt", Some(100)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::TooLarge);
        assert!(err.recoverable());
    }

    #[tokio::test]
    async fn read_file_rejects_non_utf8() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("bin.dat"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        let ops = ops(&dir);
        let err = ops.read_file("bin.dat", None).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Encoding);
    }

    // -- write ------------------------------------------------------------

    #[tokio::test]
    async fn dry_run_returns_diff_and_touches_nothing() {
        let dir = TempDir::new().unwrap();
        seed(&dir, "game/scene/test.txt", "old;\n");
        let ops = ops(&dir);
        let result = ops
            .write_to_file("game/scene/test.txt", "new;\n", WriteMode::Overwrite, true, None)
            .await
            .unwrap();
        assert!(!result.applied);
        assert!(!result.diff.unwrap().is_empty());
        assert!(result.snapshot_id.is_none());

        // File unchanged, fingerprint recorded.
        let on_disk = std::fs::read_to_string(dir.path().join("game/scene/test.txt")).unwrap();
        assert_eq!(on_disk, "old;\n");
        assert!(ops.pending_fingerprint("game/scene/test.txt").is_some());
        assert!(!dir.path().join(".webgal_agent").exists());
    }

    #[tokio::test]
    async fn apply_writes_snapshots_and_clears_the_fingerprint() {
        let dir = TempDir::new().unwrap();
        seed(&dir, "game/scene/test.txt", "old;\n");
        let ops = ops(&dir);
        ops.write_to_file("game/scene/test.txt", "new;\n", WriteMode::Overwrite, true, None)
            .await
            .unwrap();
        let result = ops
            .write_to_file("game/scene/test.txt", "new;\n", WriteMode::Overwrite, false, None)
            .await
            .unwrap();
        assert!(result.applied);
        let id = result.snapshot_id.unwrap();
        assert!(crate::snapshot::store::is_valid_snapshot_id(&id));
        assert_eq!(result.bytes_written, Some(5));

        let on_disk = std::fs::read_to_string(dir.path().join("game/scene/test.txt")).unwrap();
        assert_eq!(on_disk, "new;\n");
        assert!(ops.pending_fingerprint("game/scene/test.txt").is_none());
        assert!(
            dir.path()
                .join(format!(".webgal_agent/snapshots/{id}.meta.json"))
                .exists()
        );
    }

    #[tokio::test]
    async fn external_mutation_between_dry_run_and_apply_conflicts() {
        let dir = TempDir::new().unwrap();
        seed(&dir, "p.txt", "A");
        let ops = ops(&dir);
        ops.write_to_file("p.txt", "B", WriteMode::Overwrite, true, None)
            .await
            .unwrap();

        // External writer sneaks in.
        std::fs::write(dir.path().join("p.txt"), "C").unwrap();

        let err = ops
            .write_to_file("p.txt", "B", WriteMode::Overwrite, false, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert!(err.recoverable());
        // The fingerprint is preserved: a retry without a fresh dry-run
        // still conflicts.
        assert!(ops.pending_fingerprint("p.txt").is_some());
        let err = ops
            .write_to_file("p.txt", "B", WriteMode::Overwrite, false, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn apply_without_dry_run_skips_the_check() {
        let dir = TempDir::new().unwrap();
        let ops = ops(&dir);
        let result = ops
            .write_to_file("fresh/new.txt", "hi;\n", WriteMode::Overwrite, false, None)
            .await
            .unwrap();
        assert!(result.applied);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("fresh/new.txt")).unwrap(),
            "hi;\n"
        );
    }

    #[tokio::test]
    async fn append_mode_concatenates() {
        let dir = TempDir::new().unwrap();
        seed(&dir, "log.txt", "one;\n");
        let ops = ops(&dir);
        ops.write_to_file("log.txt", "two;\n", WriteMode::Append, false, None)
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("log.txt")).unwrap(),
            "one;\ntwo;\n"
        );
    }

    #[tokio::test]
    async fn idempotent_apply_skips_the_file() {
        let dir = TempDir::new().unwrap();
        let ops = ops(&dir);
        let first = ops
            .write_to_file("p.txt", "A", WriteMode::Overwrite, false, Some("k"))
            .await
            .unwrap();
        let id = first.snapshot_id.unwrap();

        let second = ops
            .write_to_file("p.txt", "B", WriteMode::Overwrite, false, Some("k"))
            .await
            .unwrap();
        assert_eq!(second.snapshot_id.unwrap(), id);
        assert_eq!(second.bytes_written, Some(0));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("p.txt")).unwrap(),
            "A"
        );
    }

    #[tokio::test]
    async fn writes_outside_the_sandbox_are_denied() {
        let dir = TempDir::new().unwrap();
        let ops = ops(&dir);
        let err = ops
            .write_to_file("../evil.txt", "x", WriteMode::Overwrite, false, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DenyPath);
        let err = ops
            .write_to_file(".webgal_agent/idem.json", "{}", WriteMode::Overwrite, false, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DenyPath);
    }

    // -- replace ----------------------------------------------------------

    #[tokio::test]
    async fn replace_counts_and_rewrites() {
        let dir = TempDir::new().unwrap();
        seed(&dir, "game/scene/start.txt", "欢迎;\n欢迎回来;\n");
        let ops = ops(&dir);
        let count = ops
            .replace_in_file("game/scene/start.txt", "欢迎", "你好", None)
            .await
            .unwrap();
        assert_eq!(count, 2);
        let on_disk = std::fs::read_to_string(dir.path().join("game/scene/start.txt")).unwrap();
        assert_eq!(on_disk, "你好;\n你好回来;\n");
    }

    #[tokio::test]
    async fn replace_without_global_flag_replaces_once() {
        let dir = TempDir::new().unwrap();
        seed(&dir, "p.txt", "a a a");
        let ops = ops(&dir);
        let count = ops.replace_in_file("p.txt", "a", "b", Some("")).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("p.txt")).unwrap(),
            "b a a"
        );
    }

    #[tokio::test]
    async fn replace_zero_matches_leaves_disk_untouched() {
        let dir = TempDir::new().unwrap();
        seed(&dir, "p.txt", "abc");
        let before = std::fs::metadata(dir.path().join("p.txt")).unwrap().modified().unwrap();
        let ops = ops(&dir);
        let count = ops.replace_in_file("p.txt", "zzz", "q", None).await.unwrap();
        assert_eq!(count, 0);
        let after = std::fs::metadata(dir.path().join("p.txt")).unwrap().modified().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn replace_rejects_bad_regex_and_flags() {
        let dir = TempDir::new().unwrap();
        seed(&dir, "p.txt", "abc");
        let ops = ops(&dir);
        assert_eq!(
            ops.replace_in_file("p.txt", "(", "x", None).await.unwrap_err().code(),
            ErrorCode::BadArgs
        );
        assert_eq!(
            ops.replace_in_file("p.txt", "a", "x", Some("gz"))
                .await
                .unwrap_err()
                .code(),
            ErrorCode::BadArgs
        );
    }

    #[tokio::test]
    async fn replace_supports_case_insensitive_flag() {
        let dir = TempDir::new().unwrap();
        seed(&dir, "p.txt", "Hello HELLO hello");
        let ops = ops(&dir);
        let count = ops.replace_in_file("p.txt", "hello", "hi", Some("gi")).await.unwrap();
        assert_eq!(count, 3);
    }

    // -- search -----------------------------------------------------------

    #[tokio::test]
    async fn search_reports_path_line_and_preview() {
        let dir = TempDir::new().unwrap();
        seed(&dir, "game/scene/start.txt", "intro:hi;\nsetVar:n=1;\nend;\n");
        seed(&dir, "game/scene/ch1.txt", "bgm:theme.mp3;\nend;\n");
        let ops = ops(&dir);
        let matches = ops.search_files("game", "setVar", None, 2000).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].path, "game/scene/start.txt");
        assert_eq!(matches[0].line, 2);
        assert_eq!(matches[0].preview, "setVar:n=1;");
    }

    #[tokio::test]
    async fn search_respects_file_pattern_and_max_matches() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            seed(&dir, &format!("game/scene/s{i}.txt"), "end;\nend;\n");
        }
        seed(&dir, "game/readme.md", "end;\n");
        let ops = ops(&dir);

        let matches = ops
            .search_files("game", "end", Some("scene/*.txt"), 2000)
            .await
            .unwrap();
        assert_eq!(matches.len(), 10);
        assert!(matches.iter().all(|m| m.path.ends_with(".txt")));

        let capped = ops.search_files("game", "end", None, 3).await.unwrap();
        assert_eq!(capped.len(), 3);
    }

    #[tokio::test]
    async fn search_skips_dotfiles_and_forbidden_directories() {
        let dir = TempDir::new().unwrap();
        seed(&dir, "game/scene/start.txt", "needle\n");
        seed(&dir, ".hidden/file.txt", "needle\n");
        seed(&dir, "node_modules/pkg/index.js", "needle\n");
        let ops = ops(&dir);
        let matches = ops.search_files(".", "needle", None, 2000).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].path, "game/scene/start.txt");
    }

    #[tokio::test]
    async fn search_rejects_bad_regex() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("game")).unwrap();
        let ops = ops(&dir);
        assert_eq!(
            ops.search_files("game", "(unclosed", None, 2000)
                .await
                .unwrap_err()
                .code(),
            ErrorCode::BadArgs
        );
    }

    #[tokio::test]
    async fn search_truncates_long_previews() {
        let dir = TempDir::new().unwrap();
        seed(&dir, "long.txt", &format!("needle {}\n", "x".repeat(500)));
        let ops = ops(&dir);
        let matches = ops.search_files(".", "needle", None, 2000).await.unwrap();
        assert_eq!(matches[0].preview.chars().count(), 200);
    }

    // -- snapshot wrappers -------------------------------------------------

    #[tokio::test]
    async fn snapshot_wrappers_round_trip() {
        let dir = TempDir::new().unwrap();
        let ops = ops(&dir);
        ops.write_to_file("game/scene/start.txt", "v1;\n", WriteMode::Overwrite, false, None)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        ops.write_to_file("game/scene/start.txt", "v2;\n", WriteMode::Overwrite, false, None)
            .await
            .unwrap();

        let listed = ops
            .list_snapshots(Some("game/scene/start.txt"), None)
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);

        let (path, content) = ops.restore_snapshot(&listed[1].id).await.unwrap();
        assert_eq!(path, "game/scene/start.txt");
        assert_eq!(content, "v1;\n");
    }
}
