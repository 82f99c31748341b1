//! Path sandbox: every externally supplied path is validated here before any
//! component touches the filesystem.
//!
//! Validation is purely lexical — the sandbox never stats anything. Existence
//! checks belong to the caller.

use crate::error::ToolError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Immutable sandbox state, shared by reference across all tools.
#[derive(Debug)]
pub struct PathSandbox {
    root: PathBuf,
    forbidden: Vec<String>,
    max_read_bytes: u64,
    text_encoding: String,
}

impl PathSandbox {
    /// `root` must already be an absolute, existing directory; the launcher
    /// canonicalizes it before construction.
    pub fn new(
        root: PathBuf,
        forbidden: Vec<String>,
        max_read_bytes: u64,
        text_encoding: String,
    ) -> Arc<Self> {
        Arc::new(Self {
            root,
            forbidden,
            max_read_bytes,
            text_encoding,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_read_bytes(&self) -> u64 {
        self.max_read_bytes
    }

    pub fn text_encoding(&self) -> &str {
        &self.text_encoding
    }

    pub fn forbidden_segments(&self) -> &[String] {
        &self.forbidden
    }

    /// Validate a caller-supplied relative path and resolve it inside the
    /// project root.
    ///
    /// Rejects absolute inputs of any OS form, traversal that escapes the
    /// root, and any path containing a forbidden segment (case-sensitive,
    /// exact, per segment).
    pub fn validate(&self, input: &str) -> Result<PathBuf, ToolError> {
        if input.is_empty() {
            return self.deny(input, "empty path");
        }
        if is_absolute_input(input) {
            return self.deny(input, "absolute paths are not allowed");
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in input.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return self.deny(input, "path escapes the project root");
                    }
                }
                other => segments.push(other),
            }
        }

        for segment in &segments {
            if self.forbidden.iter().any(|f| f == segment) {
                return self.deny(input, "path contains a forbidden segment");
            }
        }

        let mut resolved = self.root.clone();
        for segment in &segments {
            resolved.push(segment);
        }
        Ok(resolved)
    }

    /// Project-relative POSIX form of a path previously returned by
    /// [`validate`](Self::validate).
    pub fn relative_posix(&self, abs: &Path) -> String {
        let rel = abs.strip_prefix(&self.root).unwrap_or(abs);
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        parts.join("/")
    }

    fn deny(&self, path: &str, reason: &str) -> Result<PathBuf, ToolError> {
        Err(ToolError::DenyPath {
            path: path.to_string(),
            reason: reason.to_string(),
        })
    }
}

/// Absolute in any OS form: rooted POSIX paths, UNC/backslash paths, and
/// `X:`-style drive prefixes.
fn is_absolute_input(s: &str) -> bool {
    if Path::new(s).is_absolute() || s.starts_with('/') || s.starts_with('\\') {
        return true;
    }
    let bytes = s.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
