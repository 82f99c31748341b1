//! Content hashing for snapshots and conflict fingerprints.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A SHA-256 digest stored as 64 lowercase hex characters.
///
/// Serializes as a plain string so persisted metadata and wire payloads stay
/// readable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn new(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        Self(hex::encode(digest))
    }

    pub fn of_str(text: &str) -> Self {
        Self::new(text.as_bytes())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
