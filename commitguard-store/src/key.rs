//! Deterministic cache keys for cloned repositories

use sha2::{Digest, Sha256};

/// Number of hex characters of the digest used for directory and lock names
const DIGEST_LEN: usize = 32;

/// Identity of a cached clone: repository URL, pinned revision and any
/// extra per-language dependency specifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CloneKey {
    url: String,
    rev: String,
    deps: Vec<String>,
}

impl CloneKey {
    /// Build a key; dependency order does not matter
    pub fn new(url: impl Into<String>, rev: impl Into<String>, deps: &[String]) -> Self {
        let mut deps = deps.to_vec();
        deps.sort();
        deps.dedup();
        Self {
            url: url.into(),
            rev: rev.into(),
            deps,
        }
    }

    /// Repository URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Pinned revision
    pub fn rev(&self) -> &str {
        &self.rev
    }

    /// Sorted dependency specifiers
    pub fn deps(&self) -> &[String] {
        &self.deps
    }

    /// Dependencies as stored in the index (comma separated)
    pub fn deps_column(&self) -> String {
        self.deps.join(",")
    }

    /// Hex digest naming the clone directory and its lock file
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.url.as_bytes());
        hasher.update([0]);
        hasher.update(self.rev.as_bytes());
        hasher.update([0]);
        hasher.update(self.deps_column().as_bytes());
        let mut hex = format!("{:x}", hasher.finalize());
        hex.truncate(DIGEST_LEN);
        hex
    }
}
