//! Cache key derivation
//!
//! One key per repository: path and version never participate, so every
//! reference into the same repository shares a single clone and lock.

use crate::remote::RemoteReference;
use sha2::{Digest, Sha256};
use std::fmt;

/// Stable identifier for a cached repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    owner: String,
    repo: String,
    /// SHA256 of `host/owner/repo` (first 12 hex chars)
    hash: String,
}

impl CacheKey {
    /// Derive the key for the repository a reference points into
    pub fn for_reference(reference: &RemoteReference) -> Self {
        Self::new(reference.host.prefix(), &reference.owner, &reference.repo)
    }

    /// Derive a key from its identifying parts
    pub fn new(host: &str, owner: &str, repo: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}/{}/{}", host, owner, repo).as_bytes());
        let result = hasher.finalize();

        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            hash: hex::encode(&result[..6]),
        }
    }

    /// Directory / lock file stem: `<owner>-<repo>-<hash12>`
    pub fn dir_name(&self) -> String {
        format!("{}-{}-{}", self.owner, self.repo, self.hash)
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}
