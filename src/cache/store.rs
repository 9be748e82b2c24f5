//! On-disk cache layout
//!
//! ```text
//! <root>/cache/<owner>-<repo>-<hash12>/   git working tree
//! <root>/locks/<owner>-<repo>-<hash12>.lock
//! ```

use crate::cache::key::CacheKey;
use crate::cache::lock::{LockGuard, LockMode, LockPolicy};
use crate::error::{CmcError, CmcResult};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Timestamp file written into `.git` after every successful clone or fetch
const SYNC_STAMP: &str = "cmc-synced";

/// A cached repository found on disk
#[derive(Debug, Clone)]
pub struct CacheEntryInfo {
    /// Directory name (`<owner>-<repo>-<hash12>`)
    pub name: String,
    pub path: PathBuf,
    /// Last successful clone/fetch, if the entry has ever completed one
    pub last_synced: Option<DateTime<Utc>>,
}

/// Maps cache keys to working trees and lock files under one root
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default root: `$CMC_HOME`, else `~/.cmc`
    pub fn default_root() -> PathBuf {
        if let Some(home) = std::env::var_os("CMC_HOME").filter(|v| !v.is_empty()) {
            return PathBuf::from(home);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".cmc")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.root.join("locks")
    }

    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir().join(key.dir_name())
    }

    pub fn lock_path(&self, key: &CacheKey) -> PathBuf {
        self.lock_path_for(&key.dir_name())
    }

    /// Lock file of the entry directory named `name`
    pub fn lock_path_for(&self, name: &str) -> PathBuf {
        self.locks_dir().join(format!("{}.lock", name))
    }

    /// An entry is usable when it holds a git working tree
    pub fn is_usable(entry: &Path) -> bool {
        entry.join(".git").is_dir()
    }

    /// Record a completed clone/fetch
    pub async fn mark_synced(entry: &Path) -> CmcResult<()> {
        let stamp = entry.join(".git").join(SYNC_STAMP);
        tokio::fs::write(&stamp, Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true))
            .await
            .map_err(|e| CmcError::io(format!("writing {}", stamp.display()), e))
    }

    /// Time of the last completed clone/fetch
    pub fn synced_at(entry: &Path) -> Option<DateTime<Utc>> {
        let content = std::fs::read_to_string(entry.join(".git").join(SYNC_STAMP)).ok()?;
        DateTime::parse_from_rfc3339(content.trim())
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Whether the entry is usable and was refreshed at or after `since`
    pub fn synced_since(entry: &Path, since: DateTime<Utc>) -> bool {
        Self::is_usable(entry) && Self::synced_at(entry).is_some_and(|t| t >= since)
    }

    /// Remove a (possibly partial) working tree
    pub async fn remove_entry(entry: &Path) -> CmcResult<()> {
        match tokio::fs::remove_dir_all(entry).await {
            Ok(()) => {
                debug!("Removed cache entry {}", entry.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CmcError::io(format!("removing {}", entry.display()), e)),
        }
    }

    /// List cached repositories, sorted by name
    pub async fn list(&self) -> CmcResult<Vec<CacheEntryInfo>> {
        let dir = self.cache_dir();
        let mut reader = match tokio::fs::read_dir(&dir).await {
            Ok(r) => r,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CmcError::io(format!("reading {}", dir.display()), e)),
        };

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| CmcError::io(format!("reading {}", dir.display()), e))?
        {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            entries.push(CacheEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                last_synced: Self::synced_at(&path),
                path,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Remove every cached repository, each under its exclusive lock. Lock
    /// files stay. Returns the number of entries removed.
    pub async fn clear(&self, policy: &LockPolicy) -> CmcResult<usize> {
        let entries = self.list().await?;
        for entry in &entries {
            let lock_path = self.lock_path_for(&entry.name);
            let _lock = LockGuard::acquire(&lock_path, LockMode::Exclusive, policy).await?;
            Self::remove_entry(&entry.path).await?;
        }
        Ok(entries.len())
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(Self::default_root())
    }
}
