//! Cross-process cache entry lock
//!
//! Every cache key has a persistent lock file under `locks/`. Clone/fetch
//! takes an exclusive advisory lock on it and readers of the checkout take a
//! shared one. The OS releases the lock when the holding process exits, so
//! a crashed holder never blocks others and the file is never unlinked.
//!
//! Holders also touch the file's mtime (writers periodically). A waiter that
//! finds the lock held with an mtime older than the staleness threshold logs
//! the holder as hung and keeps waiting until its retry budget runs out.

use crate::config::schema::LockConfig;
use crate::error::{CmcError, CmcResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Retry and staleness parameters for lock acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPolicy {
    pub max_attempts: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    pub factor: u32,
    pub stale_after: Duration,
}

impl LockPolicy {
    /// Delay before retry number `attempt` (0-based), capped at `max_backoff`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let multiplier = self.factor.max(1).saturating_pow(attempt);
        self.min_backoff
            .saturating_mul(multiplier)
            .min(self.max_backoff)
    }
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            min_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            factor: 2,
            stale_after: Duration::from_secs(60),
        }
    }
}

impl From<&LockConfig> for LockPolicy {
    fn from(config: &LockConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            min_backoff: Duration::from_millis(config.min_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            factor: config.backoff_factor,
            stale_after: Duration::from_secs(config.stale_after_secs),
        }
    }
}

/// How the lock is held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Readers of an up-to-date checkout
    Shared,
    /// Clone/fetch of the entry
    Exclusive,
}

/// Held lock; released when the guard drops
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
    mode: LockMode,
    heartbeat: Option<JoinHandle<()>>,
}

impl LockGuard {
    /// Acquire the lock at `path` in `mode`, retrying with exponential backoff
    pub async fn acquire(path: &Path, mode: LockMode, policy: &LockPolicy) -> CmcResult<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CmcError::io(format!("creating lock directory {}", parent.display()), e)
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| CmcError::io(format!("opening lock file {}", path.display()), e))?;

        let mut attempt = 0;
        let mut reported_hung = false;
        loop {
            match try_lock(&file, mode) {
                Ok(()) => {
                    debug!("Acquired {:?} lock {}", mode, path.display());
                    touch(&file);
                    let heartbeat = match mode {
                        LockMode::Exclusive => Some(spawn_heartbeat(
                            file.try_clone().map_err(|e| {
                                CmcError::io(format!("cloning lock handle {}", path.display()), e)
                            })?,
                            policy.stale_after,
                        )),
                        LockMode::Shared => None,
                    };
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                        mode,
                        heartbeat,
                    });
                }
                Err(e) if is_contended(&e) => {}
                Err(e) => {
                    return Err(CmcError::io(
                        format!("locking {}", path.display()),
                        e,
                    ))
                }
            }

            if !reported_hung && is_stale(&file, policy.stale_after) {
                warn!(
                    "Lock {} has been held without a heartbeat for over {:?}; its holder may be hung",
                    path.display(),
                    policy.stale_after
                );
                reported_hung = true;
            }

            attempt += 1;
            if attempt >= policy.max_attempts {
                return Err(CmcError::LockTimeout {
                    path: path.to_path_buf(),
                    attempts: attempt,
                });
            }

            let delay = policy.backoff(attempt - 1);
            debug!(
                "Lock {} busy, retry {}/{} in {:?}",
                path.display(),
                attempt,
                policy.max_attempts,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.heartbeat.take() {
            handle.abort();
        }
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

// Called through the trait: newer std has inherent `File` lock methods
// with a different error type.
fn try_lock(file: &File, mode: LockMode) -> std::io::Result<()> {
    match mode {
        LockMode::Shared => FileExt::try_lock_shared(file),
        LockMode::Exclusive => FileExt::try_lock_exclusive(file),
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn touch(file: &File) {
    if let Err(e) = file.set_modified(SystemTime::now()) {
        debug!("Could not refresh lock mtime: {}", e);
    }
}

/// Held lock whose mtime is older than `stale_after`
fn is_stale(file: &File, stale_after: Duration) -> bool {
    file.metadata()
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > stale_after)
}

/// Keep the lock file's mtime fresh while a writer works
fn spawn_heartbeat(file: File, stale_after: Duration) -> JoinHandle<()> {
    let period = (stale_after / 3).max(Duration::from_millis(100));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            touch(&file);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fast_policy() -> LockPolicy {
        LockPolicy {
            max_attempts: 3,
            min_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(20),
            factor: 2,
            stale_after: Duration::from_secs(60),
        }
    }

    fn single_try() -> LockPolicy {
        LockPolicy {
            max_attempts: 1,
            ..fast_policy()
        }
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = LockPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(800));
        assert_eq!(policy.backoff(9), Duration::from_secs(5));
        assert_eq!(policy.backoff(64), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn drop_releases_and_file_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locks").join("repo.lock");

        let guard = LockGuard::acquire(&path, LockMode::Exclusive, &fast_policy())
            .await
            .unwrap();
        assert!(path.exists());
        assert_eq!(guard.path(), path);
        assert_eq!(guard.mode(), LockMode::Exclusive);

        drop(guard);
        assert!(path.exists());
        LockGuard::acquire(&path, LockMode::Exclusive, &single_try())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn held_lock_times_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("repo.lock");

        let _held = LockGuard::acquire(&path, LockMode::Exclusive, &fast_policy())
            .await
            .unwrap();
        let err = LockGuard::acquire(&path, LockMode::Exclusive, &fast_policy())
            .await
            .unwrap_err();
        match err {
            CmcError::LockTimeout { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected LockTimeout, got {:?}", other),
        }
        assert!(path.exists());
    }

    #[tokio::test]
    async fn readers_share_and_exclude_writers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("repo.lock");

        let r1 = LockGuard::acquire(&path, LockMode::Shared, &single_try())
            .await
            .unwrap();
        let r2 = LockGuard::acquire(&path, LockMode::Shared, &single_try())
            .await
            .unwrap();
        assert!(matches!(
            LockGuard::acquire(&path, LockMode::Exclusive, &single_try()).await,
            Err(CmcError::LockTimeout { .. })
        ));

        drop(r1);
        drop(r2);
        let writer = LockGuard::acquire(&path, LockMode::Exclusive, &single_try())
            .await
            .unwrap();
        assert!(matches!(
            LockGuard::acquire(&path, LockMode::Shared, &single_try()).await,
            Err(CmcError::LockTimeout { .. })
        ));
        drop(writer);
    }

    #[tokio::test]
    async fn old_mtime_never_breaks_exclusion() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("repo.lock");

        let holder = LockGuard::acquire(&path, LockMode::Exclusive, &fast_policy())
            .await
            .unwrap();
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(3600))
            .unwrap();

        let err = LockGuard::acquire(&path, LockMode::Exclusive, &fast_policy())
            .await
            .unwrap_err();
        assert!(matches!(err, CmcError::LockTimeout { .. }));

        // The holder still owns the lock and its file
        assert!(path.exists());
        let other = File::open(&path).unwrap();
        assert!(FileExt::try_lock_shared(&other).is_err());
        drop(holder);
    }

    #[tokio::test]
    async fn closed_handle_releases_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("repo.lock");

        // A holder that goes away without running any cleanup
        let file = File::create(&path).unwrap();
        FileExt::try_lock_exclusive(&file).unwrap();
        drop(file);

        LockGuard::acquire(&path, LockMode::Exclusive, &single_try())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn waiter_acquires_after_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("repo.lock");

        let first = LockGuard::acquire(&path, LockMode::Exclusive, &fast_policy())
            .await
            .unwrap();
        let path_clone = path.clone();
        let waiter = tokio::spawn(async move {
            let policy = LockPolicy {
                max_attempts: 50,
                ..fast_policy()
            };
            LockGuard::acquire(&path_clone, LockMode::Exclusive, &policy)
                .await
                .map(|_| ())
        });

        tokio::time::sleep(Duration::from_millis(15)).await;
        drop(first);
        waiter.await.unwrap().unwrap();
    }

    #[test]
    fn policy_from_config() {
        let config = LockConfig {
            max_attempts: 0,
            min_backoff_ms: 50,
            max_backoff_ms: 1000,
            backoff_factor: 3,
            stale_after_secs: 30,
        };
        let policy = LockPolicy::from(&config);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.backoff(1), Duration::from_millis(150));
        assert_eq!(policy.stale_after, Duration::from_secs(30));
    }
}
