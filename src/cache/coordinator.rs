//! Single-flight clone/fetch coordination
//!
//! For one cache key at most one clone/fetch runs at a time, system-wide:
//!
//! - within a process, concurrent callers join the in-flight shared future
//!   instead of starting their own;
//! - across processes, the operation runs under the entry's lock file.
//!
//! After the lock is acquired the entry is re-checked: if another process
//! refreshed it while this one waited, no git work is done.
//!
//! The caller gets a [`Checkout`] holding a shared lock on the entry, so no
//! clone/fetch can touch the tree while its manifest and artifacts are read.

use crate::cache::key::CacheKey;
use crate::cache::lock::{LockGuard, LockMode, LockPolicy};
use crate::cache::store::CacheStore;
use crate::error::{CmcError, CmcResult};
use crate::git::CloneExecutor;
use crate::remote::RemoteReference;
use chrono::Utc;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Attempts to lock an up-to-date entry for reading before giving up
const READ_ATTEMPTS: u32 = 3;

type CheckoutFuture = Shared<BoxFuture<'static, Result<PathBuf, Arc<CmcError>>>>;
type InFlightMap = Arc<Mutex<HashMap<CacheKey, CheckoutFuture>>>;

/// An up-to-date working tree, read-locked until dropped
#[derive(Debug)]
pub struct Checkout {
    path: PathBuf,
    _lock: LockGuard,
}

impl Checkout {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Hands out up-to-date repository checkouts from the shared cache
pub struct RepoCoordinator {
    store: CacheStore,
    executor: CloneExecutor,
    policy: LockPolicy,
    in_flight: InFlightMap,
}

impl RepoCoordinator {
    pub fn new(store: CacheStore, executor: CloneExecutor, policy: LockPolicy) -> Self {
        Self {
            store,
            executor,
            policy,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn executor(&self) -> &CloneExecutor {
        &self.executor
    }

    /// Clone or refresh the repository behind `reference` and return its
    /// working tree, read-locked.
    ///
    /// Do not hold a `Checkout` while asking for another one of the same
    /// repository: the refresh would wait on the held read lock.
    pub async fn checkout(&self, reference: &RemoteReference) -> CmcResult<Checkout> {
        let key = CacheKey::for_reference(reference);
        let lock_path = self.store.lock_path(&key);

        for attempt in 1..=READ_ATTEMPTS {
            let path = self.sync(&key, reference).await?;

            // Another process may replace or drop the tree between our
            // write lock and this read lock
            let lock = LockGuard::acquire(&lock_path, LockMode::Shared, &self.policy).await?;
            if CacheStore::is_usable(&path) {
                return Ok(Checkout { path, _lock: lock });
            }
            warn!(
                "Cache entry {} vanished before it could be read (attempt {}/{})",
                path.display(),
                attempt,
                READ_ATTEMPTS
            );
        }

        Err(CmcError::CheckoutUnavailable {
            repo: reference.repo_slug(),
            attempts: READ_ATTEMPTS,
        })
    }

    /// Single-flight clone/fetch of the entry for `key`
    async fn sync(&self, key: &CacheKey, reference: &RemoteReference) -> CmcResult<PathBuf> {
        let operation = {
            let mut in_flight = self
                .in_flight
                .lock()
                .map_err(|_| CmcError::Internal("in-flight map lock poisoned".to_string()))?;

            match in_flight.get(key) {
                Some(existing) => {
                    debug!("Joining in-flight checkout of {}", key);
                    existing.clone()
                }
                None => {
                    let operation = self.start(key.clone(), reference.clone());
                    in_flight.insert(key.clone(), operation.clone());
                    operation
                }
            }
        };

        operation.await.map_err(CmcError::from_shared)
    }

    fn start(&self, key: CacheKey, reference: RemoteReference) -> CheckoutFuture {
        let entry = InFlightEntry {
            map: Arc::clone(&self.in_flight),
            key: key.clone(),
        };
        let job = CheckoutJob {
            entry_path: self.store.entry_path(&key),
            lock_path: self.store.lock_path(&key),
            executor: self.executor.clone(),
            policy: self.policy,
        };

        async move {
            // Dropped on completion or unwind, so the key never stays claimed
            let _entry = entry;
            job.run(&reference).await.map_err(Arc::new)
        }
        .boxed()
        .shared()
    }

    /// Number of checkouts currently in flight
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().map(|m| m.len()).unwrap_or(0)
    }
}

/// Removes a key from the in-flight map when dropped
struct InFlightEntry {
    map: InFlightMap,
    key: CacheKey,
}

impl Drop for InFlightEntry {
    fn drop(&mut self) {
        if let Ok(mut map) = self.map.lock() {
            map.remove(&self.key);
        }
    }
}

struct CheckoutJob {
    entry_path: PathBuf,
    lock_path: PathBuf,
    executor: CloneExecutor,
    policy: LockPolicy,
}

impl CheckoutJob {
    async fn run(self, reference: &RemoteReference) -> CmcResult<PathBuf> {
        let waiting_since = Utc::now();
        let _lock =
            LockGuard::acquire(&self.lock_path, LockMode::Exclusive, &self.policy).await?;

        if CacheStore::synced_since(&self.entry_path, waiting_since) {
            debug!(
                "{} was refreshed by another process while waiting for the lock",
                reference.repo_slug()
            );
            return Ok(self.entry_path);
        }

        self.executor.sync(reference, &self.entry_path).await?;
        Ok(self.entry_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::testing::ScriptedGit;
    use std::time::Duration;
    use tempfile::TempDir;

    fn policy() -> LockPolicy {
        LockPolicy {
            max_attempts: 10,
            min_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(40),
            factor: 2,
            stale_after: Duration::from_secs(60),
        }
    }

    fn coordinator(dir: &TempDir, git: Arc<ScriptedGit>) -> RepoCoordinator {
        RepoCoordinator::new(CacheStore::new(dir.path()), CloneExecutor::new(git), policy())
    }

    fn reference(input: &str) -> RemoteReference {
        RemoteReference::parse(input).unwrap()
    }

    /// Whether a writer could take the entry's lock right now
    async fn lock_is_free(store: &CacheStore, key: &CacheKey) -> bool {
        let single = LockPolicy {
            max_attempts: 1,
            ..policy()
        };
        LockGuard::acquire(&store.lock_path(key), LockMode::Exclusive, &single)
            .await
            .is_ok()
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_clone() {
        let dir = TempDir::new().unwrap();
        let git = Arc::new(ScriptedGit::new().with_delay(Duration::from_millis(50)));
        let coord = coordinator(&dir, git.clone());

        let a = reference("github:acme/std/rulesets/ts@v1.0.0");
        let b = reference("github:acme/std/prompts/python@latest");
        let c = reference("github:acme/std@main");
        let d = reference("github:acme/std/rulesets/ts@latest");

        let (ra, rb, rc, rd) = tokio::join!(
            coord.checkout(&a),
            coord.checkout(&b),
            coord.checkout(&c),
            coord.checkout(&d)
        );

        let first = ra.unwrap();
        let path = first.path();
        assert_eq!(rb.unwrap().path(), path);
        assert_eq!(rc.unwrap().path(), path);
        assert_eq!(rd.unwrap().path(), path);
        assert_eq!(git.clone_count(), 1);
        assert_eq!(git.fetch_count(), 0);
        assert_eq!(coord.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn different_repositories_proceed_independently() {
        let dir = TempDir::new().unwrap();
        let git = Arc::new(ScriptedGit::new().with_delay(Duration::from_millis(20)));
        let coord = coordinator(&dir, git.clone());
        let std_ref = reference("github:acme/std@v1");
        let other_ref = reference("github:acme/other@v1");

        let (ra, rb) = tokio::join!(coord.checkout(&std_ref), coord.checkout(&other_ref));

        assert_ne!(ra.unwrap().path(), rb.unwrap().path());
        assert_eq!(git.clone_count(), 2);
    }

    #[tokio::test]
    async fn sequential_calls_refresh_existing_entry() {
        let dir = TempDir::new().unwrap();
        let git = Arc::new(ScriptedGit::new());
        let coord = coordinator(&dir, git.clone());
        let r = reference("github:acme/std@v1");

        let first = coord.checkout(&r).await.unwrap().path().to_path_buf();
        let second = coord.checkout(&r).await.unwrap().path().to_path_buf();

        assert_eq!(first, second);
        assert_eq!(git.clone_count(), 1);
        assert_eq!(git.fetch_count(), 1);
    }

    #[tokio::test]
    async fn checkout_holds_read_lock_until_dropped() {
        let dir = TempDir::new().unwrap();
        let coord = coordinator(&dir, Arc::new(ScriptedGit::new()));
        let r = reference("github:acme/std@v1");
        let key = CacheKey::for_reference(&r);

        let checkout = coord.checkout(&r).await.unwrap();
        assert!(!lock_is_free(coord.store(), &key).await);

        drop(checkout);
        assert!(lock_is_free(coord.store(), &key).await);
    }

    #[tokio::test]
    async fn failed_first_url_leaves_clean_state() {
        let dir = TempDir::new().unwrap();
        let git = Arc::new(ScriptedGit::new().fail_clone_url("https://github.com/acme/std.git"));
        let coord = coordinator(&dir, git.clone());
        let r = reference("github:acme/std@v1");
        let key = CacheKey::for_reference(&r);

        let path = coord.checkout(&r).await.unwrap().path().to_path_buf();

        assert!(!path.join("PARTIAL").exists());
        assert!(lock_is_free(coord.store(), &key).await);
        assert_eq!(coord.in_flight_count(), 0);

        let again = tokio::time::timeout(Duration::from_millis(500), coord.checkout(&r))
            .await
            .expect("lock should be free")
            .unwrap();
        assert_eq!(again.path(), path);
    }

    #[tokio::test]
    async fn failure_is_shared_and_releases_everything() {
        let dir = TempDir::new().unwrap();
        let git = Arc::new(
            ScriptedGit::new()
                .with_delay(Duration::from_millis(20))
                .fail_clone_url("https://github.com/acme/std.git")
                .fail_clone_url("git@github.com:acme/std.git"),
        );
        let coord = coordinator(&dir, git.clone());
        let r = reference("github:acme/std@v1");
        let key = CacheKey::for_reference(&r);

        let (ra, rb) = tokio::join!(coord.checkout(&r), coord.checkout(&r));

        assert!(ra.is_err());
        assert!(rb.unwrap_err().to_string().contains("acme/std"));
        // One attempt per candidate URL, not per caller
        assert_eq!(git.clone_count(), 2);
        assert!(!coord.store().entry_path(&key).exists());
        assert!(lock_is_free(coord.store(), &key).await);
        assert_eq!(coord.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn refreshed_while_waiting_skips_work() {
        let dir = TempDir::new().unwrap();
        let git = Arc::new(ScriptedGit::new());
        let coord = coordinator(&dir, git.clone());
        let r = reference("github:acme/std@v1");
        let key = CacheKey::for_reference(&r);
        let store = coord.store().clone();

        // Another process holds the write lock and finishes a clone
        let writer = LockGuard::acquire(&store.lock_path(&key), LockMode::Exclusive, &policy())
            .await
            .unwrap();
        let entry = store.entry_path(&key);
        let other_process = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            std::fs::create_dir_all(entry.join(".git")).unwrap();
            CacheStore::mark_synced(&entry).await.unwrap();
            drop(writer);
        };

        let (result, ()) = tokio::join!(coord.checkout(&r), other_process);

        assert_eq!(result.unwrap().path(), entry);
        assert_eq!(git.clone_count(), 0);
        assert_eq!(git.fetch_count(), 0);
    }

    #[tokio::test]
    async fn coordinators_sharing_a_root_clone_once() {
        let dir = TempDir::new().unwrap();
        let git = Arc::new(ScriptedGit::new().with_delay(Duration::from_millis(50)));
        let first = coordinator(&dir, git.clone());
        let second = coordinator(&dir, git.clone());
        let r = reference("github:acme/std/rulesets/ts@v1");

        let (ra, rb) = tokio::join!(first.checkout(&r), second.checkout(&r));

        assert_eq!(ra.unwrap().path(), rb.unwrap().path());
        assert_eq!(git.clone_count(), 1);
        assert_eq!(git.fetch_count(), 0);
    }

    #[tokio::test]
    async fn refresh_waits_for_readers() {
        let dir = TempDir::new().unwrap();
        let reader = coordinator(&dir, Arc::new(ScriptedGit::new()));
        let git = Arc::new(ScriptedGit::new().fail_fetch());
        let writer = coordinator(&dir, git.clone());
        let r = reference("github:acme/std@v1");

        let held = reader.checkout(&r).await.unwrap();
        std::fs::write(held.path().join("artifact.toml"), "x = 1").unwrap();

        let refresh = async { writer.checkout(&r).await.map(|c| c.path().to_path_buf()) };
        let read = async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            // The failed fetch would wipe the tree; it must not have started
            let content = std::fs::read_to_string(held.path().join("artifact.toml"));
            assert_eq!(git.fetch_count(), 0);
            drop(held);
            content
        };

        let (refreshed, content) = tokio::join!(refresh, read);
        assert_eq!(content.unwrap(), "x = 1");
        assert!(refreshed.is_ok());
        assert_eq!(git.fetch_count(), 1);
        assert_eq!(git.clone_count(), 1);
    }
}
