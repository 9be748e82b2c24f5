//! Scripted git backend for tests

use crate::error::{CmcError, CmcResult};
use crate::git::backend::GitBackend;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Fake backend: "clones" by copying a fixture tree, records every call
#[derive(Debug, Default)]
pub struct ScriptedGit {
    fixture: Option<PathBuf>,
    failing_urls: Vec<String>,
    fail_fetch: bool,
    unavailable: bool,
    delay: Duration,
    clones: Mutex<Vec<String>>,
    fetches: AtomicUsize,
    checkouts: AtomicUsize,
}

impl ScriptedGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy this directory into every clone destination
    pub fn with_fixture(mut self, dir: &Path) -> Self {
        self.fixture = Some(dir.to_path_buf());
        self
    }

    /// Cloning from `url` writes a partial tree and then fails
    pub fn fail_clone_url(mut self, url: &str) -> Self {
        self.failing_urls.push(url.to_string());
        self
    }

    pub fn fail_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Sleep inside every clone so concurrent callers overlap
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn clone_urls(&self) -> Vec<String> {
        self.clones.lock().unwrap().clone()
    }

    pub fn clone_count(&self) -> usize {
        self.clones.lock().unwrap().len()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn checkout_count(&self) -> usize {
        self.checkouts.load(Ordering::SeqCst)
    }

    fn populate(&self, dest: &Path) {
        std::fs::create_dir_all(dest.join(".git")).unwrap();
        if let Some(ref fixture) = self.fixture {
            copy_tree(fixture, dest);
        }
    }
}

fn copy_tree(from: &Path, to: &Path) {
    for entry in std::fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.path().is_dir() {
            std::fs::create_dir_all(&target).unwrap();
            copy_tree(&entry.path(), &target);
        } else {
            std::fs::copy(entry.path(), target).unwrap();
        }
    }
}

#[async_trait]
impl GitBackend for ScriptedGit {
    async fn is_available(&self) -> bool {
        !self.unavailable
    }

    async fn clone_shallow(&self, url: &str, dest: &Path) -> CmcResult<()> {
        self.clones.lock().unwrap().push(url.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.failing_urls.iter().any(|u| u == url) {
            std::fs::create_dir_all(dest).unwrap();
            std::fs::write(dest.join("PARTIAL"), "interrupted").unwrap();
            return Err(CmcError::git_command(
                format!("clone {}", url),
                "simulated transport failure",
            ));
        }

        self.populate(dest);
        Ok(())
    }

    async fn fetch_shallow(&self, _repo: &Path) -> CmcResult<()> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch {
            return Err(CmcError::git_command("fetch", "simulated fetch failure"));
        }
        Ok(())
    }

    async fn checkout_remote_head(&self, repo: &Path) -> CmcResult<()> {
        self.checkouts.fetch_add(1, Ordering::SeqCst);
        self.populate(repo);
        Ok(())
    }
}
