//! Clone/fetch executor
//!
//! Brings a cache entry up to date with the remote default branch. The
//! reference's version is never used as a git ref; versions are resolved
//! through the manifest once the checkout is current.

use crate::cache::CacheStore;
use crate::error::{CmcError, CmcResult};
use crate::git::backend::GitBackend;
use crate::remote::RemoteReference;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Clone URLs to try, in order: anonymous HTTPS (public repositories),
/// then SSH with ambient credentials (private repositories)
pub fn candidate_urls(reference: &RemoteReference) -> Vec<String> {
    let domain = reference.host.domain();
    vec![
        format!(
            "https://{}/{}/{}.git",
            domain, reference.owner, reference.repo
        ),
        format!("git@{}:{}/{}.git", domain, reference.owner, reference.repo),
    ]
}

/// Runs clone/fetch against a cache entry. Callers must hold the entry lock.
#[derive(Clone)]
pub struct CloneExecutor {
    git: Arc<dyn GitBackend>,
}

impl CloneExecutor {
    pub fn new(git: Arc<dyn GitBackend>) -> Self {
        Self { git }
    }

    pub fn backend(&self) -> &Arc<dyn GitBackend> {
        &self.git
    }

    /// Make `dest` a current checkout of the reference's repository.
    ///
    /// An existing working tree is fetched and checked out; if that fails it
    /// is deleted and cloned fresh. On error `dest` does not exist.
    pub async fn sync(&self, reference: &RemoteReference, dest: &Path) -> CmcResult<()> {
        if CacheStore::is_usable(dest) {
            match self.update(dest).await {
                Ok(()) => {
                    debug!("Updated {} in {}", reference.repo_slug(), dest.display());
                    return CacheStore::mark_synced(dest).await;
                }
                Err(e) => {
                    warn!(
                        "Updating cached {} failed, re-cloning: {}",
                        reference.repo_slug(),
                        e
                    );
                }
            }
        }

        // Missing, unusable, or failed update: start from an empty directory
        CacheStore::remove_entry(dest).await?;
        self.clone_any(reference, dest).await?;
        if let Err(e) = CacheStore::mark_synced(dest).await {
            CacheStore::remove_entry(dest).await?;
            return Err(e);
        }
        Ok(())
    }

    async fn update(&self, dest: &Path) -> CmcResult<()> {
        self.git.fetch_shallow(dest).await?;
        self.git.checkout_remote_head(dest).await
    }

    /// Try each candidate URL, cleaning up after every failed attempt
    async fn clone_any(&self, reference: &RemoteReference, dest: &Path) -> CmcResult<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CmcError::io(format!("creating {}", parent.display()), e))?;
        }

        let mut last_error = None;
        for url in candidate_urls(reference) {
            debug!("Cloning {} into {}", url, dest.display());
            match self.git.clone_shallow(&url, dest).await {
                Ok(()) => {
                    info!("Cloned {} from {}", reference.repo_slug(), url);
                    return Ok(());
                }
                Err(e) => {
                    debug!("Clone from {} failed: {}", url, e);
                    CacheStore::remove_entry(dest).await?;
                    last_error = Some(e);
                }
            }
        }

        Err(CmcError::GitClone {
            repo: reference.repo_slug(),
            source: Box::new(
                last_error.unwrap_or_else(|| CmcError::Internal("no clone URLs".to_string())),
            ),
        })
    }
}
