//! Remote configuration resolution
//!
//! `RemoteResolver` is the entry point used by the commands: it turns a
//! reference string into parsed content by checking out the repository
//! through the shared cache, resolving the version in the category
//! manifest, and reading the named file.
//!
//! A resolver owns its coordinator, so in-flight bookkeeping lives exactly
//! as long as the resolver and is never shared between unrelated callers.

pub mod artifact;
pub mod manifest;
pub mod reference;

pub use artifact::Artifact;
pub use manifest::{ArtifactCategory, Manifest, ManifestEntry};
pub use reference::{is_remote_reference, Host, RemoteReference};

use crate::cache::{CacheStore, Checkout, LockPolicy, RepoCoordinator};
use crate::config::{Config, ConfigManager, Extends};
use crate::error::{CmcError, CmcResult};
use crate::git::{CloneExecutor, GitBackend, GitCli};
use crate::rules::{InheritedRules, ResolvedRuleset, RulesetsConfig, Tool};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// A prompt template fetched from a remote reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptTemplate {
    pub source: String,
    pub content: String,
}

/// Manifest-resolved location of an artifact inside a checkout.
///
/// Keeps the checkout read-locked, so `path` stays valid until this is dropped.
#[derive(Debug)]
pub struct LocatedArtifact {
    pub reference: RemoteReference,
    pub category: ArtifactCategory,
    pub path: PathBuf,
    checkout: Checkout,
}

impl LocatedArtifact {
    pub fn checkout_dir(&self) -> &Path {
        self.checkout.path()
    }
}

/// Resolves remote references against the shared repository cache
pub struct RemoteResolver {
    coordinator: RepoCoordinator,
    git_available: OnceCell<bool>,
}

impl RemoteResolver {
    pub fn new(store: CacheStore, git: Arc<dyn GitBackend>, policy: LockPolicy) -> Self {
        Self {
            coordinator: RepoCoordinator::new(store, CloneExecutor::new(git), policy),
            git_available: OnceCell::new(),
        }
    }

    /// Resolver using the system git and the configured cache root and lock policy
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ConfigManager::cache_store(config),
            Arc::new(GitCli::new()),
            LockPolicy::from(&config.lock),
        )
    }

    pub fn store(&self) -> &CacheStore {
        self.coordinator.store()
    }

    /// Fail fast when git is missing, before touching cache or locks
    async fn ensure_git(&self) -> CmcResult<()> {
        let backend = self.coordinator.executor().backend();
        let available = *self
            .git_available
            .get_or_init(|| async { backend.is_available().await })
            .await;
        if available {
            Ok(())
        } else {
            Err(CmcError::GitNotFound)
        }
    }

    /// Check out the reference's repository and resolve its version through
    /// the category manifest
    pub async fn locate(
        &self,
        reference: &RemoteReference,
        category: ArtifactCategory,
    ) -> CmcResult<LocatedArtifact> {
        self.ensure_git().await?;

        let checkout = self.coordinator.checkout(reference).await?;
        let manifest = Manifest::fetch(checkout.path(), category, &reference.repo_slug()).await?;
        let file = manifest.resolve_version(&reference.path, &reference.version)?;
        let path = artifact::artifact_path(manifest.base_dir(), file)?;

        debug!("Resolved {} to {}", reference, path.display());
        Ok(LocatedArtifact {
            reference: reference.clone(),
            category,
            path,
            checkout,
        })
    }

    /// Fetch and parse one artifact
    pub async fn fetch(&self, reference: &str, category: ArtifactCategory) -> CmcResult<Artifact> {
        let reference = RemoteReference::parse(reference)?;
        let located = self.locate(&reference, category).await?;
        let content = artifact::read_artifact(&located.path).await?;
        artifact::parse_artifact(category, &located.path, content)
    }

    /// Fetch a ruleset file with all of its tool tables
    pub async fn fetch_rulesets(&self, reference: &str) -> CmcResult<RulesetsConfig> {
        let parsed = RemoteReference::parse(reference)?;
        let located = self.locate(&parsed, ArtifactCategory::Rulesets).await?;
        let content = artifact::read_artifact(&located.path).await?;
        artifact::parse_ruleset(&located.path, &content)
    }

    /// Fetch the configuration for one tool from a ruleset reference
    pub async fn fetch_ruleset(&self, reference: &str, tool: Tool) -> CmcResult<ResolvedRuleset> {
        let parsed = RemoteReference::parse(reference)?;
        let located = self.locate(&parsed, ArtifactCategory::Rulesets).await?;
        let content = artifact::read_artifact(&located.path).await?;
        let rulesets = artifact::parse_ruleset(&located.path, &content)?;

        let payload = rulesets
            .payload(tool)
            .ok_or_else(|| CmcError::RulesetToolMissing {
                path: located.path.clone(),
                tool: tool.to_string(),
            })?;

        Ok(ResolvedRuleset {
            source: reference.to_string(),
            payload,
        })
    }

    /// Every tool defined by one ruleset reference, as inherited rules
    pub async fn resolve_inherited(&self, reference: &str) -> CmcResult<InheritedRules> {
        let rulesets = self.fetch_rulesets(reference).await?;

        let mut inherited = InheritedRules::default();
        for tool in rulesets.tools() {
            if let Some(payload) = rulesets.payload(tool) {
                inherited.insert(ResolvedRuleset {
                    source: reference.to_string(),
                    payload,
                });
            }
        }
        Ok(inherited)
    }

    /// Resolve a project's `[extends]` table, one tool at a time
    pub async fn resolve_extends(&self, extends: &Extends) -> CmcResult<InheritedRules> {
        let mut inherited = InheritedRules::default();
        for (tool, reference) in extends.entries() {
            info!("Resolving {} rules from {}", tool, reference);
            inherited.insert(self.fetch_ruleset(reference, tool).await?);
        }
        Ok(inherited)
    }

    /// Fetch one prompt template
    pub async fn fetch_prompt(&self, reference: &str) -> CmcResult<PromptTemplate> {
        match self.fetch(reference, ArtifactCategory::Prompts).await? {
            Artifact::Prompt(content) => Ok(PromptTemplate {
                source: reference.to_string(),
                content,
            }),
            other => Err(CmcError::Internal(format!(
                "prompt fetch returned {:?}",
                other
            ))),
        }
    }

    /// Fetch prompt templates in order, one after another. The first
    /// failure aborts the rest.
    pub async fn fetch_prompts(&self, references: &[String]) -> CmcResult<Vec<PromptTemplate>> {
        let mut templates = Vec::with_capacity(references.len());
        for reference in references {
            templates.push(self.fetch_prompt(reference).await?);
        }
        Ok(templates)
    }
}
