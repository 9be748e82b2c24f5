//! Error types for cmc
//!
//! All modules use `CmcResult<T>` as their return type.

use crate::rules::MergeConflict;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for cmc operations
pub type CmcResult<T> = Result<T, CmcError>;

/// All errors that can occur in cmc
#[derive(Error, Debug)]
pub enum CmcError {
    // Reference errors
    #[error("Invalid remote reference '{input}': {reason}. Expected format: {example}")]
    ReferenceFormat {
        input: String,
        reason: String,
        example: &'static str,
    },

    // Git errors
    #[error("git executable not found on PATH")]
    GitNotFound,

    #[error("Failed to clone {repo}: {source}")]
    GitClone {
        repo: String,
        #[source]
        source: Box<CmcError>,
    },

    #[error("git {command} failed: {stderr}")]
    GitCommand { command: String, stderr: String },

    // Lock errors
    #[error("Timed out waiting for cache lock {path} after {attempts} attempts")]
    LockTimeout { path: PathBuf, attempts: u32 },

    #[error("Cache entry for {repo} kept disappearing under concurrent updates ({attempts} attempts)")]
    CheckoutUnavailable { repo: String, attempts: u32 },

    // Manifest errors
    #[error("No {category} manifest found in {repo} (looked for {searched})")]
    ManifestNotFound {
        category: String,
        repo: String,
        searched: String,
    },

    #[error("Invalid manifest {path}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    #[error("'{key}' not found in {category} manifest. Available: {available}")]
    ManifestItemNotFound {
        category: String,
        key: String,
        available: String,
    },

    #[error("Version '{version}' not found for '{key}'. Available versions: {available}")]
    VersionNotFound {
        key: String,
        version: String,
        available: String,
    },

    #[error("'latest' for '{key}' must name a concrete version")]
    LatestPointer { key: String },

    #[error("Version '{version}' of '{key}' is an alias ('{target}'); only 'latest' may alias a version")]
    VersionAlias {
        key: String,
        version: String,
        target: String,
    },

    // Artifact errors
    #[error("Artifact file not found: {0}")]
    ArtifactNotFound(PathBuf),

    #[error("Failed to parse {path}: {reason}")]
    ArtifactParse { path: PathBuf, reason: String },

    #[error("Artifact path '{path}' escapes the repository checkout")]
    ArtifactPath { path: String },

    #[error("Ruleset {path} does not define a [rulesets.{tool}] table")]
    RulesetToolMissing { path: PathBuf, tool: String },

    // Merge errors
    #[error("{0}")]
    MergeConflict(Box<MergeConflict>),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Failure of an in-flight operation observed by more than one caller
    #[error(transparent)]
    Shared(Arc<CmcError>),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl CmcError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a git command error from captured stderr
    pub fn git_command(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::GitCommand {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Recover an owned error from a shared one when this is the last holder
    pub fn from_shared(err: Arc<CmcError>) -> Self {
        Arc::try_unwrap(err).unwrap_or_else(Self::Shared)
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::GitNotFound => Some("Install git and make sure it is on PATH"),
            Self::GitClone { .. } => Some(
                "Check the repository exists; private repositories need an SSH key in ssh-agent",
            ),
            Self::LockTimeout { .. } | Self::CheckoutUnavailable { .. } => {
                Some("Another cmc process is updating this cache entry; retry shortly")
            }
            Self::MergeConflict(_) => {
                Some("Remove the local override or make it match the inherited value")
            }
            Self::Shared(inner) => inner.hint(),
            _ => None,
        }
    }
}
