//! Version manifests
//!
//! Each artifact category has a JSON manifest in the repository:
//!
//! ```json
//! {
//!   "schema_version": "1.0.0",
//!   "rulesets": {
//!     "rulesets/ts": {
//!       "versions": {
//!         "latest": "v1.0.0",
//!         "v1.0.0": { "file": "ts/1.0.0.toml" }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! `latest` is the only alias allowed, and it must point at a concrete
//! version. File paths are relative to the manifest's directory.

use crate::error::{CmcError, CmcResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The version key that may alias another version
pub const LATEST: &str = "latest";

/// Kinds of artifact a repository can publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactCategory {
    /// Linter rulesets (TOML)
    Rulesets,
    /// Prompt templates (Markdown)
    Prompts,
    /// Settings files (JSON)
    Configs,
}

impl ArtifactCategory {
    /// Key of the item map inside the manifest
    pub fn key(&self) -> &'static str {
        match self {
            Self::Rulesets => "rulesets",
            Self::Prompts => "prompts",
            Self::Configs => "configs",
        }
    }

    /// Manifest file name
    pub fn manifest_file(&self) -> String {
        format!("{}.json", self.key())
    }

    /// Manifest locations inside a checkout, in lookup order: repository
    /// root, then `<category>/`
    pub fn manifest_candidates(&self, checkout: &Path) -> Vec<PathBuf> {
        vec![
            checkout.join(self.manifest_file()),
            checkout.join(self.key()).join(self.manifest_file()),
        ]
    }
}

impl fmt::Display for ArtifactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A version entry: a file descriptor or an alias to another version
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum VersionValue {
    Alias(String),
    File(FileDescriptor),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileDescriptor {
    pub file: String,
}

/// One manifest item and its published versions
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestEntry {
    pub versions: BTreeMap<String, VersionValue>,
}

impl ManifestEntry {
    /// Resolve a requested version of item `key` to its file path
    pub fn resolve(&self, key: &str, requested: &str) -> CmcResult<&str> {
        let version = if requested == LATEST {
            match self.versions.get(LATEST) {
                Some(VersionValue::Alias(target)) => target.as_str(),
                Some(VersionValue::File(_)) => {
                    return Err(CmcError::LatestPointer {
                        key: key.to_string(),
                    })
                }
                None => return Err(self.not_found(key, LATEST)),
            }
        } else {
            requested
        };

        match self.versions.get(version) {
            Some(VersionValue::File(descriptor)) => Ok(descriptor.file.as_str()),
            Some(VersionValue::Alias(target)) => Err(CmcError::VersionAlias {
                key: key.to_string(),
                version: version.to_string(),
                target: target.clone(),
            }),
            None => Err(self.not_found(key, version)),
        }
    }

    /// Concrete versions, excluding the `latest` pointer
    pub fn available_versions(&self) -> Vec<&str> {
        self.versions
            .keys()
            .map(String::as_str)
            .filter(|v| *v != LATEST)
            .collect()
    }

    fn not_found(&self, key: &str, version: &str) -> CmcError {
        CmcError::VersionNotFound {
            key: key.to_string(),
            version: version.to_string(),
            available: join_or_none(self.available_versions()),
        }
    }
}

/// A parsed, shape-validated manifest
#[derive(Debug, Clone)]
pub struct Manifest {
    pub schema_version: semver::Version,
    pub category: ArtifactCategory,
    pub items: BTreeMap<String, ManifestEntry>,
    /// Where the manifest was read from
    pub path: PathBuf,
}

#[derive(Deserialize)]
struct RawManifest {
    schema_version: Value,
    #[serde(flatten)]
    sections: BTreeMap<String, Value>,
}

impl Manifest {
    /// Read the category's manifest from a repository checkout
    pub async fn fetch(
        checkout: &Path,
        category: ArtifactCategory,
        repo: &str,
    ) -> CmcResult<Self> {
        let candidates = category.manifest_candidates(checkout);
        for path in &candidates {
            match tokio::fs::read_to_string(path).await {
                Ok(content) => {
                    debug!("Loaded {} manifest {}", category, path.display());
                    return Self::parse(&content, category, path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(CmcError::io(format!("reading {}", path.display()), e));
                }
            }
        }

        Err(CmcError::ManifestNotFound {
            category: category.to_string(),
            repo: repo.to_string(),
            searched: candidates
                .iter()
                .filter_map(|p| p.strip_prefix(checkout).ok())
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Parse and validate manifest JSON
    pub fn parse(content: &str, category: ArtifactCategory, path: &Path) -> CmcResult<Self> {
        let invalid = |reason: String| CmcError::ManifestInvalid {
            path: path.to_path_buf(),
            reason,
        };

        let mut raw: RawManifest =
            serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?;

        let schema_version = match raw.schema_version {
            Value::String(ref v) => semver::Version::parse(v)
                .map_err(|e| invalid(format!("schema_version '{}' is not semver: {}", v, e)))?,
            _ => return Err(invalid("schema_version must be a string".to_string())),
        };

        let section = raw
            .sections
            .remove(category.key())
            .ok_or_else(|| invalid(format!("missing \"{}\" section", category.key())))?;
        let items: BTreeMap<String, ManifestEntry> = serde_json::from_value(section)
            .map_err(|e| invalid(format!("invalid \"{}\" section: {}", category.key(), e)))?;

        Ok(Self {
            schema_version,
            category,
            items,
            path: path.to_path_buf(),
        })
    }

    /// Resolve `key` at `version` to a file path relative to the manifest
    pub fn resolve_version(&self, key: &str, version: &str) -> CmcResult<&str> {
        let entry = self
            .items
            .get(key)
            .ok_or_else(|| CmcError::ManifestItemNotFound {
                category: self.category.to_string(),
                key: key.to_string(),
                available: join_or_none(self.items.keys().map(String::as_str).collect()),
            })?;
        entry.resolve(key, version)
    }

    /// Directory resolved file paths are relative to
    pub fn base_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

fn join_or_none(items: Vec<&str>) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}
