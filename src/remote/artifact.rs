//! Artifact retrieval and parsing
//!
//! Once the manifest names a file, it is read from the checkout and parsed
//! according to its category: TOML rulesets, JSON settings, raw Markdown
//! prompts.

use crate::error::{CmcError, CmcResult};
use crate::remote::manifest::ArtifactCategory;
use crate::rules::RulesetsConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Component, Path, PathBuf};

/// A fetched, parsed artifact
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Artifact {
    Ruleset(RulesetsConfig),
    Settings(Value),
    Prompt(String),
}

#[derive(Deserialize)]
struct RulesetFile {
    rulesets: RulesetsConfig,
}

/// Join a manifest-relative file path onto `base`, refusing anything that
/// could leave the checkout
pub fn artifact_path(base: &Path, relative: &str) -> CmcResult<PathBuf> {
    let rel = Path::new(relative);
    let escapes = relative.is_empty()
        || rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(CmcError::ArtifactPath {
            path: relative.to_string(),
        });
    }
    Ok(base.join(rel))
}

/// Read an artifact file as text
pub async fn read_artifact(path: &Path) -> CmcResult<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CmcError::ArtifactNotFound(path.to_path_buf())
        } else {
            CmcError::io(format!("reading artifact {}", path.display()), e)
        }
    })
}

/// Parse artifact content according to its category
pub fn parse_artifact(category: ArtifactCategory, path: &Path, content: String) -> CmcResult<Artifact> {
    match category {
        ArtifactCategory::Rulesets => parse_ruleset(path, &content).map(Artifact::Ruleset),
        ArtifactCategory::Configs => parse_settings(path, &content).map(Artifact::Settings),
        ArtifactCategory::Prompts => Ok(Artifact::Prompt(content)),
    }
}

/// Parse a ruleset TOML file (`[rulesets.<tool>]` tables)
pub fn parse_ruleset(path: &Path, content: &str) -> CmcResult<RulesetsConfig> {
    toml::from_str::<RulesetFile>(content)
        .map(|file| file.rulesets)
        .map_err(|e| CmcError::ArtifactParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Parse a JSON settings file
pub fn parse_settings(path: &Path, content: &str) -> CmcResult<Value> {
    serde_json::from_str(content).map_err(|e| CmcError::ArtifactParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
