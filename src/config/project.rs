//! Project configuration (`cmc.toml`)

use crate::error::{CmcError, CmcResult};
use crate::remote::is_remote_reference;
use crate::rules::{RulesetsConfig, Tool};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Project configuration file name
pub const PROJECT_CONFIG_FILE: &str = "cmc.toml";

/// Parsed `cmc.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub extends: Extends,

    /// Local overrides merged over the inherited rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rulesets: Option<RulesetsConfig>,

    #[serde(default)]
    pub prompts: PromptsConfig,
}

/// `[extends]`: one remote ruleset reference per tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Extends {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eslint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ruff: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tsc: Option<String>,
}

impl Extends {
    /// Declared references in tool order
    pub fn entries(&self) -> Vec<(Tool, &str)> {
        [
            (Tool::Eslint, &self.eslint),
            (Tool::Ruff, &self.ruff),
            (Tool::Tsc, &self.tsc),
        ]
        .into_iter()
        .filter_map(|(tool, reference)| reference.as_deref().map(|r| (tool, r)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// `[prompts]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptsConfig {
    #[serde(default)]
    pub templates: Vec<String>,
}

impl ProjectConfig {
    /// Find `cmc.toml` in `start` or the nearest ancestor
    pub fn find(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(PROJECT_CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Load and validate a project configuration file
    pub async fn load(path: &Path) -> CmcResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CmcError::ConfigNotFound(path.to_path_buf())
            } else {
                CmcError::io(format!("reading {}", path.display()), e)
            }
        })?;
        debug!("Loading project config from {}", path.display());
        Self::parse(&content, path)
    }

    /// Discover and load the project configuration for `start`
    pub async fn discover(start: &Path) -> CmcResult<(PathBuf, Self)> {
        let path = Self::find(start)
            .ok_or_else(|| CmcError::ConfigNotFound(start.join(PROJECT_CONFIG_FILE)))?;
        let config = Self::load(&path).await?;
        Ok((path, config))
    }

    pub fn parse(content: &str, path: &Path) -> CmcResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| CmcError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> CmcResult<()> {
        let references = self
            .extends
            .entries()
            .into_iter()
            .map(|(tool, r)| (format!("extends.{}", tool), r))
            .chain(
                self.prompts
                    .templates
                    .iter()
                    .map(|r| ("prompts.templates".to_string(), r.as_str())),
            );

        for (field, reference) in references {
            if !is_remote_reference(reference) {
                return Err(CmcError::ConfigInvalid {
                    path: path.to_path_buf(),
                    reason: format!(
                        "{} = '{}' is not a remote reference (expected github:owner/repo/path@version)",
                        field, reference
                    ),
                });
            }
        }
        Ok(())
    }
}
