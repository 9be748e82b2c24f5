//! Configuration management for cmc
//!
//! Two files are involved: the user configuration (`~/.config/cmc/config.toml`)
//! tuning the cache, and the project configuration (`cmc.toml`) declaring
//! which remote rulesets a project extends and its local overrides.

pub mod project;
pub mod schema;

pub use project::{Extends, ProjectConfig, PROJECT_CONFIG_FILE};
pub use schema::Config;

use crate::cache::CacheStore;
use crate::error::{CmcError, CmcResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cmc")
            .join("config.toml")
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> CmcResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> CmcResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| CmcError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| CmcError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> CmcResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                CmcError::io(format!("creating config directory {}", parent.display()), e)
            })?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            CmcError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Cache store for a loaded configuration: `cache.root` wins over the
    /// `CMC_HOME` / `~/.cmc` default
    pub fn cache_store(config: &Config) -> CacheStore {
        match config.cache.root {
            Some(ref root) => CacheStore::new(root.clone()),
            None => CacheStore::default(),
        }
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
