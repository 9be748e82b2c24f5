//! Configuration schema for cmc
//!
//! Configuration is stored at `~/.config/cmc/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Repository cache settings
    pub cache: CacheConfig,

    /// Cache lock tuning
    pub lock: LockConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Repository cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache root (default: `$CMC_HOME` or `~/.cmc`)
    pub root: Option<PathBuf>,
}

/// Lock acquisition settings for cache entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Attempts before giving up with a lock timeout
    pub max_attempts: u32,

    /// First retry delay in milliseconds
    pub min_backoff_ms: u64,

    /// Upper bound for a single retry delay in milliseconds
    pub max_backoff_ms: u64,

    /// Multiplier applied to the delay after each attempt
    pub backoff_factor: u32,

    /// Age in seconds after which a held lock is considered abandoned
    pub stale_after_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            min_backoff_ms: 100,
            max_backoff_ms: 5000,
            backoff_factor: 2,
            stale_after_secs: 60,
        }
    }
}
