//! cmc - shared lint configuration from remote repositories
//!
//! Resolves `github:owner/repo/path@version` references by keeping shallow
//! clones in a local cache, looking versions up in per-category manifests,
//! and merging the inherited ESLint, Ruff and tsc settings with a project's
//! local overrides.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod remote;
pub mod rules;
pub mod ui;

pub use error::{CmcError, CmcResult};
