//! CLI command implementations

pub mod cache;
pub mod config;
pub mod fetch;
pub mod inherit;
pub mod prompts;
pub mod rules;

pub use cache::execute as cache;
pub use config::execute as config;
pub use fetch::execute as fetch;
pub use inherit::execute as inherit;
pub use prompts::execute as prompts;
pub use rules::execute as rules;

use crate::error::{CmcError, CmcResult};
use serde::Serialize;
use std::path::PathBuf;

/// `--project` if given, otherwise the current directory
fn project_dir(project: Option<PathBuf>) -> CmcResult<PathBuf> {
    match project {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().map_err(|e| CmcError::io("getting current directory", e)),
    }
}

fn print_json<T: Serialize>(value: &T) -> CmcResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
