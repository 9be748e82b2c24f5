//! Rules command - merge inherited and local rulesets for a project

use super::{print_json, project_dir};
use crate::cli::args::RulesArgs;
use crate::config::{Config, ProjectConfig};
use crate::error::CmcResult;
use crate::remote::RemoteResolver;
use crate::rules;
use crate::ui::{TaskSpinner, UiContext};
use tracing::debug;

/// Execute the rules command
pub async fn execute(args: RulesArgs, config: &Config) -> CmcResult<()> {
    let dir = project_dir(args.project)?;
    let (path, project) = ProjectConfig::discover(&dir).await?;
    debug!("Using project config {}", path.display());

    let resolver = RemoteResolver::from_config(config);
    let ctx = UiContext::detect();
    let mut spinner = TaskSpinner::new(&ctx);

    let entries = project.extends.entries();
    if !entries.is_empty() {
        spinner.start(&format!("Resolving {} inherited ruleset(s)", entries.len()));
    }

    let inherited = match resolver.resolve_extends(&project.extends).await {
        Ok(inherited) => inherited,
        Err(e) => {
            spinner.stop_error("Failed to resolve inherited rulesets");
            return Err(e);
        }
    };
    if !entries.is_empty() {
        spinner.stop("Inherited rulesets resolved");
    }

    let merged = rules::merge(&inherited, project.rulesets.as_ref())?;
    print_json(&merged)
}
