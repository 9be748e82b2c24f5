//! Inherit command - show what one ruleset reference provides

use super::print_json;
use crate::cli::args::InheritArgs;
use crate::config::Config;
use crate::error::CmcResult;
use crate::remote::RemoteResolver;

/// Execute the inherit command
pub async fn execute(args: InheritArgs, config: &Config) -> CmcResult<()> {
    let resolver = RemoteResolver::from_config(config);
    let inherited = resolver.resolve_inherited(&args.reference).await?;
    print_json(&inherited)
}
