//! Fetch command - resolve a reference and print the artifact

use super::print_json;
use crate::cli::args::FetchArgs;
use crate::config::Config;
use crate::error::CmcResult;
use crate::remote::{Artifact, RemoteResolver};

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> CmcResult<()> {
    let resolver = RemoteResolver::from_config(config);

    match resolver.fetch(&args.reference, args.kind.into()).await? {
        Artifact::Prompt(text) => {
            print!("{}", text);
            Ok(())
        }
        artifact => print_json(&artifact),
    }
}
