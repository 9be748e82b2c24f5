//! Prompts command - fetch prompt templates in order

use super::project_dir;
use crate::cli::args::PromptsArgs;
use crate::config::{Config, ProjectConfig};
use crate::error::{CmcError, CmcResult};
use crate::remote::RemoteResolver;
use console::style;

/// Execute the prompts command
pub async fn execute(args: PromptsArgs, config: &Config) -> CmcResult<()> {
    let references = if args.references.is_empty() {
        let dir = project_dir(args.project)?;
        let (path, project) = ProjectConfig::discover(&dir).await?;
        if project.prompts.templates.is_empty() {
            return Err(CmcError::User(format!(
                "No prompt references given and {} has no [prompts] templates",
                path.display()
            )));
        }
        project.prompts.templates
    } else {
        args.references
    };

    let resolver = RemoteResolver::from_config(config);
    let templates = resolver.fetch_prompts(&references).await?;

    for (i, template) in templates.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", style(format!("# source: {}", template.source)).dim());
        print!("{}", template.content);
    }

    Ok(())
}
