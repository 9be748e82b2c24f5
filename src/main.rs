//! cmc - CLI entry point that dispatches to subcommands.

use clap::Parser;
use cmc::cli::{Cli, Commands};
use cmc::config::{Config, ConfigManager};
use cmc::error::CmcResult;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CmcResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, cli.log_json, &config);
    debug!("Configuration loaded from {}", config_manager.path().display());

    match cli.command {
        Commands::Rules(args) => cmc::cli::commands::rules(args, &config).await,
        Commands::Inherit(args) => cmc::cli::commands::inherit(args, &config).await,
        Commands::Fetch(args) => cmc::cli::commands::fetch(args, &config).await,
        Commands::Prompts(args) => cmc::cli::commands::prompts(args, &config).await,
        Commands::Cache(args) => cmc::cli::commands::cache(args, &config).await,
        Commands::Config(args) => {
            cmc::cli::commands::config(args, &config, &config_manager).await
        }
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `RUST_LOG` replaces the level entirely
fn init_logging(verbose: u8, log_json: bool, config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("cmc=warn"),
        1 => EnvFilter::new("cmc=info"),
        _ => EnvFilter::new("cmc=debug"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    if log_json || config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
