//! CLI argument definitions using clap derive

use crate::remote::ArtifactCategory;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// cmc - shared lint configuration from remote repositories
///
/// Resolves `github:owner/repo/path@version` references through a local
/// repository cache and merges inherited rulesets with project overrides.
#[derive(Parser, Debug)]
#[command(name = "cmc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CMC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge the project's inherited and local rulesets
    Rules(RulesArgs),

    /// Show the rules a ruleset reference provides
    Inherit(InheritArgs),

    /// Resolve a reference and print the artifact
    Fetch(FetchArgs),

    /// Fetch prompt templates
    Prompts(PromptsArgs),

    /// Manage the repository cache
    Cache(CacheArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the rules command
#[derive(Parser, Debug)]
pub struct RulesArgs {
    /// Project directory (defaults to current directory)
    #[arg(short, long)]
    pub project: Option<PathBuf>,
}

/// Arguments for the inherit command
#[derive(Parser, Debug)]
pub struct InheritArgs {
    /// Ruleset reference, e.g. github:acme/std/rulesets/ts@v1.0.0
    pub reference: String,
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Remote reference
    pub reference: String,

    /// Artifact category the reference points into
    #[arg(short, long, default_value = "rulesets")]
    pub kind: ArtifactKind,
}

/// Arguments for the prompts command
#[derive(Parser, Debug)]
pub struct PromptsArgs {
    /// Prompt references (defaults to [prompts] templates in cmc.toml)
    pub references: Vec<String>,

    /// Project directory used when no references are given
    #[arg(short, long)]
    pub project: Option<PathBuf>,
}

/// Artifact categories selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArtifactKind {
    Rulesets,
    Prompts,
    Configs,
}

impl From<ArtifactKind> for ArtifactCategory {
    fn from(kind: ArtifactKind) -> Self {
        match kind {
            ArtifactKind::Rulesets => Self::Rulesets,
            ArtifactKind::Prompts => Self::Prompts,
            ArtifactKind::Configs => Self::Configs,
        }
    }
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for list commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached repositories
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Print the cache root directory
    Path,

    /// Remove every cached repository
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}
