//! Cache command - inspect and clear the repository cache

use crate::cache::{CacheEntryInfo, CacheStore, LockPolicy};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::{Config, ConfigManager};
use crate::error::CmcResult;
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> CmcResult<()> {
    let store = ConfigManager::cache_store(config);

    match args.action {
        CacheAction::List { format } => list_entries(&store, format).await,
        CacheAction::Path => {
            println!("{}", store.root().display());
            Ok(())
        }
        CacheAction::Clear { yes } => {
            clear_entries(&store, &LockPolicy::from(&config.lock), yes).await
        }
    }
}

async fn list_entries(store: &CacheStore, format: OutputFormat) -> CmcResult<()> {
    let entries = store.list().await?;

    match format {
        OutputFormat::Table => print_entry_table(&entries),
        OutputFormat::Json => print_entry_json(&entries)?,
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.name);
            }
        }
    }

    Ok(())
}

fn print_entry_table(entries: &[CacheEntryInfo]) {
    if entries.is_empty() {
        println!("No cached repositories.");
        return;
    }

    println!("{:<48} {:<20}", "REPOSITORY", "LAST SYNCED");
    println!("{}", "-".repeat(68));

    for entry in entries {
        let synced = match entry.last_synced {
            Some(at) => at.format("%Y-%m-%d %H:%M").to_string(),
            None => style("never").yellow().to_string(),
        };
        println!("{:<48} {:<20}", entry.name, synced);
    }

    println!();
    println!("Total: {} {}", entries.len(), plural(entries.len()));
}

fn print_entry_json(entries: &[CacheEntryInfo]) -> CmcResult<()> {
    #[derive(Serialize)]
    struct EntryJson<'a> {
        name: &'a str,
        path: String,
        last_synced: Option<String>,
    }

    let json: Vec<EntryJson<'_>> = entries
        .iter()
        .map(|e| EntryJson {
            name: &e.name,
            path: e.path.display().to_string(),
            last_synced: e.last_synced.map(|t| t.to_rfc3339()),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

async fn clear_entries(store: &CacheStore, policy: &LockPolicy, yes: bool) -> CmcResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);

    if store.list().await?.is_empty() {
        ui::step_info(&ctx, "No cached repositories to remove");
        return Ok(());
    }

    let confirmed = ui::confirm(
        &ctx,
        &format!(
            "Remove all cached repositories under {}?",
            store.cache_dir().display()
        ),
        false,
    )
    .await?;
    if !confirmed {
        ui::step_warn_hint(
            &ctx,
            "Cache not cleared",
            "Pass --yes to clear without prompting",
        );
        return Ok(());
    }

    let removed = store.clear(policy).await?;
    ui::step_ok(
        &ctx,
        &format!("Removed {} cached {}", removed, plural(removed)),
    );
    Ok(())
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        "repository"
    } else {
        "repositories"
    }
}
