//! Stacks CLI - Command-line interface for the pin store
//!
//! Imports pins from sources, edits them, and manages snapshot backups.

mod cli;
mod commands;
mod error;

use clap::Parser;
use stacks_core::services::UpsertOrchestrator;

use crate::cli::{Cli, Commands};
use crate::commands::backup::{run_backup, run_backups, run_restore, run_wipe};
use crate::commands::common::{backup_service, load_config, open_store, resolve_runtime};
use crate::commands::completions::run_completions;
use crate::commands::diffs::run_diffs;
use crate::commands::edit::{run_edit, PinEdit};
use crate::commands::import::run_import;
use crate::commands::list::run_list;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "stacks=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Completions need no store
    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let config = load_config(cli.config.as_deref())?;
    let runtime = resolve_runtime(config, cli.db_path, cli.backups_dir)?;
    let store = open_store(&runtime).await?;

    match cli.command {
        Commands::List {
            limit,
            tag,
            all,
            json,
        } => run_list(&store, limit, tag.as_deref(), all, json).await?,
        Commands::Import { source, path } => {
            run_import(&UpsertOrchestrator::new(store), source, &path).await?;
        }
        Commands::Edit {
            url,
            title,
            notes,
            tags,
            read,
            unread,
            delete,
        } => {
            let edit = PinEdit {
                title,
                notes,
                add_tags: tags,
                is_read: if read {
                    Some(true)
                } else if unread {
                    Some(false)
                } else {
                    None
                },
                tombstone: delete,
            };
            run_edit(&UpsertOrchestrator::new(store), &url, edit).await?;
        }
        Commands::Backup => run_backup(&backup_service(store, &runtime)).await?,
        Commands::Backups => run_backups(&backup_service(store, &runtime))?,
        Commands::Restore { dir } => run_restore(&backup_service(store, &runtime), &dir).await?,
        Commands::Wipe { yes } => run_wipe(&backup_service(store, &runtime), yes).await?,
        Commands::Diffs { limit, json } => run_diffs(&store, limit, json).await?,
        Commands::Sync => run_sync(&runtime, &store).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}
