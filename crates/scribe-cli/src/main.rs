//! StackScribe CLI - manage archives, tomes and entries from the terminal
//!
//! Works against the local store; `scribe sync` and `scribe status` talk to
//! the configured sync service.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;
use scribe_core::config::SyncSettings;

use crate::cli::{ArchiveCommands, Cli, Commands, EntryCommands, SyncCommands, TomeCommands};
use crate::commands::archive::{run_archive_add, run_archive_edit, run_archive_list};
use crate::commands::common::resolve_db_path;
use crate::commands::delete::run_delete;
use crate::commands::entry::{
    run_entry_add, run_entry_edit, run_entry_list, run_entry_show, EntryEdits,
};
use crate::commands::status::run_status;
use crate::commands::sync::{run_sync, run_sync_conflicts, SyncDirection};
use crate::commands::tome::{run_tome_add, run_tome_edit, run_tome_list};
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

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "scribe=info"
                    .parse()
                    .map_err(|error| CliError::Config(format!("invalid log directive: {error}")))?,
            ),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = SyncSettings::from_env()?;
    let db_path = resolve_db_path(cli.db_path, &settings)?;

    match cli.command {
        Commands::Archive { command } => match command {
            ArchiveCommands::Add { name, description } => {
                run_archive_add(&name, &description, &db_path).await?;
            }
            ArchiveCommands::List { json } => run_archive_list(json, &db_path).await?,
            ArchiveCommands::Edit {
                id,
                name,
                description,
            } => {
                run_archive_edit(&id, name.as_deref(), description.as_deref(), &db_path).await?;
            }
        },
        Commands::Tome { command } => match command {
            TomeCommands::Add {
                archive,
                name,
                description,
            } => run_tome_add(&archive, &name, &description, &db_path).await?,
            TomeCommands::List { archive_id, json } => {
                run_tome_list(&archive_id, json, &db_path).await?;
            }
            TomeCommands::Edit {
                id,
                name,
                description,
            } => run_tome_edit(&id, name.as_deref(), description.as_deref(), &db_path).await?,
        },
        Commands::Entry { command } => match command {
            EntryCommands::Add {
                tome,
                name,
                content,
                entry_type,
            } => run_entry_add(&tome, &name, content.as_deref(), entry_type, &db_path).await?,
            EntryCommands::List { tome_id, json } => {
                run_entry_list(&tome_id, json, &db_path).await?;
            }
            EntryCommands::Show { id, json } => run_entry_show(&id, json, &db_path).await?,
            EntryCommands::Edit {
                id,
                name,
                content,
                entry_type,
            } => {
                let edits = EntryEdits {
                    name,
                    content,
                    entry_type,
                };
                run_entry_edit(&id, edits, &db_path).await?;
            }
        },
        Commands::Delete { kind, id } => run_delete(kind, &id, &db_path).await?,
        Commands::Sync { command } => match command {
            None | Some(SyncCommands::Full) => {
                run_sync(SyncDirection::Full, &settings, &db_path).await?;
            }
            Some(SyncCommands::Up) => run_sync(SyncDirection::Up, &settings, &db_path).await?,
            Some(SyncCommands::Down) => run_sync(SyncDirection::Down, &settings, &db_path).await?,
            Some(SyncCommands::Conflicts { limit, json }) => {
                run_sync_conflicts(limit, json, &db_path).await?;
            }
        },
        Commands::Status { json } => run_status(json, &settings, &db_path).await?,
    }

    Ok(())
}
