use std::path::Path;

use scribe_core::{Archive, ArchiveId};

use crate::commands::common::{open_store, parse_id, print_records};
use crate::error::CliError;

pub async fn run_archive_add(name: &str, description: &str, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let archive = store.create_archive(name, description).await?;

    println!("{}", archive.id);
    Ok(())
}

pub async fn run_archive_list(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let archives = store.list_all::<Archive>().await?;

    print_records(&archives, as_json, "No archives yet.")
}

pub async fn run_archive_edit(
    id: &str,
    name: Option<&str>,
    description: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let archive_id: ArchiveId = parse_id("archive", id)?;
    let store = open_store(db_path).await?;
    let archive = store.update_archive(&archive_id, name, description).await?;

    println!("{}", archive.id);
    Ok(())
}
