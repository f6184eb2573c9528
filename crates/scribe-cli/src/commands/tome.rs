use std::path::Path;

use scribe_core::{ArchiveId, Tome, TomeId};

use crate::commands::common::{open_store, parse_id, print_records};
use crate::error::CliError;

pub async fn run_tome_add(
    archive_id: &str,
    name: &str,
    description: &str,
    db_path: &Path,
) -> Result<(), CliError> {
    let archive_id: ArchiveId = parse_id("archive", archive_id)?;
    let store = open_store(db_path).await?;
    let tome = store.create_tome(&archive_id, name, description).await?;

    println!("{}", tome.id);
    Ok(())
}

pub async fn run_tome_list(archive_id: &str, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let archive_id: ArchiveId = parse_id("archive", archive_id)?;
    let store = open_store(db_path).await?;
    let tomes = store.list_by_owner::<Tome>(&archive_id).await?;

    print_records(&tomes, as_json, "No tomes in this archive.")
}

pub async fn run_tome_edit(
    id: &str,
    name: Option<&str>,
    description: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let tome_id: TomeId = parse_id("tome", id)?;
    let store = open_store(db_path).await?;
    let tome = store.update_tome(&tome_id, name, description).await?;

    println!("{}", tome.id);
    Ok(())
}
