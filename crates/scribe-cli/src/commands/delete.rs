use std::path::Path;

use scribe_core::{Archive, ArchiveId, Entry, EntryId, Tome, TomeId};

use crate::cli::RecordKind;
use crate::commands::common::{open_store, parse_id};
use crate::error::CliError;

pub async fn run_delete(kind: RecordKind, id: &str, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;

    let removed = match kind {
        RecordKind::Archive => {
            let id: ArchiveId = parse_id("archive", id)?;
            store.delete::<Archive>(&id).await?
        }
        RecordKind::Tome => {
            let id: TomeId = parse_id("tome", id)?;
            store.delete::<Tome>(&id).await?
        }
        RecordKind::Entry => {
            let id: EntryId = parse_id("entry", id)?;
            store.delete::<Entry>(&id).await?
        }
    };

    if !removed {
        return Err(CliError::NotFound(format!("{} {}", kind_label(kind), id.trim())));
    }
    println!("{}", id.trim());
    Ok(())
}

pub const fn kind_label(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Archive => "archive",
        RecordKind::Tome => "tome",
        RecordKind::Entry => "entry",
    }
}
