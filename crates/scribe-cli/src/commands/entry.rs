use std::path::Path;

use scribe_core::{Entry, EntryId, EntryType, TomeId};

use crate::commands::common::{
    capture_editor_input_with_initial, format_sync_timestamp, open_store, parse_id, print_records,
    read_piped_stdin,
};
use crate::error::CliError;

/// Field changes requested by `scribe entry edit`
#[derive(Debug, Default)]
pub struct EntryEdits {
    pub name: Option<String>,
    pub content: Option<String>,
    pub entry_type: Option<EntryType>,
}

impl EntryEdits {
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.content.is_none() && self.entry_type.is_none()
    }
}

pub async fn run_entry_add(
    tome_id: &str,
    name: &str,
    content: Option<&str>,
    entry_type: EntryType,
    db_path: &Path,
) -> Result<(), CliError> {
    let tome_id: TomeId = parse_id("tome", tome_id)?;
    let content = match content {
        Some(content) => content.to_string(),
        None => read_piped_stdin()?.unwrap_or_default(),
    };

    let store = open_store(db_path).await?;
    let entry = store
        .create_entry(&tome_id, name, &content, entry_type)
        .await?;

    println!("{}", entry.id);
    Ok(())
}

pub async fn run_entry_list(tome_id: &str, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let tome_id: TomeId = parse_id("tome", tome_id)?;
    let store = open_store(db_path).await?;
    let entries = store.list_by_owner::<Entry>(&tome_id).await?;

    print_records(&entries, as_json, "No entries in this tome.")
}

pub async fn run_entry_show(id: &str, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let entry_id: EntryId = parse_id("entry", id)?;
    let store = open_store(db_path).await?;
    let entry = store
        .get::<Entry>(&entry_id)
        .await?
        .ok_or_else(|| CliError::NotFound(format!("entry {entry_id}")))?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        for line in format_entry_lines(&entry) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn run_entry_edit(id: &str, mut edits: EntryEdits, db_path: &Path) -> Result<(), CliError> {
    let entry_id: EntryId = parse_id("entry", id)?;
    let store = open_store(db_path).await?;

    if edits.is_empty() {
        let entry = store
            .get::<Entry>(&entry_id)
            .await?
            .ok_or_else(|| CliError::NotFound(format!("entry {entry_id}")))?;
        let edited = capture_editor_input_with_initial(&entry.content)?;
        if edited == entry.content {
            println!("No changes");
            return Ok(());
        }
        edits.content = Some(edited);
    }

    let entry = store
        .update_entry(
            &entry_id,
            edits.name.as_deref(),
            edits.content.as_deref(),
            edits.entry_type,
        )
        .await?;

    println!("{}", entry.id);
    Ok(())
}

pub fn format_entry_lines(entry: &Entry) -> Vec<String> {
    let mut lines = vec![
        format!("{} [{}]", entry.name, entry.entry_type),
        format!("id:       {}", entry.id),
        format!("tome:     {}", entry.tome_id),
        format!("created:  {}", format_sync_timestamp(entry.created_at)),
        format!("updated:  {}", format_sync_timestamp(entry.updated_at)),
    ];
    if !entry.content.is_empty() {
        lines.push(String::new());
        lines.extend(entry.content.lines().map(str::to_string));
    }
    lines
}
