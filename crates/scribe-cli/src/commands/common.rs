use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use scribe_core::config::SyncSettings;
use scribe_core::sync::{HttpSyncTransport, StaticIdentityProvider, SyncOrchestrator};
use scribe_core::{Archive, Entry, LocalStore, SyncConflict, Timestamp, Tome};
use serde::Serialize;

use crate::error::CliError;

pub type CliOrchestrator = SyncOrchestrator<LocalStore, HttpSyncTransport, StaticIdentityProvider>;

#[derive(Debug, Serialize)]
pub struct RecordListItem {
    pub id: String,
    pub name: String,
    pub detail: String,
    pub created_at: String,
    pub updated_at: String,
    pub relative_time: String,
}

#[derive(Debug, Serialize)]
pub struct SyncConflictItem {
    pub id: i64,
    pub entity_kind: String,
    pub record_id: String,
    pub local_updated_at: String,
    pub incoming_updated_at: String,
    pub resolved_at: String,
    pub strategy: String,
}

/// Fields the list views need from any record kind
pub trait Listable {
    fn id_string(&self) -> String;
    fn name(&self) -> &str;
    /// Description for archives and tomes, type plus preview for entries
    fn detail(&self) -> String;
    fn created_at(&self) -> Timestamp;
    fn updated_at(&self) -> Timestamp;
}

impl Listable for Archive {
    fn id_string(&self) -> String {
        self.id.to_string()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn detail(&self) -> String {
        preview(&self.description, 40)
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }

    fn updated_at(&self) -> Timestamp {
        self.updated_at
    }
}

impl Listable for Tome {
    fn id_string(&self) -> String {
        self.id.to_string()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn detail(&self) -> String {
        preview(&self.description, 40)
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }

    fn updated_at(&self) -> Timestamp {
        self.updated_at
    }
}

impl Listable for Entry {
    fn id_string(&self) -> String {
        self.id.to_string()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn detail(&self) -> String {
        let content = preview(&self.content, 40);
        if content.is_empty() {
            format!("[{}]", self.entry_type)
        } else {
            format!("[{}] {content}", self.entry_type)
        }
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }

    fn updated_at(&self) -> Timestamp {
        self.updated_at
    }
}

pub fn record_to_list_item(record: &impl Listable) -> RecordListItem {
    let now_ms = Utc::now().timestamp_millis();
    RecordListItem {
        id: record.id_string(),
        name: record.name().to_string(),
        detail: record.detail(),
        created_at: record.created_at().to_rfc3339(),
        updated_at: record.updated_at().to_rfc3339(),
        relative_time: format_relative_time(record.updated_at().as_millis(), now_ms),
    }
}

pub fn format_record_lines(records: &[impl Listable]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    records
        .iter()
        .map(|record| {
            let name = preview(record.name(), 30);
            let relative_time = format_relative_time(record.updated_at().as_millis(), now_ms);
            let detail = record.detail();

            if detail.is_empty() {
                format!("{}  {name:<30}  {relative_time}", record.id_string())
            } else {
                format!(
                    "{}  {name:<30}  {relative_time:<10}  {detail}",
                    record.id_string()
                )
            }
        })
        .collect()
}

/// Print records as pretty JSON or one line each
pub fn print_records(records: &[impl Listable], as_json: bool, empty_message: &str) -> Result<(), CliError> {
    if as_json {
        let json_items = records
            .iter()
            .map(record_to_list_item)
            .collect::<Vec<RecordListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if records.is_empty() {
        println!("{empty_message}");
    } else {
        for line in format_record_lines(records) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn sync_conflict_to_item(conflict: &SyncConflict) -> SyncConflictItem {
    SyncConflictItem {
        id: conflict.id,
        entity_kind: conflict.entity_kind.to_string(),
        record_id: conflict.record_id.clone(),
        local_updated_at: conflict.local_updated_at.to_rfc3339(),
        incoming_updated_at: conflict.incoming_updated_at.to_rfc3339(),
        resolved_at: conflict.resolved_at.to_rfc3339(),
        strategy: conflict.strategy.clone(),
    }
}

pub fn format_sync_conflict_lines(conflicts: &[SyncConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {:<4}  {}={}  local={} incoming={}",
                format_sync_timestamp(conflict.resolved_at),
                conflict.strategy,
                conflict.entity_kind,
                conflict.record_id,
                conflict.local_updated_at,
                conflict.incoming_updated_at
            )
        })
        .collect()
}

pub fn format_sync_timestamp(timestamp: Timestamp) -> String {
    timestamp
        .to_datetime()
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string()
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// First line of `text`, whitespace collapsed, cut to `max_chars`
pub fn preview(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn parse_id<T: FromStr>(kind: &'static str, value: &str) -> Result<T, CliError> {
    value.trim().parse().map_err(|_| CliError::InvalidId {
        kind,
        value: value.to_string(),
    })
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    let trimmed = buffer.trim_end();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

/// Open `$VISUAL`/`$EDITOR` on `initial_content` and return the saved text
pub fn capture_editor_input_with_initial(initial_content: &str) -> Result<String, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_entry_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(content.trim_end().to_string())
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => {
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };

            let mut command = Command::new(program);
            command.args(parts).arg(file_path);

            let status = command.status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

pub fn create_temp_entry_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("scribe-entry-{}-{now}.md", std::process::id()))
}

/// `--db-path`, then `SCRIBE_DB_PATH`, then the platform data directory
pub fn resolve_db_path(
    cli_db_path: Option<PathBuf>,
    settings: &SyncSettings,
) -> Result<PathBuf, CliError> {
    match cli_db_path.or_else(|| settings.db_path.clone()) {
        Some(path) => Ok(path),
        None => default_db_path(),
    }
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("stackscribe").join("scribe.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

pub async fn open_store(path: &Path) -> Result<LocalStore, CliError> {
    Ok(LocalStore::open_path(path).await?)
}

/// Build an orchestrator over the local store, or fail when sync is not configured
pub async fn open_orchestrator(
    settings: &SyncSettings,
    db_path: &Path,
) -> Result<CliOrchestrator, CliError> {
    if !settings.remote_enabled() || settings.access_token.is_none() {
        return Err(CliError::SyncNotConfigured);
    }

    let transport = HttpSyncTransport::from_settings(settings)?;
    let identity = StaticIdentityProvider::from_settings(settings);
    let store = open_store(db_path).await?;
    tracing::debug!("Sync endpoint: {}", transport.endpoint());

    Ok(SyncOrchestrator::new(store, transport, identity))
}
