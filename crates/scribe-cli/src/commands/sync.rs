use std::path::Path;

use scribe_core::config::SyncSettings;
use scribe_core::sync::{DownloadOutcome, FullSyncReport};

use crate::commands::common::{
    format_sync_conflict_lines, open_orchestrator, open_store, sync_conflict_to_item,
    SyncConflictItem,
};
use crate::error::CliError;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncDirection {
    Full,
    Up,
    Down,
}

pub async fn run_sync(
    direction: SyncDirection,
    settings: &SyncSettings,
    db_path: &Path,
) -> Result<(), CliError> {
    let orchestrator = open_orchestrator(settings, db_path).await?;

    match direction {
        SyncDirection::Full => {
            let report = orchestrator.full_sync().await?;
            println!("{}", describe_full_sync(&report));
        }
        SyncDirection::Up => {
            let uploaded = orchestrator.sync_to_remote().await?;
            println!("Uploaded {uploaded}");
        }
        SyncDirection::Down => {
            let outcome = orchestrator.sync_from_remote().await?;
            println!("{}", describe_download(outcome));
        }
    }
    Ok(())
}

pub fn describe_full_sync(report: &FullSyncReport) -> String {
    match report.downloaded {
        DownloadOutcome::Applied(summary) => {
            format!("Uploaded {}; downloaded {summary}", report.uploaded)
        }
        DownloadOutcome::Skipped => format!(
            "Uploaded {}; download skipped: another download is running",
            report.uploaded
        ),
    }
}

pub fn describe_download(outcome: DownloadOutcome) -> String {
    match outcome {
        DownloadOutcome::Applied(summary) => format!("Downloaded {summary}"),
        DownloadOutcome::Skipped => "Download skipped: another download is running".to_string(),
    }
}

pub async fn run_sync_conflicts(
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let conflicts = store.list_conflicts(limit).await?;

    if as_json {
        let json_items = conflicts
            .iter()
            .map(sync_conflict_to_item)
            .collect::<Vec<SyncConflictItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No sync conflicts recorded.");
        return Ok(());
    }

    for line in format_sync_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}
