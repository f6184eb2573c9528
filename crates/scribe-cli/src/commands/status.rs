use std::path::Path;

use scribe_core::config::SyncSettings;
use scribe_core::sync::SyncStatus;

use crate::commands::common::{format_sync_timestamp, open_orchestrator};
use crate::error::CliError;

pub async fn run_status(as_json: bool, settings: &SyncSettings, db_path: &Path) -> Result<(), CliError> {
    let orchestrator = open_orchestrator(settings, db_path).await?;
    let status = orchestrator.wait_for_initialization().await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        for line in format_status_lines(&status) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn format_status_lines(status: &SyncStatus) -> Vec<String> {
    let yes_no = |flag: bool| if flag { "yes" } else { "no" };
    vec![
        format!("ready:        {}", yes_no(status.is_ready)),
        format!("initializing: {}", yes_no(status.is_initializing)),
        format!("syncing:      {}", yes_no(status.is_syncing)),
        format!(
            "last synced:  {}",
            status
                .last_synced_at
                .map_or_else(|| "never".to_string(), format_sync_timestamp)
        ),
        format!("error:        {}", status.error.as_deref().unwrap_or("none")),
    ]
}
