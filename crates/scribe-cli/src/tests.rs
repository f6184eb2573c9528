use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use pretty_assertions::assert_eq;
use scribe_core::config::SyncSettings;
use scribe_core::db::MergeSummary;
use scribe_core::sync::{DownloadOutcome, FullSyncReport, SyncStatus};
use scribe_core::{
    Archive, ArchiveId, EntityKind, Entry, EntryType, RecordCounts, SyncConflict, Timestamp,
    TomeId,
};

use crate::cli::{Cli, Commands, EntryCommands, RecordKind, SyncCommands};
use crate::commands::common::{
    format_relative_time, format_sync_conflict_lines, format_sync_timestamp, open_orchestrator,
    open_store, parse_id, preview, record_to_list_item, resolve_db_path, Listable,
};
use crate::commands::delete::run_delete;
use crate::commands::entry::{format_entry_lines, run_entry_edit, EntryEdits};
use crate::commands::status::format_status_lines;
use crate::commands::sync::describe_full_sync;
use crate::error::CliError;

#[test]
fn format_relative_time_units() {
    let now = 10_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
}

#[test]
fn preview_truncates_with_ellipsis() {
    assert_eq!(
        preview("This is a very long sentence that should be shortened", 20),
        "This is a very lo..."
    );
    assert_eq!(preview("first line\nsecond line", 40), "first line");
}

#[test]
fn format_sync_timestamp_returns_utc_label() {
    assert_eq!(
        format_sync_timestamp(Timestamp::from_millis(0)),
        "1970-01-01 00:00:00 UTC"
    );
}

#[test]
fn format_sync_conflict_lines_include_key_fields() {
    let conflicts = vec![SyncConflict {
        id: 1,
        entity_kind: EntityKind::Entry,
        record_id: "11111111-1111-7111-8111-111111111111".to_string(),
        local_updated_at: Timestamp::from_millis(200),
        incoming_updated_at: Timestamp::from_millis(100),
        resolved_at: Timestamp::from_millis(300),
        strategy: "lww".to_string(),
    }];

    let rendered = format_sync_conflict_lines(&conflicts);
    assert_eq!(rendered.len(), 1);
    assert!(rendered[0].contains("lww"));
    assert!(rendered[0].contains("entry=11111111-1111-7111-8111-111111111111"));
    assert!(rendered[0].contains("local=1970-01-01T00:00:00.200Z"));
    assert!(rendered[0].contains("incoming=1970-01-01T00:00:00.100Z"));
}

#[test]
fn parse_id_rejects_garbage() {
    let err = parse_id::<ArchiveId>("archive", "not-an-id").unwrap_err();
    assert!(matches!(err, CliError::InvalidId { kind: "archive", .. }));

    let id = ArchiveId::new();
    assert_eq!(
        parse_id::<ArchiveId>("archive", &format!(" {id} ")).unwrap(),
        id
    );
}

#[test]
fn db_path_prefers_flag_then_environment() {
    let settings = SyncSettings {
        db_path: Some(PathBuf::from("/tmp/from-env.db")),
        ..SyncSettings::default()
    };

    assert_eq!(
        resolve_db_path(Some(PathBuf::from("/tmp/flag.db")), &settings).unwrap(),
        PathBuf::from("/tmp/flag.db")
    );
    assert_eq!(
        resolve_db_path(None, &settings).unwrap(),
        PathBuf::from("/tmp/from-env.db")
    );
}

#[test]
fn entry_list_detail_shows_type_and_preview() {
    let entry = Entry::new(TomeId::new(), "Kickoff", "Agenda\nmore").with_type(EntryType::Meeting);
    assert_eq!(entry.detail(), "[meeting] Agenda");

    let item = record_to_list_item(&entry);
    assert_eq!(item.name, "Kickoff");
    assert_eq!(item.relative_time, "just now");

    let archive = Archive::new("Work", "");
    assert_eq!(archive.detail(), "");
}

#[test]
fn entry_lines_include_metadata_and_content() {
    let entry = Entry::new(TomeId::new(), "Notes", "line 1\nline 2");
    let lines = format_entry_lines(&entry);

    assert_eq!(lines[0], "Notes [generic]");
    assert!(lines[1].contains(&entry.id.to_string()));
    assert_eq!(&lines[lines.len() - 2..], ["line 1", "line 2"]);
}

#[test]
fn status_lines_render_never_and_none() {
    let lines = format_status_lines(&SyncStatus {
        is_ready: true,
        ..SyncStatus::default()
    });
    assert_eq!(lines[0], "ready:        yes");
    assert_eq!(lines[3], "last synced:  never");
    assert_eq!(lines[4], "error:        none");
}

#[test]
fn full_sync_description_mentions_both_directions() {
    let uploaded = RecordCounts {
        archives: 1,
        tomes: 0,
        entries: 2,
    };
    let applied = FullSyncReport {
        uploaded,
        downloaded: DownloadOutcome::Applied(MergeSummary::default()),
    };
    assert!(describe_full_sync(&applied).starts_with("Uploaded 1 archives, 0 tomes, 2 entries; downloaded"));

    let skipped = FullSyncReport {
        uploaded,
        downloaded: DownloadOutcome::Skipped,
    };
    assert!(describe_full_sync(&skipped).contains("download skipped"));
}

#[test]
fn cli_parses_entry_type_and_default_sync() {
    let cli = Cli::try_parse_from([
        "scribe", "entry", "add", "--tome", "t", "Spec", "--type", "design",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Entry {
            command: EntryCommands::Add {
                entry_type: EntryType::Design,
                ..
            }
        }
    ));

    let cli = Cli::try_parse_from(["scribe", "sync"]).unwrap();
    assert!(matches!(cli.command, Commands::Sync { command: None }));

    let cli = Cli::try_parse_from(["scribe", "sync", "conflicts", "--json"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Sync {
            command: Some(SyncCommands::Conflicts {
                limit: 10,
                json: true
            })
        }
    ));

    assert!(Cli::try_parse_from(["scribe", "entry", "add", "--tome", "t", "x", "--type", "poem"]).is_err());
}

#[test]
fn archive_and_tome_edit_require_a_change() {
    for kind in ["archive", "tome"] {
        assert!(Cli::try_parse_from(["scribe", kind, "edit", "some-id"]).is_err());
        assert!(Cli::try_parse_from(["scribe", kind, "edit", "some-id", "--name", "New"]).is_ok());
        assert!(Cli::try_parse_from(["scribe", kind, "edit", "some-id", "-d", "notes"]).is_ok());
        assert!(Cli::try_parse_from([
            "scribe", kind, "edit", "some-id", "--name", "New", "-d", "notes"
        ])
        .is_ok());
    }
}

#[tokio::test(flavor = "current_thread")]
async fn delete_reports_missing_records() {
    let db_path = unique_test_db_path();

    let err = run_delete(RecordKind::Tome, &TomeId::new().to_string(), &db_path)
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::NotFound(_)));

    cleanup_db_files(&db_path);
}

#[tokio::test(flavor = "current_thread")]
async fn delete_removes_archive_and_children() {
    let db_path = unique_test_db_path();
    let store = open_store(&db_path).await.unwrap();
    let archive = store.create_archive("Work", "").await.unwrap();
    let tome = store.create_tome(&archive.id, "Specs", "").await.unwrap();

    run_delete(RecordKind::Archive, &archive.id.to_string(), &db_path)
        .await
        .unwrap();

    assert!(store.get::<Archive>(&archive.id).await.unwrap().is_none());
    assert!(store.get::<scribe_core::Tome>(&tome.id).await.unwrap().is_none());

    cleanup_db_files(&db_path);
}

#[tokio::test(flavor = "current_thread")]
async fn entry_edit_applies_flags() {
    let db_path = unique_test_db_path();
    let store = open_store(&db_path).await.unwrap();
    let archive = store.create_archive("Work", "").await.unwrap();
    let tome = store.create_tome(&archive.id, "Specs", "").await.unwrap();
    let entry = store
        .create_entry(&tome.id, "Draft", "", EntryType::Generic)
        .await
        .unwrap();

    let edits = EntryEdits {
        name: Some("Final".to_string()),
        content: Some("body".to_string()),
        entry_type: Some(EntryType::Specification),
    };
    run_entry_edit(&entry.id.to_string(), edits, &db_path)
        .await
        .unwrap();

    let stored = store.get::<Entry>(&entry.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Final");
    assert_eq!(stored.content, "body");
    assert_eq!(stored.entry_type, EntryType::Specification);
    assert!(stored.updated_at > entry.updated_at);

    cleanup_db_files(&db_path);
}

#[tokio::test(flavor = "current_thread")]
async fn sync_requires_endpoint_and_token() {
    let db_path = unique_test_db_path();

    let err = open_orchestrator(&SyncSettings::default(), &db_path)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, CliError::SyncNotConfigured));

    let without_token = SyncSettings {
        endpoint: Some("http://127.0.0.1:9".to_string()),
        ..SyncSettings::default()
    };
    let err = open_orchestrator(&without_token, &db_path).await.err().unwrap();
    assert!(matches!(err, CliError::SyncNotConfigured));

    cleanup_db_files(&db_path);
}

fn unique_test_db_path() -> PathBuf {
    static NEXT_TEST_DB_ID: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    let sequence = NEXT_TEST_DB_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("scribe-cli-test-{timestamp}-{sequence}.db"))
}

fn cleanup_db_files(path: &PathBuf) {
    // On Windows, libsql can keep file handles alive briefly after drop.
    if cfg!(windows) {
        return;
    }

    let _ = std::fs::remove_file(path);
    let _ = std::fs::remove_file(path.with_extension("db-shm"));
    let _ = std::fs::remove_file(path.with_extension("db-wal"));
}
