//! Database layer for StackScribe

mod connection;
mod entity_repository;
mod migrations;
mod record;
mod sync_metadata_repository;

pub use connection::{Database, DEFAULT_BUSY_TIMEOUT};
pub use entity_repository::{EntityRepository, LibSqlEntityRepository, MergeSummary, ReplaceMode};
pub use record::{OwnedRecord, StoredRecord};
pub use sync_metadata_repository::{
    LibSqlSyncMetadataRepository, SyncMetadataRepository, LAST_SYNCED_AT_KEY,
};
