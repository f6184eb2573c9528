//! Per-user sync bookkeeping

use crate::error::{Error, Result};
use crate::models::Timestamp;
use libsql::Connection;

/// Metadata key holding the last successful sync time
pub const LAST_SYNCED_AT_KEY: &str = "last_synced_at";

/// Trait for sync metadata storage operations (async)
#[allow(async_fn_in_trait)]
pub trait SyncMetadataRepository {
    /// Read a value for `user_id`
    async fn get(&self, user_id: &str, key: &str) -> Result<Option<String>>;

    /// Write a value for `user_id`
    async fn set(&self, user_id: &str, key: &str, value: &str) -> Result<()>;

    /// The watermark for `user_id`, if any sync has completed
    async fn last_synced_at(&self, user_id: &str) -> Result<Option<Timestamp>>;

    /// Persist the watermark for `user_id`
    async fn set_last_synced_at(&self, user_id: &str, at: Timestamp) -> Result<()>;
}

/// libSQL implementation of `SyncMetadataRepository`
pub struct LibSqlSyncMetadataRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSyncMetadataRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SyncMetadataRepository for LibSqlSyncMetadataRepository<'_> {
    async fn get(&self, user_id: &str, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT value FROM sync_metadata WHERE user_id = ?1 AND key = ?2",
                [user_id, key],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    async fn set(&self, user_id: &str, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_metadata (user_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                libsql::params![user_id, key, value, Timestamp::now().as_millis()],
            )
            .await?;
        Ok(())
    }

    async fn last_synced_at(&self, user_id: &str) -> Result<Option<Timestamp>> {
        let Some(raw) = self.get(user_id, LAST_SYNCED_AT_KEY).await? else {
            return Ok(None);
        };
        raw.parse().map(Some).map_err(|error| {
            Error::Database(format!("invalid {LAST_SYNCED_AT_KEY} '{raw}': {error}"))
        })
    }

    async fn set_last_synced_at(&self, user_id: &str, at: Timestamp) -> Result<()> {
        self.set(user_id, LAST_SYNCED_AT_KEY, &at.to_rfc3339()).await
    }
}
