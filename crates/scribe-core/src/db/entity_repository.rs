//! Archive, tome and entry repository
//!
//! Every write path honours last-writer-wins: an incoming copy replaces a
//! stored one only when its `updated_at` is strictly greater. Incoming copies
//! that lose to a strictly newer local copy are written to `sync_conflicts`.

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use std::collections::HashMap;
use std::fmt;

use libsql::{params_from_iter, Connection};

use super::record::{OwnedRecord, StoredRecord};
use crate::error::Result;
use crate::models::{
    Archive, EntityKind, Entry, RecordCounts, RecordSet, SyncConflict, Timestamp, Tome,
    LAST_WRITE_WINS,
};

/// How a bulk replacement is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceMode {
    /// One `BEGIN IMMEDIATE` transaction, rolled back on any failure
    Transactional,
    /// The same statements in autocommit mode
    Unguarded,
}

/// Outcome of a bulk replacement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Records stored after the replacement
    pub written: RecordCounts,
    /// Incoming records for which the local copy was kept (ties included)
    pub kept_local: usize,
    /// Incoming records rejected because the local copy was strictly newer
    pub conflicts: usize,
}

impl fmt::Display for MergeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} stored, {} kept local, {} conflicts",
            self.written, self.kept_local, self.conflicts
        )
    }
}

/// Storage operations over the record hierarchy (async)
#[allow(async_fn_in_trait)]
pub trait EntityRepository {
    /// Fetch a record by id
    async fn get<R: StoredRecord>(&self, id: &R::Id) -> Result<Option<R>>;

    /// Insert, or replace when strictly newer. Returns whether the record was applied.
    async fn upsert_if_newer<R: StoredRecord>(&self, record: &R) -> Result<bool>;

    /// Remove a record and its descendants. Returns whether anything was removed.
    async fn delete<R: StoredRecord>(&self, id: &R::Id) -> Result<bool>;

    /// Records belonging to `owner`, newest first
    async fn list_by_owner<R: OwnedRecord>(&self, owner: &R::OwnerId) -> Result<Vec<R>>;

    /// Every record of a kind, newest first
    async fn list_all<R: StoredRecord>(&self) -> Result<Vec<R>>;

    /// Every record of every kind
    async fn load_snapshot(&self) -> Result<RecordSet>;

    /// Replace the whole local hierarchy with `incoming`, keeping local copies
    /// that are at least as new as their incoming counterpart.
    async fn replace_all(&self, incoming: &RecordSet, mode: ReplaceMode) -> Result<MergeSummary>;

    /// Roll back a transaction left open by an interrupted replacement
    async fn rollback_dangling(&self) -> Result<()>;

    /// Recently logged conflicts, newest first
    async fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>>;
}

/// libSQL implementation of `EntityRepository`
pub struct LibSqlEntityRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlEntityRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn record_conflict(
        &self,
        kind: EntityKind,
        record_id: String,
        local_updated_at: Timestamp,
        incoming_updated_at: Timestamp,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_conflicts (
                    entity_kind, record_id, local_updated_at, incoming_updated_at, resolved_at, strategy
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                libsql::params![
                    kind.as_str(),
                    record_id,
                    local_updated_at.as_millis(),
                    incoming_updated_at.as_millis(),
                    Timestamp::now().as_millis(),
                    LAST_WRITE_WINS
                ],
            )
            .await?;
        Ok(())
    }

    async fn write<R: StoredRecord>(&self, record: &R) -> Result<u64> {
        let rows = self
            .conn
            .execute(&upsert_sql::<R>(), params_from_iter(record.to_values()))
            .await?;
        Ok(rows)
    }

    /// Pick the surviving copy of every incoming record
    async fn resolve<R: StoredRecord>(
        &self,
        local: &[R],
        incoming: &[R],
        summary: &mut MergeSummary,
    ) -> Result<Vec<R>> {
        let local: HashMap<R::Id, &R> = local.iter().map(|record| (record.id(), record)).collect();
        let mut resolved = Vec::with_capacity(incoming.len());

        for record in incoming {
            let Some(existing) = local.get(&record.id()) else {
                resolved.push(record.clone());
                continue;
            };

            if existing.updated_at() < record.updated_at() {
                resolved.push(record.clone());
                continue;
            }

            summary.kept_local += 1;
            if existing.updated_at() > record.updated_at() {
                summary.conflicts += 1;
                tracing::debug!(
                    "Keeping newer local {} {} ({} > {})",
                    R::KIND,
                    record.id(),
                    existing.updated_at(),
                    record.updated_at()
                );
                self.record_conflict(
                    R::KIND,
                    record.id().to_string(),
                    existing.updated_at(),
                    record.updated_at(),
                )
                .await?;
            }
            resolved.push((*existing).clone());
        }

        Ok(resolved)
    }

    async fn replace_all_statements(&self, incoming: &RecordSet) -> Result<MergeSummary> {
        let local = self.load_snapshot().await?;
        let mut summary = MergeSummary::default();

        let archives = self
            .resolve(&local.archives, &incoming.archives, &mut summary)
            .await?;
        let tomes = self
            .resolve(&local.tomes, &incoming.tomes, &mut summary)
            .await?;
        let entries = self
            .resolve(&local.entries, &incoming.entries, &mut summary)
            .await?;

        // Children first so immediate foreign key checks hold in autocommit mode
        for kind in EntityKind::ALL.iter().rev() {
            self.conn
                .execute(&format!("DELETE FROM {}", kind.table()), ())
                .await?;
        }

        for archive in &archives {
            self.write(archive).await?;
        }
        for tome in &tomes {
            self.write(tome).await?;
        }
        for entry in &entries {
            self.write(entry).await?;
        }

        summary.written = RecordSet {
            archives,
            tomes,
            entries,
        }
        .counts();
        Ok(summary)
    }
}

impl EntityRepository for LibSqlEntityRepository<'_> {
    async fn get<R: StoredRecord>(&self, id: &R::Id) -> Result<Option<R>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?1",
            R::COLUMNS.join(", "),
            R::KIND.table()
        );
        let mut rows = self.conn.query(&sql, [id.to_string()]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(R::from_row(&row)?))
        } else {
            Ok(None)
        }
    }

    async fn upsert_if_newer<R: StoredRecord>(&self, record: &R) -> Result<bool> {
        if self.write(record).await? > 0 {
            return Ok(true);
        }

        if let Some(existing) = self.get::<R>(&record.id()).await? {
            if existing.updated_at() > record.updated_at() {
                self.record_conflict(
                    R::KIND,
                    record.id().to_string(),
                    existing.updated_at(),
                    record.updated_at(),
                )
                .await?;
            }
        }

        Ok(false)
    }

    async fn delete<R: StoredRecord>(&self, id: &R::Id) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", R::KIND.table());
        let rows = self.conn.execute(&sql, [id.to_string()]).await?;
        Ok(rows > 0)
    }

    async fn list_by_owner<R: OwnedRecord>(&self, owner: &R::OwnerId) -> Result<Vec<R>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1 ORDER BY updated_at DESC, id DESC",
            R::COLUMNS.join(", "),
            R::KIND.table(),
            R::OWNER_COLUMN
        );
        let mut rows = self.conn.query(&sql, [owner.to_string()]).await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(R::from_row(&row)?);
        }
        Ok(records)
    }

    async fn list_all<R: StoredRecord>(&self) -> Result<Vec<R>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY updated_at DESC, id DESC",
            R::COLUMNS.join(", "),
            R::KIND.table()
        );
        let mut rows = self.conn.query(&sql, ()).await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(R::from_row(&row)?);
        }
        Ok(records)
    }

    async fn load_snapshot(&self) -> Result<RecordSet> {
        Ok(RecordSet {
            archives: self.list_all::<Archive>().await?,
            tomes: self.list_all::<Tome>().await?,
            entries: self.list_all::<Entry>().await?,
        })
    }

    async fn replace_all(&self, incoming: &RecordSet, mode: ReplaceMode) -> Result<MergeSummary> {
        if mode == ReplaceMode::Unguarded {
            return self.replace_all_statements(incoming).await;
        }

        self.conn.execute("BEGIN IMMEDIATE", ()).await?;
        if let Err(e) = self.conn.execute("PRAGMA defer_foreign_keys = ON", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }

        let summary = match self.replace_all_statements(incoming).await {
            Ok(summary) => summary,
            Err(e) => {
                self.conn.execute("ROLLBACK", ()).await.ok();
                return Err(e);
            }
        };

        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }

        Ok(summary)
    }

    async fn rollback_dangling(&self) -> Result<()> {
        // Fails harmlessly when no transaction is open
        if self.conn.execute("ROLLBACK", ()).await.is_ok() {
            tracing::debug!("Rolled back a dangling transaction");
        }
        Ok(())
    }

    async fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, entity_kind, record_id, local_updated_at, incoming_updated_at, resolved_at, strategy
                 FROM sync_conflicts
                 ORDER BY resolved_at DESC, id DESC
                 LIMIT ?1",
                [limit as i64],
            )
            .await?;

        let mut conflicts = Vec::new();
        while let Some(row) = rows.next().await? {
            let kind: String = row.get(1)?;
            conflicts.push(SyncConflict {
                id: row.get(0)?,
                entity_kind: kind
                    .parse()
                    .map_err(crate::error::Error::Database)?,
                record_id: row.get(2)?,
                local_updated_at: Timestamp::from_millis(row.get(3)?),
                incoming_updated_at: Timestamp::from_millis(row.get(4)?),
                resolved_at: Timestamp::from_millis(row.get(5)?),
                strategy: row.get(6)?,
            });
        }
        Ok(conflicts)
    }
}

/// `INSERT` that only overwrites an existing row when the incoming copy is newer.
///
/// `INSERT OR REPLACE` would delete the old row first and cascade to children.
fn upsert_sql<R: StoredRecord>() -> String {
    let table = R::KIND.table();
    let placeholders: Vec<String> = (1..=R::COLUMNS.len()).map(|i| format!("?{i}")).collect();
    let updates: Vec<String> = R::COLUMNS
        .iter()
        .skip(1)
        .map(|column| format!("{column} = excluded.{column}"))
        .collect();

    format!(
        "INSERT INTO {table} ({}) VALUES ({}) ON CONFLICT(id) DO UPDATE SET {} WHERE excluded.updated_at > {table}.updated_at",
        R::COLUMNS.join(", "),
        placeholders.join(", "),
        updates.join(", ")
    )
}
