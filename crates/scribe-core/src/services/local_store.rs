//! Shared local store wrapper used across clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    Database, EntityRepository, LibSqlEntityRepository, LibSqlSyncMetadataRepository,
    MergeSummary, OwnedRecord, ReplaceMode, StoredRecord, SyncMetadataRepository,
};
use crate::models::{
    Archive, ArchiveId, Entry, EntryId, EntryType, RecordSet, SyncConflict, Timestamp, Tome,
    TomeId,
};
use crate::{Error, Result};

/// Thread-safe handle to the local libSQL store.
///
/// Every operation holds the connection lock for its whole duration, so a
/// bulk replacement never interleaves with other writes from this process.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl LocalStore {
    /// Open the store at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::debug!("Opening local store at {}", db_path.display());
        let db = Database::open(&db_path).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Path of the backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Fetch any record by id.
    pub async fn get<R: StoredRecord>(&self, id: &R::Id) -> Result<Option<R>> {
        let db = self.db.lock().await;
        let repo = LibSqlEntityRepository::new(db.connection());
        repo.get(id).await
    }

    /// Insert a record, or replace it when strictly newer.
    pub async fn upsert_if_newer<R: StoredRecord>(&self, record: &R) -> Result<bool> {
        let db = self.db.lock().await;
        let repo = LibSqlEntityRepository::new(db.connection());
        repo.upsert_if_newer(record).await
    }

    /// Remove a record and its descendants.
    pub async fn delete<R: StoredRecord>(&self, id: &R::Id) -> Result<bool> {
        let db = self.db.lock().await;
        let repo = LibSqlEntityRepository::new(db.connection());
        let removed = repo.delete::<R>(id).await?;
        if removed {
            tracing::debug!("Deleted {} {id}", R::KIND);
        }
        Ok(removed)
    }

    /// Records owned by `owner`, newest first.
    pub async fn list_by_owner<R: OwnedRecord>(&self, owner: &R::OwnerId) -> Result<Vec<R>> {
        let db = self.db.lock().await;
        let repo = LibSqlEntityRepository::new(db.connection());
        repo.list_by_owner(owner).await
    }

    /// Every record of a kind, newest first.
    pub async fn list_all<R: StoredRecord>(&self) -> Result<Vec<R>> {
        let db = self.db.lock().await;
        let repo = LibSqlEntityRepository::new(db.connection());
        repo.list_all().await
    }

    /// Create a new archive.
    pub async fn create_archive(&self, name: &str, description: &str) -> Result<Archive> {
        let archive = Archive::new(required_name(name)?, description.trim());
        self.upsert_if_newer(&archive).await?;
        Ok(archive)
    }

    /// Create a new tome inside an existing archive.
    pub async fn create_tome(
        &self,
        archive_id: &ArchiveId,
        name: &str,
        description: &str,
    ) -> Result<Tome> {
        if self.get::<Archive>(archive_id).await?.is_none() {
            return Err(Error::NotFound(format!("archive {archive_id}")));
        }

        let tome = Tome::new(*archive_id, required_name(name)?, description.trim());
        self.upsert_if_newer(&tome).await?;
        Ok(tome)
    }

    /// Create a new entry inside an existing tome.
    pub async fn create_entry(
        &self,
        tome_id: &TomeId,
        name: &str,
        content: &str,
        entry_type: EntryType,
    ) -> Result<Entry> {
        if self.get::<Tome>(tome_id).await?.is_none() {
            return Err(Error::NotFound(format!("tome {tome_id}")));
        }

        let entry = Entry::new(*tome_id, required_name(name)?, content).with_type(entry_type);
        self.upsert_if_newer(&entry).await?;
        Ok(entry)
    }

    /// Rename an archive and/or replace its description.
    pub async fn update_archive(
        &self,
        id: &ArchiveId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Archive> {
        if name.is_none() && description.is_none() {
            return Err(nothing_to_change());
        }

        let mut archive = self
            .get::<Archive>(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("archive {id}")))?;

        if let Some(name) = name {
            archive.rename(required_name(name)?);
        }
        if let Some(description) = description {
            archive.set_description(description.trim());
        }

        self.save(&archive).await?;
        Ok(archive)
    }

    /// Rename a tome and/or replace its description.
    pub async fn update_tome(
        &self,
        id: &TomeId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Tome> {
        if name.is_none() && description.is_none() {
            return Err(nothing_to_change());
        }

        let mut tome = self
            .get::<Tome>(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("tome {id}")))?;

        if let Some(name) = name {
            tome.rename(required_name(name)?);
        }
        if let Some(description) = description {
            tome.set_description(description.trim());
        }

        self.save(&tome).await?;
        Ok(tome)
    }

    /// Apply edits to an entry.
    pub async fn update_entry(
        &self,
        id: &EntryId,
        name: Option<&str>,
        content: Option<&str>,
        entry_type: Option<EntryType>,
    ) -> Result<Entry> {
        if name.is_none() && content.is_none() && entry_type.is_none() {
            return Err(nothing_to_change());
        }

        let mut entry = self
            .get::<Entry>(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("entry {id}")))?;

        if let Some(name) = name {
            entry.rename(required_name(name)?);
        }
        if let Some(content) = content {
            entry.set_content(content);
        }
        if let Some(entry_type) = entry_type {
            entry.set_entry_type(entry_type);
        }

        self.save(&entry).await?;
        Ok(entry)
    }

    /// Every archive, tome and entry.
    pub async fn snapshot(&self) -> Result<RecordSet> {
        let db = self.db.lock().await;
        let repo = LibSqlEntityRepository::new(db.connection());
        repo.load_snapshot().await
    }

    /// Replace the whole hierarchy with `incoming`.
    pub async fn replace_all(&self, incoming: &RecordSet, mode: ReplaceMode) -> Result<MergeSummary> {
        let db = self.db.lock().await;
        let repo = LibSqlEntityRepository::new(db.connection());
        repo.replace_all(incoming, mode).await
    }

    /// Roll back a transaction left open by an interrupted replacement.
    pub async fn rollback_dangling(&self) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlEntityRepository::new(db.connection());
        repo.rollback_dangling().await
    }

    /// List recently resolved sync conflicts.
    pub async fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let db = self.db.lock().await;
        let repo = LibSqlEntityRepository::new(db.connection());
        repo.list_conflicts(limit).await
    }

    /// Last successful sync for `user_id`.
    pub async fn last_synced_at(&self, user_id: &str) -> Result<Option<Timestamp>> {
        let db = self.db.lock().await;
        let repo = LibSqlSyncMetadataRepository::new(db.connection());
        repo.last_synced_at(user_id).await
    }

    /// Record a successful sync for `user_id`.
    pub async fn set_last_synced_at(&self, user_id: &str, at: Timestamp) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlSyncMetadataRepository::new(db.connection());
        repo.set_last_synced_at(user_id, at).await
    }

    async fn save<R: StoredRecord>(&self, record: &R) -> Result<()> {
        if self.upsert_if_newer(record).await? {
            Ok(())
        } else {
            Err(Error::Database(format!(
                "{} {} was modified concurrently",
                R::KIND,
                record.id()
            )))
        }
    }
}

fn nothing_to_change() -> Error {
    Error::InvalidInput("nothing to change".to_string())
}

fn required_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        Err(Error::InvalidInput("name cannot be empty".to_string()))
    } else {
        Ok(name)
    }
}
