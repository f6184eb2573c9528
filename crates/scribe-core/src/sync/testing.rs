//! In-process doubles for exercising the orchestrator

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Instant;

use super::{
    AccountIdentity, Credentials, RemoteTransport, StaticIdentityProvider, SyncError, SyncResult,
    SyncStore, UploadAck,
};
use crate::db::{MergeSummary, ReplaceMode};
use crate::models::{Archive, Entry, RecordSet, Timestamp, Tome};
use crate::services::LocalStore;
use crate::{Error, Result};

pub fn at(millis: i64) -> Timestamp {
    Timestamp::from_millis(millis)
}

pub fn identity(user_id: &str) -> StaticIdentityProvider {
    StaticIdentityProvider::new(
        AccountIdentity {
            local_account_id: Some(user_id.to_string()),
            ..AccountIdentity::default()
        },
        Some("test-token".to_string()),
    )
}

/// One archive holding one tome holding one entry, all stamped `millis`
pub fn seeded_hierarchy(name: &str, millis: i64) -> (Archive, Tome, Entry) {
    let mut archive = Archive::new(name, "");
    archive.created_at = at(millis);
    archive.updated_at = at(millis);

    let mut tome = Tome::new(archive.id, format!("{name} tome"), "");
    tome.created_at = at(millis);
    tome.updated_at = at(millis);

    let mut entry = Entry::new(tome.id, format!("{name} entry"), "body");
    entry.created_at = at(millis);
    entry.updated_at = at(millis);

    (archive, tome, entry)
}

#[derive(Default)]
struct RemoteState {
    records: RecordSet,
    calls: Vec<&'static str>,
    upload_error: Option<SyncError>,
    download_error: Option<SyncError>,
}

fn upsert_by_id<R: Clone>(existing: &mut Vec<R>, incoming: &[R], same: impl Fn(&R, &R) -> bool) {
    for record in incoming {
        match existing.iter_mut().find(|current| same(current, record)) {
            Some(current) => *current = record.clone(),
            None => existing.push(record.clone()),
        }
    }
}

/// Remote store kept in memory; uploads overwrite by id
#[derive(Clone, Default)]
pub struct FakeRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl FakeRemote {
    pub fn with_records(records: RecordSet) -> Self {
        let remote = Self::default();
        remote.state.lock().unwrap().records = records;
        remote
    }

    pub fn records(&self) -> RecordSet {
        self.state.lock().unwrap().records.clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn upload_count(&self) -> usize {
        self.calls().iter().filter(|call| **call == "upload").count()
    }

    pub fn download_count(&self) -> usize {
        self.calls().iter().filter(|call| **call == "download").count()
    }

    pub fn fail_uploads(&self, error: SyncError) {
        self.state.lock().unwrap().upload_error = Some(error);
    }

    pub fn fail_downloads(&self, error: SyncError) {
        self.state.lock().unwrap().download_error = Some(error);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.upload_error = None;
        state.download_error = None;
    }
}

#[async_trait]
impl RemoteTransport for FakeRemote {
    async fn upload(&self, _credentials: &Credentials, records: &RecordSet) -> SyncResult<UploadAck> {
        self.state.lock().unwrap().calls.push("upload");
        // give concurrent callers a chance to observe the in-flight request
        tokio::task::yield_now().await;

        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.upload_error.clone() {
            return Err(error);
        }
        upsert_by_id(&mut state.records.archives, &records.archives, |a, b| a.id == b.id);
        upsert_by_id(&mut state.records.tomes, &records.tomes, |a, b| a.id == b.id);
        upsert_by_id(&mut state.records.entries, &records.entries, |a, b| a.id == b.id);

        Ok(UploadAck {
            success: true,
            message: Some("Data synced successfully".to_string()),
            synced: Some(records.counts()),
        })
    }

    async fn download(&self, _credentials: &Credentials) -> SyncResult<RecordSet> {
        self.state.lock().unwrap().calls.push("download");
        tokio::task::yield_now().await;

        let state = self.state.lock().unwrap();
        match state.download_error.clone() {
            Some(error) => Err(error),
            None => Ok(state.records.clone()),
        }
    }
}

/// Failure injected into transactional replacements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFault {
    /// Report contention for this many transactional attempts
    LockedFor(u32),
    /// Fail every transactional attempt with a non-retryable error
    Fatal,
}

#[derive(Default)]
struct FaultLog {
    fault: Option<StoreFault>,
    transactional_attempts: Vec<Instant>,
    unguarded_calls: usize,
    rollbacks: usize,
}

/// [`LocalStore`] wrapper that injects store faults and records calls
#[derive(Clone)]
pub struct FlakyStore {
    local: LocalStore,
    log: Arc<Mutex<FaultLog>>,
}

impl FlakyStore {
    pub fn new(local: LocalStore) -> Self {
        Self {
            local,
            log: Arc::default(),
        }
    }

    pub const fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn inject(&self, fault: StoreFault) {
        self.log.lock().unwrap().fault = Some(fault);
    }

    pub fn transactional_attempts(&self) -> Vec<Instant> {
        self.log.lock().unwrap().transactional_attempts.clone()
    }

    pub fn unguarded_calls(&self) -> usize {
        self.log.lock().unwrap().unguarded_calls
    }

    pub fn rollbacks(&self) -> usize {
        self.log.lock().unwrap().rollbacks
    }

    fn injected_failure(&self, mode: ReplaceMode) -> Option<Error> {
        let mut log = self.log.lock().unwrap();
        if mode == ReplaceMode::Unguarded {
            log.unguarded_calls += 1;
            return None;
        }

        log.transactional_attempts.push(Instant::now());
        match log.fault {
            Some(StoreFault::LockedFor(remaining)) if remaining > 0 => {
                log.fault = Some(StoreFault::LockedFor(remaining - 1));
                Some(Error::Locked("database is locked".to_string()))
            }
            Some(StoreFault::Fatal) => Some(Error::Database("disk I/O error".to_string())),
            _ => None,
        }
    }
}

#[async_trait]
impl SyncStore for FlakyStore {
    async fn load_snapshot(&self) -> Result<RecordSet> {
        self.local.snapshot().await
    }

    async fn replace_all(&self, incoming: &RecordSet, mode: ReplaceMode) -> Result<MergeSummary> {
        if let Some(error) = self.injected_failure(mode) {
            return Err(error);
        }
        self.local.replace_all(incoming, mode).await
    }

    async fn rollback_dangling(&self) -> Result<()> {
        self.log.lock().unwrap().rollbacks += 1;
        self.local.rollback_dangling().await
    }

    async fn last_synced_at(&self, user_id: &str) -> Result<Option<Timestamp>> {
        self.local.last_synced_at(user_id).await
    }

    async fn set_last_synced_at(&self, user_id: &str, at: Timestamp) -> Result<()> {
        self.local.set_last_synced_at(user_id, at).await
    }
}
