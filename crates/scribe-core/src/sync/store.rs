//! Local side of the sync engine

use async_trait::async_trait;

use crate::db::{MergeSummary, ReplaceMode};
use crate::models::{RecordSet, Timestamp};
use crate::services::LocalStore;
use crate::Result;

/// Store operations the orchestrator needs
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Every local record (upload source)
    async fn load_snapshot(&self) -> Result<RecordSet>;

    /// Replace the local hierarchy with a downloaded set
    async fn replace_all(&self, incoming: &RecordSet, mode: ReplaceMode) -> Result<MergeSummary>;

    /// Roll back a transaction left open by an earlier failed attempt
    async fn rollback_dangling(&self) -> Result<()>;

    async fn last_synced_at(&self, user_id: &str) -> Result<Option<Timestamp>>;

    async fn set_last_synced_at(&self, user_id: &str, at: Timestamp) -> Result<()>;
}

#[async_trait]
impl SyncStore for LocalStore {
    async fn load_snapshot(&self) -> Result<RecordSet> {
        Self::snapshot(self).await
    }

    async fn replace_all(&self, incoming: &RecordSet, mode: ReplaceMode) -> Result<MergeSummary> {
        Self::replace_all(self, incoming, mode).await
    }

    async fn rollback_dangling(&self) -> Result<()> {
        Self::rollback_dangling(self).await
    }

    async fn last_synced_at(&self, user_id: &str) -> Result<Option<Timestamp>> {
        Self::last_synced_at(self, user_id).await
    }

    async fn set_last_synced_at(&self, user_id: &str, at: Timestamp) -> Result<()> {
        Self::set_last_synced_at(self, user_id, at).await
    }
}
