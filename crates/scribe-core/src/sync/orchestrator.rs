//! Sync orchestration
//!
//! Lifecycle: `Idle -> Initializing -> Ready`, with `is_syncing` raised around
//! every sync call and `error` carried alongside. A failed sync still leaves
//! the orchestrator `Ready`, so clients keep working against the local store
//! while the remote is unreachable.
//!
//! Concurrency guards:
//! - initialization runs once per orchestrator, concurrent waiters share it
//! - `full_sync` callers join the run already in flight and see its result
//! - `sync_from_remote` is a logged no-op while another download is running

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::OnceCell;

use super::retry::{retry_with_backoff, RetryError, RetryPolicy};
use super::status::{StatusBroadcaster, Subscription, SyncStatus};
use super::{IdentityProvider, RemoteTransport, SyncResult, SyncStore};
use crate::db::{MergeSummary, ReplaceMode};
use crate::models::{RecordCounts, RecordSet, Timestamp};

/// Result of a download-direction sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The remote set was merged into the local store
    Applied(MergeSummary),
    /// Another download was already running
    Skipped,
}

/// Result of [`SyncOrchestrator::full_sync`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullSyncReport {
    pub uploaded: RecordCounts,
    pub downloaded: DownloadOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Initializing,
    Ready,
}

#[derive(Debug)]
struct State {
    phase: Phase,
    active_syncs: usize,
    error: Option<String>,
    last_synced_at: Option<Timestamp>,
}

impl State {
    fn snapshot(&self) -> SyncStatus {
        SyncStatus {
            is_initializing: self.phase == Phase::Initializing,
            is_syncing: self.active_syncs > 0,
            is_ready: self.phase == Phase::Ready,
            error: self.error.clone(),
            last_synced_at: self.last_synced_at,
        }
    }
}

type SharedFullSync = Shared<BoxFuture<'static, SyncResult<FullSyncReport>>>;

struct Inner<S, T, I> {
    store: S,
    transport: T,
    identity: I,
    policy: RetryPolicy,
    broadcaster: StatusBroadcaster,
    /// Held across mutate-and-notify so subscribers see changes in order
    delivery: Mutex<()>,
    state: Mutex<State>,
    initialized: OnceCell<()>,
    full_sync: Mutex<Option<(u64, SharedFullSync)>>,
    full_sync_generation: AtomicU64,
    downloading: AtomicBool,
}

/// Coordinates uploads and downloads between a local store and a remote transport.
///
/// Cheap to clone; clones share state, guards and subscribers.
pub struct SyncOrchestrator<S, T, I> {
    inner: Arc<Inner<S, T, I>>,
}

impl<S, T, I> Clone for SyncOrchestrator<S, T, I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the download flag when the download ends, however it ends
struct DownloadGuard<'a>(&'a AtomicBool);

impl<'a> DownloadGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for DownloadGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S, T, I> SyncOrchestrator<S, T, I>
where
    S: SyncStore + 'static,
    T: RemoteTransport + 'static,
    I: IdentityProvider + 'static,
{
    /// Create an orchestrator with the default retry policy
    pub fn new(store: S, transport: T, identity: I) -> Self {
        Self::with_policy(store, transport, identity, RetryPolicy::default())
    }

    pub fn with_policy(store: S, transport: T, identity: I, policy: RetryPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                transport,
                identity,
                policy,
                broadcaster: StatusBroadcaster::new(),
                delivery: Mutex::new(()),
                state: Mutex::new(State {
                    phase: Phase::Idle,
                    active_syncs: 0,
                    error: None,
                    last_synced_at: None,
                }),
                initialized: OnceCell::new(),
                full_sync: Mutex::new(None),
                full_sync_generation: AtomicU64::new(0),
                downloading: AtomicBool::new(false),
            }),
        }
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Current status snapshot
    pub fn status(&self) -> SyncStatus {
        lock(&self.inner.state).snapshot()
    }

    /// Register a listener for status changes
    pub fn subscribe(
        &self,
        listener: impl Fn(&SyncStatus) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.broadcaster.subscribe(listener)
    }

    /// Run the initial download once and wait for it.
    ///
    /// Concurrent and later callers share the first attempt. Never fails: a
    /// failed attempt still ends `Ready`, with the message in `error`.
    pub async fn wait_for_initialization(&self) -> SyncStatus {
        self.inner
            .initialized
            .get_or_init(|| async {
                // A sync that finished earlier already made us ready; never go back.
                self.update(|state| {
                    if state.phase == Phase::Idle {
                        state.phase = Phase::Initializing;
                    }
                });
                tracing::info!("Initializing sync");

                match self.sync_from_remote().await {
                    Ok(DownloadOutcome::Applied(summary)) => {
                        tracing::info!("Initial sync complete: {summary}");
                    }
                    Ok(DownloadOutcome::Skipped) => {}
                    Err(error) => tracing::error!("Initial sync failed: {error}"),
                }

                self.update(|state| state.phase = Phase::Ready);
            })
            .await;

        self.status()
    }

    /// Upload every local record, then record the watermark
    pub async fn sync_to_remote(&self) -> SyncResult<RecordCounts> {
        self.tracked(async {
            let credentials = self.inner.identity.credentials().await?;
            let records = self.inner.store.load_snapshot().await?;
            let counts = records.counts();

            tracing::info!("Uploading {counts} for {}", credentials.user_id);
            let ack = self.inner.transport.upload(&credentials, &records).await?;
            if let Some(message) = ack.message.as_deref() {
                tracing::debug!("Upload acknowledged: {message}");
            }

            self.mark_synced(&credentials.user_id).await?;
            Ok(counts)
        })
        .await
    }

    /// Download the remote set and merge it into the local store.
    ///
    /// Returns [`DownloadOutcome::Skipped`] when another download is in flight.
    pub async fn sync_from_remote(&self) -> SyncResult<DownloadOutcome> {
        let Some(_guard) = DownloadGuard::acquire(&self.inner.downloading) else {
            tracing::warn!("Download already in progress; skipping");
            return Ok(DownloadOutcome::Skipped);
        };

        self.tracked(async {
            let credentials = self.inner.identity.credentials().await?;
            let incoming = self.inner.transport.download(&credentials).await?;
            tracing::info!(
                "Downloaded {} for {}",
                incoming.counts(),
                credentials.user_id
            );

            let summary = self.apply_download(&incoming).await?;
            if summary.conflicts > 0 {
                tracing::info!("Kept {} newer local records", summary.conflicts);
            }

            self.mark_synced(&credentials.user_id).await?;
            Ok(DownloadOutcome::Applied(summary))
        })
        .await
    }

    /// Upload, then download. Concurrent callers join the run in flight.
    pub async fn full_sync(&self) -> SyncResult<FullSyncReport> {
        let (generation, run) = {
            let mut slot = lock(&self.inner.full_sync);
            if let Some((generation, run)) = slot.as_ref() {
                tracing::info!("Full sync already in progress; joining");
                (*generation, run.clone())
            } else {
                let generation = self
                    .inner
                    .full_sync_generation
                    .fetch_add(1, Ordering::Relaxed);
                let this = self.clone();
                let run = async move { this.run_full_sync().await }.boxed().shared();
                *slot = Some((generation, run.clone()));
                (generation, run)
            }
        };

        let result = run.await;

        let mut slot = lock(&self.inner.full_sync);
        if matches!(slot.as_ref(), Some((current, _)) if *current == generation) {
            *slot = None;
        }
        result
    }

    async fn run_full_sync(&self) -> SyncResult<FullSyncReport> {
        self.tracked(async {
            tracing::info!("Starting full sync");
            let uploaded = self.sync_to_remote().await?;
            let downloaded = self.sync_from_remote().await?;
            tracing::info!("Full sync complete");
            Ok(FullSyncReport {
                uploaded,
                downloaded,
            })
        })
        .await
    }

    /// Merge a downloaded set, retrying contention before falling back to an
    /// unguarded replace.
    async fn apply_download(&self, incoming: &RecordSet) -> SyncResult<MergeSummary> {
        let store = &self.inner.store;
        let policy = &self.inner.policy;

        let result = retry_with_backoff(policy, crate::Error::is_locked, |_| {
            replace_in_transaction(store, incoming)
        })
        .await;

        match result {
            Ok(summary) => Ok(summary),
            Err(RetryError::Fatal { error, .. }) => Err(error.into()),
            Err(RetryError::Exhausted {
                attempts,
                consecutive_retryable,
                last,
            }) => {
                if consecutive_retryable < policy.fallback_after {
                    return Err(last.into());
                }

                tracing::warn!(
                    "Store still locked after {attempts} attempts ({last}); replacing without a transaction"
                );
                store.rollback_dangling().await?;
                Ok(store.replace_all(incoming, ReplaceMode::Unguarded).await?)
            }
        }
    }

    async fn mark_synced(&self, user_id: &str) -> SyncResult<()> {
        let now = Timestamp::now();
        self.inner.store.set_last_synced_at(user_id, now).await?;
        self.update(|state| state.last_synced_at = Some(now));
        Ok(())
    }

    /// Raise `is_syncing` around `operation` and record its outcome
    async fn tracked<R>(
        &self,
        operation: impl std::future::Future<Output = SyncResult<R>>,
    ) -> SyncResult<R> {
        self.update(|state| state.active_syncs += 1);
        let result = operation.await;

        self.update(|state| {
            state.active_syncs = state.active_syncs.saturating_sub(1);
            if state.phase != Phase::Initializing {
                state.phase = Phase::Ready;
            }
            match &result {
                Ok(_) => state.error = None,
                Err(error) => state.error = Some(error.to_string()),
            }
        });

        if let Err(error) = &result {
            tracing::error!("Sync failed: {error}");
        }
        result
    }

    /// Mutate state and notify subscribers when the snapshot changed
    fn update(&self, change: impl FnOnce(&mut State)) {
        let _delivery = lock(&self.inner.delivery);
        let (before, after) = {
            let mut state = lock(&self.inner.state);
            let before = state.snapshot();
            change(&mut state);
            (before, state.snapshot())
        };

        if before != after {
            self.inner.broadcaster.notify(&after);
        }
    }
}

async fn replace_in_transaction<S: SyncStore>(
    store: &S,
    incoming: &RecordSet,
) -> crate::Result<MergeSummary> {
    store.rollback_dangling().await?;
    store.replace_all(incoming, ReplaceMode::Transactional).await
}
