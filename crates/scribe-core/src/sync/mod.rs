//! Synchronization engine
//!
//! The [`SyncOrchestrator`] reconciles the local store with a remote sync
//! service. It is generic over three seams so clients and tests can swap
//! implementations:
//!
//! - [`SyncStore`]: the local side (implemented by [`LocalStore`](crate::services::LocalStore))
//! - [`RemoteTransport`]: the wire (implemented by [`HttpSyncTransport`])
//! - [`IdentityProvider`]: bearer token and watermark partition

mod error;
mod identity;
mod orchestrator;
mod retry;
mod status;
mod store;
mod transport;

#[cfg(test)]
mod testing;

pub use error::{SyncError, SyncResult};
pub use identity::{AccountIdentity, Credentials, IdentityProvider, StaticIdentityProvider};
pub use orchestrator::{DownloadOutcome, FullSyncReport, SyncOrchestrator};
pub use retry::{retry_with_backoff, RetryError, RetryPolicy};
pub use status::{StatusBroadcaster, Subscription, SyncStatus};
pub use store::SyncStore;
pub use transport::{HttpSyncTransport, RemoteTransport, UploadAck};
