//! Sync engine errors

use thiserror::Error;

use crate::config::ConfigError;

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by the sync engine.
///
/// `Clone` so every caller joined onto one in-flight sync observes the same error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// No usable caller identity or token
    #[error("Identity unavailable: {0}")]
    Identity(String),

    #[error("Invalid sync configuration: {0}")]
    Configuration(String),

    /// The request never produced an HTTP response
    #[error("Sync request failed: {0}")]
    Network(String),

    /// The remote answered with a non-success status
    #[error("Sync service rejected the request: {body} ({status})")]
    Rejected { status: u16, body: String },

    #[error("Invalid sync response: {0}")]
    InvalidResponse(String),

    /// Local store contention that outlasted the retry budget
    #[error("Local store is locked: {0}")]
    Locked(String),

    #[error("Local store error: {0}")]
    Store(String),
}

impl SyncError {
    /// Whether the failure came from the remote side (network or HTTP status)
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Rejected { .. })
    }
}

impl From<crate::Error> for SyncError {
    fn from(error: crate::Error) -> Self {
        match error {
            crate::Error::Locked(message) => Self::Locked(message),
            other => Self::Store(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::InvalidResponse(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}

impl From<ConfigError> for SyncError {
    fn from(error: ConfigError) -> Self {
        Self::Configuration(error.to_string())
    }
}
