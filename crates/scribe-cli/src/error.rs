use std::io;

use scribe_core::config::ConfigError;
use scribe_core::sync::SyncError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] scribe_core::Error),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Settings(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid {kind} ID: {value}")]
    InvalidId { kind: &'static str, value: String },
    #[error("{0} not found")]
    NotFound(String),
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Sync is not configured. Set SCRIBE_SYNC_URL and SCRIBE_ACCESS_TOKEN.")]
    SyncNotConfigured,
}
