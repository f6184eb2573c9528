//! scribe-core - Core library for StackScribe
//!
//! This crate contains the shared models, the libSQL entity store, and the
//! sync engine used by every StackScribe interface (CLI, server, desktop).

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod sync;

pub use error::{Error, Result};
pub use models::{
    Archive, ArchiveId, Entry, EntryId, EntryType, EntityKind, RecordCounts, RecordSet,
    SyncConflict, Timestamp, Tome, TomeId,
};
pub use services::LocalStore;
