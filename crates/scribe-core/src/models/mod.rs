//! Data models for StackScribe

mod archive;
mod entry;
mod id;
mod kind;
mod record_set;
mod sync_conflict;
mod timestamp;
mod tome;

use serde::{Deserialize, Deserializer};

pub use archive::Archive;
pub use entry::{Entry, EntryType};
pub use id::{ArchiveId, EntryId, TomeId};
pub use kind::EntityKind;
pub use record_set::{RecordCounts, RecordSet};
pub use sync_conflict::{SyncConflict, LAST_WRITE_WINS};
pub use timestamp::Timestamp;
pub use tome::Tome;

/// Deserialize an optional string, treating `null` as empty.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
