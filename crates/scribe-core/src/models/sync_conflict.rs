//! Sync conflict model

use serde::{Deserialize, Serialize};

use super::{EntityKind, Timestamp};

/// Strategy name recorded for last-writer-wins resolutions
pub const LAST_WRITE_WINS: &str = "lww";

/// An incoming record that lost to a newer local copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConflict {
    /// Conflict row identifier
    pub id: i64,
    /// Kind of the record involved
    pub entity_kind: EntityKind,
    /// Record involved in the conflict
    pub record_id: String,
    /// Existing row's timestamp when the conflict occurred
    pub local_updated_at: Timestamp,
    /// Incoming row's timestamp that was rejected
    pub incoming_updated_at: Timestamp,
    /// Resolution time
    pub resolved_at: Timestamp,
    /// Resolution strategy name
    pub strategy: String,
}
