//! Tome model

use serde::{Deserialize, Serialize};

use super::{null_as_empty, ArchiveId, Timestamp, TomeId};

/// A collection of entries inside an archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tome {
    /// Unique identifier
    pub id: TomeId,
    /// Owning archive
    pub archive_id: ArchiveId,
    /// Display name
    pub name: String,
    /// Free-form description, empty when unset
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    /// Creation time
    pub created_at: Timestamp,
    /// Last modification time
    pub updated_at: Timestamp,
}

impl Tome {
    /// Create a new tome inside `archive_id`
    #[must_use]
    pub fn new(
        archive_id: ArchiveId,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: TomeId::new(),
            archive_id,
            name: name.into(),
            description: description.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rename the tome
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    /// Replace the description
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now_after(self.updated_at);
    }
}
