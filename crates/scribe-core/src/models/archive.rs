//! Archive model

use serde::{Deserialize, Serialize};

use super::{null_as_empty, ArchiveId, Timestamp};

/// Top-level container of tomes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archive {
    /// Unique identifier
    pub id: ArchiveId,
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

impl Archive {
    /// Create a new archive stamped with the current time
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: ArchiveId::new(),
            name: name.into(),
            description: description.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rename the archive
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_description_becomes_empty() {
        let json = format!(
            r#"{{"id":"{}","name":"Work","description":null,"created_at":"2024-05-01T10:00:00.000Z","updated_at":"2024-05-01T10:00:00.000Z"}}"#,
            ArchiveId::new()
        );
        let archive: Archive = serde_json::from_str(&json).unwrap();
        assert_eq!(archive.description, "");
    }

    #[test]
    fn missing_description_becomes_empty() {
        let json = format!(
            r#"{{"id":"{}","name":"Work","created_at":"2024-05-01T10:00:00.000Z","updated_at":"2024-05-01T10:00:00.000Z"}}"#,
            ArchiveId::new()
        );
        let archive: Archive = serde_json::from_str(&json).unwrap();
        assert_eq!(archive.description, "");
    }

    #[test]
    fn edits_move_updated_at_forward() {
        let mut archive = Archive::new("Work", "");
        let before = archive.updated_at;
        archive.rename("Personal");
        assert_eq!(archive.name, "Personal");
        assert!(archive.updated_at > before);
        assert!(archive.updated_at >= archive.created_at);
    }
}
