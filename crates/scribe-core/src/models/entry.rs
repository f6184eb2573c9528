//! Entry model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{null_as_empty, EntryId, Timestamp, TomeId};

/// Classification of an entry's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    #[default]
    Generic,
    Requirement,
    Specification,
    Meeting,
    Design,
    Implementation,
    Test,
    /// Any value this build does not know about
    #[serde(other)]
    Other,
}

impl EntryType {
    /// Every known variant
    pub const ALL: [Self; 8] = [
        Self::Generic,
        Self::Requirement,
        Self::Specification,
        Self::Meeting,
        Self::Design,
        Self::Implementation,
        Self::Test,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Requirement => "requirement",
            Self::Specification => "specification",
            Self::Meeting => "meeting",
            Self::Design => "design",
            Self::Implementation => "implementation",
            Self::Test => "test",
            Self::Other => "other",
        }
    }

    /// Lenient parse used for stored values; unknown strings map to `Other`.
    #[must_use]
    pub fn from_stored(value: &str) -> Self {
        value.parse().unwrap_or(Self::Other)
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|kind| kind.as_str()).collect();
                format!("unknown entry type '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// A single document inside a tome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique identifier
    pub id: EntryId,
    /// Owning tome
    pub tome_id: TomeId,
    /// Display name
    pub name: String,
    /// Markdown body
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    /// Content classification
    #[serde(default)]
    pub entry_type: EntryType,
    /// Creation time
    pub created_at: Timestamp,
    /// Last modification time
    pub updated_at: Timestamp,
}

impl Entry {
    /// Create a new generic entry inside `tome_id`
    #[must_use]
    pub fn new(tome_id: TomeId, name: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: EntryId::new(),
            tome_id,
            name: name.into(),
            content: content.into(),
            entry_type: EntryType::Generic,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style entry type override
    #[must_use]
    pub const fn with_type(mut self, entry_type: EntryType) -> Self {
        self.entry_type = entry_type;
        self
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.touch();
    }

    pub fn set_entry_type(&mut self, entry_type: EntryType) {
        self.entry_type = entry_type;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now_after(self.updated_at);
    }
}
