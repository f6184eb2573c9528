//! Full snapshots of the hierarchy

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Archive, Entry, Tome};

/// Every archive, tome and entry in one bundle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    #[serde(default)]
    pub archives: Vec<Archive>,
    #[serde(default)]
    pub tomes: Vec<Tome>,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl RecordSet {
    /// Per-kind record counts
    #[must_use]
    pub fn counts(&self) -> RecordCounts {
        RecordCounts {
            archives: self.archives.len(),
            tomes: self.tomes.len(),
            entries: self.entries.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archives.is_empty() && self.tomes.is_empty() && self.entries.is_empty()
    }
}

/// Number of records per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCounts {
    pub archives: usize,
    pub tomes: usize,
    pub entries: usize,
}

impl RecordCounts {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.archives + self.tomes + self.entries
    }
}

impl fmt::Display for RecordCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} archives, {} tomes, {} entries",
            self.archives, self.tomes, self.entries
        )
    }
}
