//! Record kinds

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three record kinds of the hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Archive,
    Tome,
    Entry,
}

impl EntityKind {
    /// All kinds, parents before children
    pub const ALL: [Self; 3] = [Self::Archive, Self::Tome, Self::Entry];

    /// Lowercase singular name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Tome => "tome",
            Self::Entry => "entry",
        }
    }

    /// Table holding records of this kind
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Archive => "archives",
            Self::Tome => "tomes",
            Self::Entry => "entries",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "archive" | "archives" => Ok(Self::Archive),
            "tome" | "tomes" => Ok(Self::Tome),
            "entry" | "entries" => Ok(Self::Entry),
            other => Err(format!("unknown record kind '{other}'")),
        }
    }
}
