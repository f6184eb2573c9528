//! Mapping between record models and their tables

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use libsql::{Row, Value};

use crate::error::{Error, Result};
use crate::models::{Archive, EntityKind, Entry, EntryType, Timestamp, Tome};

/// A record kind persisted in its own table.
///
/// `COLUMNS` starts with `id` and lists the columns in the order used by
/// [`StoredRecord::to_values`] and [`StoredRecord::from_row`].
pub trait StoredRecord: Clone + fmt::Debug + Send + Sync + Sized + 'static {
    type Id: Copy + Eq + Hash + fmt::Display + FromStr + Send + Sync;

    const KIND: EntityKind;
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> Self::Id;
    fn updated_at(&self) -> Timestamp;
    fn to_values(&self) -> Vec<Value>;
    fn from_row(row: &Row) -> Result<Self>;
}

/// A record that belongs to a parent record
pub trait OwnedRecord: StoredRecord {
    type OwnerId: fmt::Display + Send + Sync;

    const OWNER_COLUMN: &'static str;
}

fn parse_column<T: FromStr>(row: &Row, idx: i32, kind: EntityKind) -> Result<T>
where
    T::Err: fmt::Display,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|error| Error::Database(format!("invalid {kind} column value '{raw}': {error}")))
}

fn timestamp(row: &Row, idx: i32) -> Result<Timestamp> {
    Ok(Timestamp::from_millis(row.get::<i64>(idx)?))
}

impl StoredRecord for Archive {
    type Id = crate::models::ArchiveId;

    const KIND: EntityKind = EntityKind::Archive;
    const COLUMNS: &'static [&'static str] =
        &["id", "name", "description", "created_at", "updated_at"];

    fn id(&self) -> Self::Id {
        self.id
    }

    fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::from(self.id.as_str()),
            Value::from(self.name.clone()),
            Value::from(self.description.clone()),
            Value::from(self.created_at.as_millis()),
            Value::from(self.updated_at.as_millis()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: parse_column(row, 0, Self::KIND)?,
            name: row.get(1)?,
            description: row.get(2)?,
            created_at: timestamp(row, 3)?,
            updated_at: timestamp(row, 4)?,
        })
    }
}

impl StoredRecord for Tome {
    type Id = crate::models::TomeId;

    const KIND: EntityKind = EntityKind::Tome;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "archive_id",
        "name",
        "description",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> Self::Id {
        self.id
    }

    fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::from(self.id.as_str()),
            Value::from(self.archive_id.as_str()),
            Value::from(self.name.clone()),
            Value::from(self.description.clone()),
            Value::from(self.created_at.as_millis()),
            Value::from(self.updated_at.as_millis()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: parse_column(row, 0, Self::KIND)?,
            archive_id: parse_column(row, 1, Self::KIND)?,
            name: row.get(2)?,
            description: row.get(3)?,
            created_at: timestamp(row, 4)?,
            updated_at: timestamp(row, 5)?,
        })
    }
}

impl OwnedRecord for Tome {
    type OwnerId = crate::models::ArchiveId;

    const OWNER_COLUMN: &'static str = "archive_id";
}

impl StoredRecord for Entry {
    type Id = crate::models::EntryId;

    const KIND: EntityKind = EntityKind::Entry;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "tome_id",
        "name",
        "content",
        "entry_type",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> Self::Id {
        self.id
    }

    fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::from(self.id.as_str()),
            Value::from(self.tome_id.as_str()),
            Value::from(self.name.clone()),
            Value::from(self.content.clone()),
            Value::from(self.entry_type.as_str().to_string()),
            Value::from(self.created_at.as_millis()),
            Value::from(self.updated_at.as_millis()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        let entry_type: String = row.get(4)?;
        Ok(Self {
            id: parse_column(row, 0, Self::KIND)?,
            tome_id: parse_column(row, 1, Self::KIND)?,
            name: row.get(2)?,
            content: row.get(3)?,
            entry_type: EntryType::from_stored(&entry_type),
            created_at: timestamp(row, 5)?,
            updated_at: timestamp(row, 6)?,
        })
    }
}

impl OwnedRecord for Entry {
    type OwnerId = crate::models::TomeId;

    const OWNER_COLUMN: &'static str = "tome_id";
}
