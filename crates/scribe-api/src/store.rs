//! In-memory record partitions, one per user

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use scribe_core::{
    Archive, ArchiveId, Entry, EntryId, RecordCounts, RecordSet, Tome, TomeId,
};
use tokio::sync::RwLock;

/// One user's records, keyed by id
#[derive(Default)]
struct Partition {
    archives: BTreeMap<ArchiveId, Archive>,
    tomes: BTreeMap<TomeId, Tome>,
    entries: BTreeMap<EntryId, Entry>,
}

impl Partition {
    fn to_record_set(&self) -> RecordSet {
        RecordSet {
            archives: self.archives.values().cloned().collect(),
            tomes: self.tomes.values().cloned().collect(),
            entries: self.entries.values().cloned().collect(),
        }
    }
}

/// Remote copy of every caller's records.
///
/// Uploads replace records by id without comparing timestamps; clients
/// arbitrate with last-writer-wins when they download.
#[derive(Clone, Default)]
pub struct RecordStore {
    partitions: Arc<RwLock<HashMap<String, Partition>>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert `incoming` into the caller's partition, returning the received counts
    pub async fn upsert(&self, user_id: &str, incoming: RecordSet) -> RecordCounts {
        let counts = incoming.counts();
        let mut partitions = self.partitions.write().await;
        let partition = partitions.entry(user_id.to_string()).or_default();

        partition
            .archives
            .extend(incoming.archives.into_iter().map(|archive| (archive.id, archive)));
        partition
            .tomes
            .extend(incoming.tomes.into_iter().map(|tome| (tome.id, tome)));
        partition
            .entries
            .extend(incoming.entries.into_iter().map(|entry| (entry.id, entry)));
        counts
    }

    /// Every record stored for the caller
    pub async fn snapshot(&self, user_id: &str) -> RecordSet {
        self.partitions
            .read()
            .await
            .get(user_id)
            .map(Partition::to_record_set)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use scribe_core::Timestamp;

    use super::*;

    fn archive_set(archives: Vec<Archive>) -> RecordSet {
        RecordSet {
            archives,
            ..RecordSet::default()
        }
    }

    #[tokio::test]
    async fn upsert_replaces_by_id_without_arbitration() {
        let store = RecordStore::new();
        let mut archive = Archive::new("Work", "");
        store.upsert("user-1", archive_set(vec![archive.clone()])).await;

        // a copy that is not newer still overwrites the stored one
        archive.name = "Renamed".to_string();
        archive.updated_at = Timestamp::from_millis(archive.created_at.as_millis());
        let counts = store.upsert("user-1", archive_set(vec![archive.clone()])).await;

        assert_eq!(counts.archives, 1);
        assert_eq!(store.snapshot("user-1").await.archives, vec![archive]);
    }

    #[tokio::test]
    async fn repeated_uploads_keep_one_copy_per_id() {
        let store = RecordStore::new();
        let first: Vec<Archive> = (0..3).map(|i| Archive::new(format!("A{i}"), "")).collect();
        store.upsert("user-1", archive_set(first.clone())).await;

        let mut second = first[1..].to_vec();
        second[0].name = "A1 edited".to_string();
        second.push(Archive::new("A3", ""));
        store.upsert("user-1", archive_set(second)).await;

        let mut names: Vec<String> = store
            .snapshot("user-1")
            .await
            .archives
            .into_iter()
            .map(|archive| archive.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["A0", "A1 edited", "A2", "A3"]);
    }

    #[tokio::test]
    async fn partitions_are_isolated_per_user() {
        let store = RecordStore::new();
        store
            .upsert("user-1", archive_set(vec![Archive::new("Mine", "")]))
            .await;

        assert!(store.snapshot("user-2").await.is_empty());
        assert_eq!(store.snapshot("user-1").await.archives.len(), 1);
    }
}
