//! JSON checkpoint store
//!
//! The whole collection lives in memory and is rewritten in full on every
//! flush. Writes go to a temporary file in the same directory which is then
//! renamed over the store, so an interruption never leaves a truncated file.

use crate::storage::merge::merge;
use crate::storage::traits::{RecordStore, StorageError, StorageResult};
use crate::storage::{EntityId, Record};
use serde::Deserialize;
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// In-memory image of a persisted record collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedStore {
    records: Vec<Record>,
    seen_entity_ids: HashSet<EntityId>,
}

impl PersistedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from records, dropping duplicate keys
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut store = Self::new();
        store.absorb_records(records);
        store
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Targets that already have at least one persisted record
    pub fn seen_entity_ids(&self) -> &HashSet<EntityId> {
        &self.seen_entity_ids
    }

    pub fn contains_entity(&self, id: &EntityId) -> bool {
        self.seen_entity_ids.contains(id)
    }

    /// Records belonging to one target
    pub fn records_for<'a>(&'a self, id: &'a EntityId) -> impl Iterator<Item = &'a Record> + 'a {
        self.records.iter().filter(move |r| &r.entity_id == id)
    }

    /// Merges records into the collection, returning how many were new
    pub fn absorb_records(&mut self, records: Vec<Record>) -> usize {
        let appended = merge(&mut self.records, records);
        for record in appended {
            self.seen_entity_ids.insert(record.entity_id.clone());
        }
        appended.len()
    }
}

/// Store bound to a file path
#[derive(Debug)]
pub struct Checkpointer {
    path: PathBuf,
    store: PersistedStore,
}

impl Checkpointer {
    /// Loads the store at `path`
    ///
    /// A missing or empty file yields an empty store (first run). A file
    /// that exists but cannot be read or decoded is an error.
    pub fn load(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let store = load_store(&path)?;

        if store.is_empty() {
            tracing::info!("Starting with an empty store at {}", path.display());
        } else {
            tracing::info!(
                "Loaded {} records for {} targets from {}",
                store.len(),
                store.seen_entity_ids().len(),
                path.display()
            );
        }

        Ok(Self { path, store })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store(&self) -> &PersistedStore {
        &self.store
    }

    pub fn into_store(self) -> PersistedStore {
        self.store
    }
}

impl RecordStore for Checkpointer {
    fn records(&self) -> &[Record] {
        self.store.records()
    }

    fn contains_entity(&self, id: &EntityId) -> bool {
        self.store.contains_entity(id)
    }

    fn absorb(&mut self, records: Vec<Record>) -> usize {
        self.store.absorb_records(records)
    }

    fn flush(&mut self) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(self.store.records())?;
        let formatted = format!("{json}\n");
        atomic_write(&self.path, formatted.as_bytes()).map_err(|source| StorageError::Write {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!("Saved {} records to {}", self.store.len(), self.path.display());
        Ok(())
    }
}

/// Reads and decodes a store file
pub fn load_store(path: &Path) -> StorageResult<PersistedStore> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(PersistedStore::new()),
        Err(source) => {
            return Err(StorageError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if content.trim().is_empty() {
        return Ok(PersistedStore::new());
    }

    let stored: Vec<StoredRecord> =
        serde_json::from_str(&content).map_err(|source| StorageError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

    let total = stored.len();
    let records: Vec<Record> = stored.into_iter().filter_map(StoredRecord::into_record).collect();
    if records.len() < total {
        tracing::warn!(
            "Dropped {} records without a timestamp from {}",
            total - records.len(),
            path.display()
        );
    }

    Ok(PersistedStore::from_records(records))
}

/// A store entry as found on disk, where the timestamp may be null or absent
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    #[serde(default)]
    rating_value: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    entity_id: EntityId,
}

impl StoredRecord {
    fn into_record(self) -> Option<Record> {
        let timestamp = self.timestamp.filter(|t| !t.trim().is_empty())?;
        Some(Record::new(self.entity_id, timestamp, self.rating_value))
    }
}

/// Writes `contents` to a sibling temp file, syncs it, then renames it over `path`
pub(crate) fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.flush()?;
    temp.as_file_mut().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(entity: &str, timestamp: &str) -> Record {
        Record::new(EntityId::new(entity).unwrap(), timestamp, Some("4".to_string()))
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let checkpointer = Checkpointer::load(dir.path().join("absent.json")).unwrap();
        assert!(checkpointer.store().is_empty());
    }

    #[test]
    fn test_blank_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blank.json");
        std::fs::write(&path, "  \n").unwrap();

        let checkpointer = Checkpointer::load(&path).unwrap();
        assert!(checkpointer.store().is_empty());
    }

    #[test]
    fn test_undecodable_file_is_surfaced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Checkpointer::load(&path).unwrap_err();
        assert!(matches!(err, StorageError::Decode { .. }));
        // The broken file is left alone
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_directory_path_is_read_error() {
        let dir = tempdir().unwrap();
        let err = Checkpointer::load(dir.path()).unwrap_err();
        assert!(matches!(err, StorageError::Read { .. }));
    }

    #[test]
    fn test_flush_then_load_merges_with_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("reviews.json");

        let mut first = Checkpointer::load(&path).unwrap();
        assert_eq!(first.absorb(vec![record("a", "t1"), record("a", "t2")]), 2);
        first.flush().unwrap();

        let mut second = Checkpointer::load(&path).unwrap();
        assert_eq!(second.store().len(), 2);
        assert!(second.contains_entity(&EntityId::new("a").unwrap()));

        assert_eq!(second.absorb(vec![record("a", "t2"), record("b", "t1")]), 1);
        second.flush().unwrap();

        let reloaded = load_store(&path).unwrap();
        let keys: Vec<_> = reloaded
            .records()
            .iter()
            .map(|r| (r.entity_id.as_str(), r.timestamp.as_str()))
            .collect();
        assert_eq!(keys, [("a", "t1"), ("a", "t2"), ("b", "t1")]);
    }

    #[test]
    fn test_loaded_duplicates_are_collapsed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dupes.json");
        let json = serde_json::to_string(&vec![record("a", "t1"), record("a", "t1")]).unwrap();
        std::fs::write(&path, json).unwrap();

        let checkpointer = Checkpointer::load(&path).unwrap();
        assert_eq!(checkpointer.store().len(), 1);
    }

    #[test]
    fn test_flush_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reviews.json");

        let mut checkpointer = Checkpointer::load(&path).unwrap();
        checkpointer.absorb(vec![record("a", "t1")]);
        checkpointer.flush().unwrap();
        checkpointer.flush().unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_records_for_entity() {
        let store = PersistedStore::from_records(vec![
            record("a", "t1"),
            record("b", "t1"),
            record("a", "t2"),
        ]);
        let a = EntityId::new("a").unwrap();
        assert_eq!(store.records_for(&a).count(), 2);
        assert_eq!(store.seen_entity_ids().len(), 2);
    }

    #[test]
    fn test_records_without_timestamp_are_dropped_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reviews.json");
        std::fs::write(
            &path,
            r#"[
  {"ratingValue": "5.0", "timestamp": "2024-01-01T00:00:00Z", "entityId": "A"},
  {"ratingValue": "4.0", "timestamp": null, "entityId": "A"},
  {"ratingValue": "3.0", "entityId": "B"}
]"#,
        )
        .unwrap();

        let checkpointer = Checkpointer::load(&path).unwrap();

        assert_eq!(checkpointer.store().len(), 1);
        assert_eq!(checkpointer.records()[0].timestamp, "2024-01-01T00:00:00Z");
        assert!(checkpointer.contains_entity(&EntityId::new("A").unwrap()));
        assert!(!checkpointer.contains_entity(&EntityId::new("B").unwrap()));
    }
}
