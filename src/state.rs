//! Durable processed-state ledger, keyed by annotation id.
//!
//! The ledger is the only authority on what has been processed. Because
//! ids are content addressed, state survives rescans, file renames that
//! keep line content, and reordering edits; any edit that changes the
//! identity fields mints a new id, which starts unprocessed.
//!
//! Every mutation rewrites the whole file through a temp file + rename.
//! A corrupt or missing ledger degrades to empty rather than failing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One entry in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateRecord {
    pub id: String,
    pub processed: bool,
}

/// On-disk shape of the ledger file.
#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    bookmarks: BTreeMap<String, StateRecord>,
    #[serde(rename = "lastUpdated")]
    last_updated: DateTime<Utc>,
}

/// Handle over the ledger file. Reads are served from memory; every
/// mutation is flushed synchronously before returning.
#[derive(Debug)]
pub struct ProcessingStateStore {
    path: PathBuf,
    records: BTreeMap<String, StateRecord>,
}

impl ProcessingStateStore {
    /// Open the ledger at `path`, creating it if missing. An unreadable or
    /// unparseable file is logged and treated as empty.
    pub fn open(path: &Path) -> Result<Self> {
        let store = Self::load(path);
        if !path.exists() {
            store.flush()?;
        }
        Ok(store)
    }

    /// Open without touching disk: a missing ledger stays missing until the
    /// first mutation. For read-only callers such as `cmk list`.
    pub fn open_read_only(path: &Path) -> Self {
        Self::load(path)
    }

    fn load(path: &Path) -> Self {
        let mut store = Self {
            path: path.to_path_buf(),
            records: BTreeMap::new(),
        };
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<StateFile>(&raw) {
                Ok(file) => {
                    store.records = file.bookmarks;
                }
                Err(e) => {
                    log::warn!(
                        "state file {} is not valid JSON, starting with an empty ledger: {}",
                        path.display(),
                        e
                    );
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                log::warn!(
                    "failed to read state file {}, starting with an empty ledger: {}",
                    path.display(),
                    e
                );
            }
        }
        store
    }

    /// An id never seen before is unprocessed.
    pub fn is_processed(&self, id: &str) -> bool {
        self.records.get(id).map(|r| r.processed).unwrap_or(false)
    }

    pub fn set_processed(&mut self, id: &str, processed: bool) -> Result<()> {
        self.upsert(id, processed);
        self.flush()
    }

    /// Flip an id's processed flag and return the new value.
    pub fn toggle_processed(&mut self, id: &str) -> Result<bool> {
        let next = !self.is_processed(id);
        self.upsert(id, next);
        self.flush()?;
        Ok(next)
    }

    /// Mark every id in the batch processed with a single flush. Either the
    /// whole batch lands on disk or, on write failure, none of it is
    /// considered durable.
    pub fn mark_all_processed<'a, I>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for id in ids {
            self.upsert(id, true);
        }
        self.flush()
    }

    pub fn processed_ids(&self) -> Vec<String> {
        self.records
            .values()
            .filter(|r| r.processed)
            .map(|r| r.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn upsert(&mut self, id: &str, processed: bool) {
        self.records.insert(
            id.to_string(),
            StateRecord {
                id: id.to_string(),
                processed,
            },
        );
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = StateFile {
            bookmarks: self.records.clone(),
            last_updated: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store_path(tmp: &tempfile::TempDir) -> PathBuf {
        tmp.path().join(".codemarks").join("state.json")
    }

    #[test]
    fn unknown_id_is_unprocessed() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ProcessingStateStore::open(&store_path(&tmp)).unwrap();
        assert!(!store.is_processed("deadbeef"));
    }

    #[test]
    fn open_initializes_a_missing_ledger() {
        let tmp = tempfile::tempdir().unwrap();
        let path = store_path(&tmp);
        assert!(!path.exists());

        let store = ProcessingStateStore::open(&path).unwrap();
        assert!(store.is_empty());
        assert!(path.exists());

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(parsed.get("bookmarks").is_some());
        assert!(parsed.get("lastUpdated").is_some());
    }

    #[test]
    fn read_only_open_leaves_a_missing_ledger_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let path = store_path(&tmp);

        let store = ProcessingStateStore::open_read_only(&path);
        assert!(store.is_empty());
        assert!(!store.is_processed("abc123"));
        assert!(!path.exists(), "read-only open must not create the ledger");
    }

    #[test]
    fn read_only_open_sees_persisted_state() {
        let tmp = tempfile::tempdir().unwrap();
        let path = store_path(&tmp);

        let mut store = ProcessingStateStore::open(&path).unwrap();
        store.set_processed("abc123", true).unwrap();
        drop(store);

        let store = ProcessingStateStore::open_read_only(&path);
        assert!(store.is_processed("abc123"));
    }

    #[test]
    fn processed_state_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = store_path(&tmp);

        let mut store = ProcessingStateStore::open(&path).unwrap();
        store.set_processed("abc123", true).unwrap();
        drop(store);

        let store = ProcessingStateStore::open(&path).unwrap();
        assert!(store.is_processed("abc123"));
        assert!(!store.is_processed("def456"));
    }

    #[test]
    fn marking_processed_twice_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let path = store_path(&tmp);

        let mut store = ProcessingStateStore::open(&path).unwrap();
        store.set_processed("abc123", true).unwrap();
        store.set_processed("abc123", true).unwrap();

        let store = ProcessingStateStore::open(&path).unwrap();
        assert!(store.is_processed("abc123"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn toggle_flips_back_and_forth() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ProcessingStateStore::open(&store_path(&tmp)).unwrap();

        assert!(store.toggle_processed("abc123").unwrap());
        assert!(store.is_processed("abc123"));
        assert!(!store.toggle_processed("abc123").unwrap());
        assert!(!store.is_processed("abc123"));
    }

    #[test]
    fn corrupt_ledger_degrades_to_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = store_path(&tmp);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{this is not json").unwrap();

        let store = ProcessingStateStore::open(&path).unwrap();
        assert!(store.is_empty());
        assert!(!store.is_processed("abc123"));
    }

    #[test]
    fn mark_all_processed_lands_the_whole_batch() {
        let tmp = tempfile::tempdir().unwrap();
        let path = store_path(&tmp);

        let mut store = ProcessingStateStore::open(&path).unwrap();
        let ids = ["one", "two", "three"];
        store.mark_all_processed(ids.iter().copied()).unwrap();

        let store = ProcessingStateStore::open(&path).unwrap();
        for id in ids {
            assert!(store.is_processed(id), "{id} should be processed");
        }
        let mut processed = store.processed_ids();
        processed.sort();
        assert_eq!(processed, vec!["one", "three", "two"]);
    }
}
