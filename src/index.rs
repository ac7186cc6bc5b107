//! In-memory corpus index of the latest scan, plus its on-disk snapshot.
//!
//! The index is a cache, not a ledger: `replace` overwrites a file's
//! category wholesale and `clear_file` drops a file, nothing is ever
//! merged or diffed. Processed state lives in the state store; the
//! snapshot written here only lets `cmk list` work without a rescan.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Annotation;

/// Annotations for one category within one file, in scan order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBlock {
    pub category: String,
    pub annotations: Vec<Annotation>,
}

/// file key -> ordered category blocks. Files iterate in sorted key order,
/// which matches enumeration order; categories keep their insertion order
/// within a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusIndex {
    files: BTreeMap<String, Vec<CategoryBlock>>,
}

impl CorpusIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite `category`'s annotation list for `file_key`. Never merges
    /// with a previous scan's entries.
    pub fn replace(&mut self, file_key: &str, category: &str, annotations: Vec<Annotation>) {
        let blocks = self.files.entry(file_key.to_string()).or_default();
        if let Some(block) = blocks.iter_mut().find(|b| b.category == category) {
            block.annotations = annotations;
        } else {
            blocks.push(CategoryBlock {
                category: category.to_string(),
                annotations,
            });
        }
    }

    /// Drop every entry for `file_key`.
    pub fn clear_file(&mut self, file_key: &str) {
        self.files.remove(file_key);
    }

    /// Iterate `(file_key, category, annotation)` in file order, then
    /// category order within the file, then annotation order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &Annotation)> + '_ {
        self.files.iter().flat_map(|(file, blocks)| {
            blocks.iter().flat_map(move |block| {
                block
                    .annotations
                    .iter()
                    .map(move |annotation| (file.as_str(), block.category.as_str(), annotation))
            })
        })
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn annotation_count(&self) -> usize {
        self.files
            .values()
            .flatten()
            .map(|block| block.annotations.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write the snapshot mirror atomically (temp file + rename).
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Load the snapshot mirror. A missing file yields an empty index; an
    /// unparseable one is logged and yields an empty index. Entries whose
    /// file no longer exists on disk are dropped.
    pub fn load_snapshot(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::new(),
            Err(e) => {
                log::warn!("failed to read index snapshot {}: {}", path.display(), e);
                return Self::new();
            }
        };
        let mut index: CorpusIndex = match serde_json::from_str(&raw) {
            Ok(index) => index,
            Err(e) => {
                log::warn!(
                    "index snapshot {} is not valid JSON, starting empty: {}",
                    path.display(),
                    e
                );
                return Self::new();
            }
        };
        index.files.retain(|file, _| Path::new(file).exists());
        index
    }
}
