//! Indexed Store - durable history of selected event kinds
//!
//! Entries are kept sorted by timestamp and are unique by checksum. When a
//! backing file is configured every insert is appended to it as one JSON
//! line, and the file is replayed when the store is opened.

use std::collections::{BTreeSet, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::types::Entry;
use crate::utils::time::compare_timestamps;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// What happened to an inserted entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The entry was new and is now stored
    Inserted,
    /// An entry with the same checksum already existed
    Duplicate,
}

/// Append-only log backing the store
#[derive(Debug)]
struct IndexFile {
    path: PathBuf,
    file: File,
    sync_writes: bool,
}

impl IndexFile {
    fn append(&mut self, entry: &Entry) -> StoreResult<()> {
        let json_line = entry.to_json_line()?;
        writeln!(self.file, "{}", json_line)?;
        if self.sync_writes {
            self.file.sync_data()?;
        }
        Ok(())
    }

    fn truncate(&mut self) -> StoreResult<()> {
        self.file.set_len(0)?;
        if self.sync_writes {
            self.file.sync_all()?;
        }
        Ok(())
    }
}

/// Timestamp-ordered, checksum-unique collection of entries
#[derive(Debug, Default)]
pub struct IndexedStore {
    /// Sorted ascending by timestamp; equal timestamps keep insertion order
    entries: Vec<Entry>,
    checksums: HashSet<String>,
    file: Option<IndexFile>,
}

impl IndexedStore {
    /// Create a store that lives only in memory
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a store backed by a JSONL file, replaying what it already holds
    pub fn open<P: AsRef<Path>>(path: P, sync_writes: bool) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut store = Self::in_memory();

        let mut torn_tail = false;
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            torn_tail = !content.is_empty() && !content.ends_with('\n');
            for (line_num, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Entry>(line) {
                    Ok(entry) => {
                        store.insert_in_memory(entry.with_checksum());
                    }
                    Err(e) => {
                        warn!(path = %path.display(), line = line_num + 1, error = %e, "skipping corrupt index line");
                    }
                }
            }
            debug!(path = %path.display(), count = store.len(), "replayed index file");
        } else if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if torn_tail {
            // Keep the next append off the half-written line
            writeln!(file)?;
        }
        store.file = Some(IndexFile {
            path,
            file,
            sync_writes,
        });

        Ok(store)
    }

    /// Path of the backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(|f| f.path.as_path())
    }

    /// Insert an entry unless one with the same checksum is already stored
    ///
    /// The checksum is computed here if the caller has not assigned one.
    pub fn insert(&mut self, entry: Entry) -> StoreResult<InsertOutcome> {
        let entry = entry.with_checksum();
        let checksum = entry.checksum.as_deref().unwrap_or_default();
        if self.checksums.contains(checksum) {
            return Ok(InsertOutcome::Duplicate);
        }

        if let Some(file) = self.file.as_mut() {
            file.append(&entry)?;
        }

        self.insert_in_memory(entry);
        Ok(InsertOutcome::Inserted)
    }

    fn insert_in_memory(&mut self, entry: Entry) -> InsertOutcome {
        let Some(checksum) = entry.checksum.clone() else {
            return InsertOutcome::Duplicate;
        };
        if !self.checksums.insert(checksum) {
            return InsertOutcome::Duplicate;
        }

        let pos = self
            .entries
            .partition_point(|e| e.cmp_timestamp(&entry).is_le());
        self.entries.insert(pos, entry);
        InsertOutcome::Inserted
    }

    /// Whether an entry with this checksum is stored
    pub fn contains(&self, checksum: &str) -> bool {
        self.checksums.contains(checksum)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry (and truncate the backing file)
    pub fn clear(&mut self) -> StoreResult<()> {
        if let Some(file) = self.file.as_mut() {
            file.truncate()?;
        }
        self.entries.clear();
        self.checksums.clear();
        Ok(())
    }

    /// Up to `count` entries, newest first
    pub fn newest(&self, count: usize) -> Vec<Entry> {
        self.entries.iter().rev().take(count).cloned().collect()
    }

    /// Up to `count` entries, oldest first
    pub fn oldest(&self, count: usize) -> Vec<Entry> {
        self.entries.iter().take(count).cloned().collect()
    }

    /// Entries strictly newer than `timestamp`, newest first
    pub fn since(&self, timestamp: &str) -> Vec<Entry> {
        self.entries
            .iter()
            .rev()
            .take_while(|e| compare_timestamps(&e.timestamp, timestamp).is_gt())
            .cloned()
            .collect()
    }

    /// Up to `count` entries of one kind, newest first
    pub fn by_kind(&self, kind: &str, count: usize) -> Vec<Entry> {
        self.entries
            .iter()
            .rev()
            .filter(|e| e.event == kind)
            .take(count)
            .cloned()
            .collect()
    }

    /// Distinct event kinds present in the store
    pub fn kinds(&self) -> BTreeSet<String> {
        self.entries.iter().map(|e| e.event.clone()).collect()
    }
}
