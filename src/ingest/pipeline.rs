//! Ingestion Pipeline
//!
//! Ties the parser, the retention classifier and the two stores together,
//! and reports every newly-ingested entry to the notifier. The pipeline is
//! the only writer of the stores; everything else goes through its query
//! methods.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::config::JournalConfig;
use crate::error::{JournalError, Result};
use crate::store::{IndexedStore, InsertOutcome, LatestCache};
use crate::types::Entry;
use crate::utils::time::{compare_timestamps, is_newer};
use crate::watch::discover;

use super::classifier::{Retention, RetentionPolicy};
use super::notifier::{EntryCallback, EntryNotice, Notifier};
use super::parser;

/// Default number of entries returned by `get_events`
pub const DEFAULT_EVENT_COUNT: usize = 10;

/// Ingestion pipeline owning the indexed store and the latest-value cache
pub struct Pipeline {
    config: JournalConfig,
    policy: RetentionPolicy,
    index: RwLock<IndexedStore>,
    latest: RwLock<LatestCache>,
    /// Latest entry timestamp seen so far; only ever moves forward
    high_water: RwLock<Option<String>>,
    /// High-water mark at the last `clear`; the floor for `flush`
    cleared_at: RwLock<Option<String>>,
    notifier: Notifier,
    /// Held for the whole of a `load`; one load at a time
    load_gate: Mutex<()>,
}

impl Pipeline {
    /// Create a pipeline, opening the persistent index if one is configured
    pub fn new(config: JournalConfig) -> Result<Self> {
        let index = match &config.index_path {
            Some(path) => IndexedStore::open(path, config.sync_writes)?,
            None => IndexedStore::in_memory(),
        };

        Ok(Self {
            policy: config.retention.clone(),
            index: RwLock::new(index),
            latest: RwLock::new(LatestCache::new()),
            high_water: RwLock::new(None),
            cleared_at: RwLock::new(None),
            notifier: Notifier::default(),
            load_gate: Mutex::new(()),
            config,
        })
    }

    pub fn config(&self) -> &JournalConfig {
        &self.config
    }

    /// Load one file, or every discovered journal file when `file` is `None`
    ///
    /// Returns the entries that changed a store, in the order they were
    /// processed. A file that cannot be read after all retries is skipped for
    /// this pass. Store failures abort the call; entries ingested before the
    /// failure have already been notified.
    pub async fn load(&self, file: Option<&Path>) -> Result<Vec<Entry>> {
        let _gate = self.load_gate.lock().await;

        let files: Vec<PathBuf> = match file {
            Some(path) => vec![path.to_path_buf()],
            None => {
                let mut found = discover(&self.config)?;
                found.sort_by(|a, b| a.path.cmp(&b.path));
                found.into_iter().map(|f| f.path).collect()
            }
        };

        let mut candidates = Vec::new();
        for path in &files {
            match parser::load_file(path, &self.config.read_retry).await {
                Ok(entries) => candidates.extend(entries),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable journal for this pass");
                }
            }
        }

        // Entries older than the mark were handled by an earlier pass. Ties
        // are kept: several entries can share one timestamp, and the store
        // rules below resolve them.
        let floor = self.high_water_mark();
        self.finish(files.len(), candidates, floor)
    }

    /// Final load of a file that will not be watched again
    ///
    /// Unlike `load`, a read that fails after all retries is returned as
    /// `JournalError::Read`, and entries behind the high-water mark are still
    /// considered: another file may already have moved the mark past this
    /// file's tail. Only entries older than the last `clear` are filtered.
    /// A file that no longer exists has nothing left to flush.
    pub async fn flush(&self, path: &Path) -> Result<Vec<Entry>> {
        let _gate = self.load_gate.lock().await;

        let candidates = match parser::load_file(path, &self.config.read_retry).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "journal gone before final load");
                Vec::new()
            }
            Err(source) => {
                return Err(JournalError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let floor = self.cleared_at.read().clone();
        self.finish(1, candidates, floor)
    }

    /// Filter against `floor`, ingest, then notify outside the store locks
    fn finish(
        &self,
        files: usize,
        mut candidates: Vec<Entry>,
        floor: Option<String>,
    ) -> Result<Vec<Entry>> {
        if let Some(floor) = floor {
            candidates.retain(|e| compare_timestamps(&e.timestamp, &floor).is_ge());
        }

        let considered = candidates.len();
        let (ingested, outcome) = self.ingest(candidates);

        debug!(
            files,
            considered,
            ingested = ingested.len(),
            "journal load finished"
        );

        self.notifier.notify(&ingested);
        outcome.map(|_| ingested)
    }

    /// Route candidates into the stores; the store locks are released before
    /// anyone is notified so callbacks can query the pipeline
    fn ingest(&self, candidates: Vec<Entry>) -> (Vec<Entry>, Result<()>) {
        let mut index = self.index.write();
        let mut latest = self.latest.write();
        let mut mark = self.high_water.write();

        let mut ingested = Vec::new();
        for entry in candidates {
            let advance = match mark.as_deref() {
                Some(current) => is_newer(&entry.timestamp, current),
                None => true,
            };
            if advance {
                *mark = Some(entry.timestamp.clone());
            }

            match self.policy.classify(&entry.event) {
                Retention::Ignore => {}
                Retention::History => {
                    let entry = entry.with_checksum();
                    match index.insert(entry.clone()) {
                        Ok(InsertOutcome::Inserted) => ingested.push(entry),
                        Ok(InsertOutcome::Duplicate) => {}
                        Err(e) => {
                            error!(event = %entry.event, error = %e, "indexed store insert failed");
                            return (ingested, Err(JournalError::Store(e)));
                        }
                    }
                }
                Retention::LatestOnly => {
                    if latest.offer(&entry) {
                        ingested.push(entry);
                    }
                }
            }
        }

        (ingested, Ok(()))
    }

    /// Register a callback for every future newly-ingested entry
    pub fn watch(&self, callback: EntryCallback) {
        self.notifier.register(callback);
    }

    /// Drop every registered callback
    pub fn unwatch_all(&self) {
        self.notifier.clear_callbacks();
    }

    /// Subscribe to newly-ingested entries over a broadcast channel
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EntryNotice> {
        self.notifier.subscribe()
    }

    /// Number of entries in the indexed store
    pub fn count(&self) -> usize {
        self.index.read().len()
    }

    /// Empty the indexed store
    ///
    /// The latest-value cache and the high-water mark are kept so entries
    /// already surfaced to consumers are not replayed.
    pub fn clear(&self) -> Result<()> {
        let mut index = self.index.write();
        index.clear()?;
        *self.cleared_at.write() = self.high_water_mark();
        Ok(())
    }

    /// Up to `count` indexed entries, newest first (one entry if `None`)
    pub fn get_newest(&self, count: Option<usize>) -> Vec<Entry> {
        self.index.read().newest(count.unwrap_or(1))
    }

    /// Up to `count` indexed entries, oldest first (one entry if `None`)
    pub fn get_oldest(&self, count: Option<usize>) -> Vec<Entry> {
        self.index.read().oldest(count.unwrap_or(1))
    }

    /// Indexed entries strictly newer than `timestamp`, newest first
    pub fn get_from_timestamp(&self, timestamp: &str) -> Vec<Entry> {
        self.index.read().since(timestamp)
    }

    /// Entries of one kind, newest first
    ///
    /// A kind held in the latest-value cache yields that single entry;
    /// otherwise up to `count` indexed entries are returned.
    pub fn get_events(&self, kind: &str, count: usize) -> Vec<Entry> {
        if let Some(entry) = self.latest.read().get(kind) {
            return vec![entry.clone()];
        }
        self.index.read().by_kind(kind, count)
    }

    /// Most recent entry of one kind
    pub fn get_event(&self, kind: &str) -> Option<Entry> {
        self.get_events(kind, DEFAULT_EVENT_COUNT).into_iter().next()
    }

    /// Event kinds present in the indexed store
    pub fn get_event_types(&self) -> BTreeSet<String> {
        self.index.read().kinds()
    }

    /// Event kinds present in the latest-value cache
    pub fn cached_kinds(&self) -> BTreeSet<String> {
        self.latest.read().kinds().map(str::to_string).collect()
    }

    /// Latest timestamp observed so far
    pub fn high_water_mark(&self) -> Option<String> {
        self.high_water.read().clone()
    }
}
