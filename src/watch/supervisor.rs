//! Rotation Supervisor
//!
//! Keeps exactly one file watch attached, to the most recently modified
//! journal. When the game rotates to a new file the old watch is detached
//! and the old file gets one final load, so lines written between the last
//! poll and the rotation are never lost.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::ingest::Pipeline;

use super::discovery::{discover, most_recent, SourceFile};
use super::file_watch::FileWatch;

/// What the supervisor currently knows about the journal directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupervisorStatus {
    pub known_files: usize,
    pub active_file: Option<PathBuf>,
}

/// Tracks journal files and moves the watch on rotation
pub struct Supervisor {
    pipeline: Arc<Pipeline>,
    files: HashMap<PathBuf, SourceFile>,
    /// Rotated-out files whose final load has not succeeded yet
    pending_flush: BTreeSet<PathBuf>,
    status: watch::Sender<SupervisorStatus>,
}

impl Supervisor {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        let (status, _) = watch::channel(SupervisorStatus::default());
        Self {
            pipeline,
            files: HashMap::new(),
            pending_flush: BTreeSet::new(),
            status,
        }
    }

    /// Receiver that always holds the latest status
    pub fn status(&self) -> watch::Receiver<SupervisorStatus> {
        self.status.subscribe()
    }

    /// File that currently has the watch attached
    pub fn active_file(&self) -> Option<&PathBuf> {
        self.files
            .iter()
            .find(|(_, file)| file.is_watched())
            .map(|(path, _)| path)
    }

    pub fn known_files(&self) -> usize {
        self.files.len()
    }

    /// Record discovered files, returning the paths seen for the first time
    fn register(&mut self, found: Vec<SourceFile>) -> Vec<PathBuf> {
        let mut added = Vec::new();
        for file in found {
            match self.files.get_mut(&file.path) {
                Some(known) => known.last_modified = file.last_modified,
                None => {
                    debug!(path = %file.path.display(), "discovered journal file");
                    added.push(file.path.clone());
                    self.files.insert(file.path.clone(), file);
                }
            }
        }
        added
    }

    /// One rescan: register new files, flush rotated ones, watch the active one
    ///
    /// Every file that stops being active is flushed before the new active
    /// file is watched. A file first seen when it is already superseded was
    /// never watched, so it is flushed too.
    pub async fn tick(&mut self) -> Result<()> {
        let found = discover(self.pipeline.config())?;
        let Some(active) = most_recent(&found).map(|f| f.path.clone()) else {
            return Ok(());
        };

        for path in self.register(found) {
            if path != active {
                self.pending_flush.insert(path);
            }
        }

        let rotated: Vec<PathBuf> = self
            .files
            .iter()
            .filter(|(path, file)| file.is_watched() && **path != active)
            .map(|(path, _)| path.clone())
            .collect();

        for path in rotated {
            if let Some(watch) = self.files.get_mut(&path).and_then(|f| f.watch.take()) {
                watch.detach().await;
            }
            info!(from = %path.display(), to = %active.display(), "journal rotated");
            self.pending_flush.insert(path);
        }

        self.flush_rotated().await;

        if let Some(file) = self.files.get_mut(&active) {
            if !file.is_watched() {
                info!(path = %active.display(), "watching active journal");
                file.watch = Some(FileWatch::attach(active.clone(), self.pipeline.clone()));
            }
        }

        self.publish_status();
        Ok(())
    }

    /// Final load of every rotated-out file; failures are retried next tick
    async fn flush_rotated(&mut self) {
        let pending: Vec<PathBuf> = self.pending_flush.iter().cloned().collect();
        for path in pending {
            match self.pipeline.flush(&path).await {
                Ok(entries) => {
                    debug!(path = %path.display(), count = entries.len(), "flushed rotated journal");
                    self.pending_flush.remove(&path);
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "final load of rotated journal failed");
                }
            }
        }
    }

    fn publish_status(&self) {
        self.status.send_replace(SupervisorStatus {
            known_files: self.files.len(),
            active_file: self.active_file().cloned(),
        });
    }

    /// Detach every watch and wait for in-flight loads
    pub async fn detach_all(&mut self) {
        let watched: Vec<PathBuf> = self
            .files
            .iter()
            .filter(|(_, file)| file.is_watched())
            .map(|(path, _)| path.clone())
            .collect();

        for path in watched {
            if let Some(watch) = self.files.get_mut(&path).and_then(|f| f.watch.take()) {
                watch.detach().await;
                info!(path = %path.display(), "stopped watching journal");
            }
        }
        self.publish_status();
    }

    /// Initial full load, then rescan every `rescan_interval` until
    /// `shutdown` flips (or its sender is dropped)
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        // Files present now are covered by the initial full load
        match discover(self.pipeline.config()) {
            Ok(found) => {
                self.register(found);
            }
            Err(e) => warn!(error = %e, "initial journal scan failed"),
        }

        match self.pipeline.load(None).await {
            Ok(entries) => info!(count = entries.len(), "initial journal load"),
            Err(e) => warn!(error = %e, "initial journal load failed"),
        }

        let mut timer = tokio::time::interval(self.pipeline.config().rescan_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!(error = %e, "journal rescan failed");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        self.detach_all().await;
    }
}
