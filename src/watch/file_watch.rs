//! Polling watch on the active journal file
//!
//! Native change notifications are not reliable for the game's journals, so
//! the active file is polled: its (modification time, length) fingerprint is
//! checked every `watch_interval`, and a change triggers one pipeline load
//! after a short coalescing window.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

use crate::ingest::Pipeline;

/// What a poll compares to decide whether the file changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

async fn fingerprint(path: &Path) -> Option<Fingerprint> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    Some(Fingerprint {
        modified: metadata.modified().ok(),
        len: metadata.len(),
    })
}

/// Handle to a background poll task for one file
///
/// Dropping the handle also stops the task, at its next suspension point.
#[derive(Debug)]
pub struct FileWatch {
    path: PathBuf,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl FileWatch {
    /// Start polling `path`; every detected change runs `pipeline.load`
    ///
    /// The first poll always counts as a change, so entries written before
    /// the watch was attached are picked up.
    pub fn attach(path: PathBuf, pipeline: Arc<Pipeline>) -> Self {
        let interval = pipeline.config().watch_interval;
        let debounce = pipeline.config().debounce;
        let (shutdown, rx) = watch::channel(false);

        let handle = tokio::spawn(poll_file(path.clone(), pipeline, interval, debounce, rx));

        Self {
            path,
            shutdown,
            handle,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop polling and wait for an in-flight load to finish
    pub async fn detach(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            if e.is_panic() {
                error!(path = %self.path.display(), "file watch task panicked");
            }
        }
    }
}

async fn poll_file(
    path: PathBuf,
    pipeline: Arc<Pipeline>,
    interval: Duration,
    debounce: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut last_seen: Option<Fingerprint> = None;

    loop {
        let current = fingerprint(&path).await;
        if current.is_some() && current != last_seen {
            trace!(path = %path.display(), "journal changed");

            // Let a burst of writes settle into one load
            if !debounce.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(debounce) => {}
                    _ = shutdown.changed() => break,
                }
            }

            // Taken before reading so writes racing the load show up next poll
            last_seen = fingerprint(&path).await.or(current);

            match pipeline.load(Some(&path)).await {
                Ok(entries) if !entries.is_empty() => {
                    debug!(path = %path.display(), count = entries.len(), "ingested journal entries");
                }
                Ok(_) => {}
                Err(e) => {
                    error!(path = %path.display(), error = %e, "journal load failed");
                }
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => break,
        }
    }

    trace!(path = %path.display(), "file watch stopped");
}
