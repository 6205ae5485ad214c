//! Journal - query surface and lifecycle for consumers
//!
//! `Journal` wraps a shared `Pipeline` and, once `watch` is called, a
//! background `Supervisor` task. Consumers only ever talk to this type.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::JournalConfig;
use crate::error::Result;
use crate::ingest::{EntryNotice, Pipeline, DEFAULT_EVENT_COUNT};
use crate::types::{Entry, JournalStats};
use crate::watch::{Supervisor, SupervisorStatus};

/// Background supervisor task and its control channels
struct Runner {
    shutdown: watch::Sender<bool>,
    status: watch::Receiver<SupervisorStatus>,
    handle: JoinHandle<()>,
}

/// Deduplicated, queryable view of a journal directory
pub struct Journal {
    pipeline: Arc<Pipeline>,
    runner: Mutex<Option<Runner>>,
}

impl Journal {
    /// Create a journal for the given configuration
    pub fn new(config: JournalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pipeline: Arc::new(Pipeline::new(config)?),
            runner: Mutex::new(None),
        })
    }

    /// Shared pipeline, for collaborators that need it directly
    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Load one file, or every journal file when `file` is `None`
    pub async fn load(&self, file: Option<&Path>) -> Result<Vec<Entry>> {
        self.pipeline.load(file).await
    }

    /// Register `callback` for every newly-ingested entry and make sure the
    /// supervisor is running
    ///
    /// Must be called from within a tokio runtime.
    pub fn watch<F>(&self, callback: F)
    where
        F: Fn(&Entry) + Send + Sync + 'static,
    {
        self.pipeline.watch(Arc::new(callback));

        let mut runner = self.runner.lock();
        if runner.is_none() {
            let supervisor = Supervisor::new(self.pipeline.clone());
            let status = supervisor.status();
            let (shutdown, rx) = watch::channel(false);
            let handle = tokio::spawn(supervisor.run(rx));

            info!(dir = %self.pipeline.config().dir.display(), "journal supervisor started");
            *runner = Some(Runner {
                shutdown,
                status,
                handle,
            });
        }
    }

    /// Subscribe to newly-ingested entries over a broadcast channel
    pub fn subscribe(&self) -> broadcast::Receiver<EntryNotice> {
        self.pipeline.subscribe()
    }

    /// Whether the background supervisor is running
    pub fn is_watching(&self) -> bool {
        self.runner.lock().is_some()
    }

    /// Stop the supervisor, detach every watch and drop all callbacks
    ///
    /// No callback fires after this returns.
    pub async fn stop(&self) {
        let runner = self.runner.lock().take();
        if let Some(runner) = runner {
            let _ = runner.shutdown.send(true);
            if let Err(e) = runner.handle.await {
                error!(error = %e, "journal supervisor ended abnormally");
            }
            info!("journal supervisor stopped");
        }
        self.pipeline.unwatch_all();
    }

    pub fn count(&self) -> usize {
        self.pipeline.count()
    }

    pub fn clear(&self) -> Result<()> {
        self.pipeline.clear()
    }

    pub fn get_newest(&self, count: Option<usize>) -> Vec<Entry> {
        self.pipeline.get_newest(count)
    }

    pub fn get_oldest(&self, count: Option<usize>) -> Vec<Entry> {
        self.pipeline.get_oldest(count)
    }

    pub fn get_from_timestamp(&self, timestamp: &str) -> Vec<Entry> {
        self.pipeline.get_from_timestamp(timestamp)
    }

    /// Entries of one kind, newest first; `count` defaults to 10
    pub fn get_events(&self, kind: &str, count: Option<usize>) -> Vec<Entry> {
        self.pipeline
            .get_events(kind, count.unwrap_or(DEFAULT_EVENT_COUNT))
    }

    pub fn get_event(&self, kind: &str) -> Option<Entry> {
        self.pipeline.get_event(kind)
    }

    pub fn get_event_types(&self) -> BTreeSet<String> {
        self.pipeline.get_event_types()
    }

    pub fn stats(&self) -> JournalStats {
        let status = self
            .runner
            .lock()
            .as_ref()
            .map(|r| r.status.borrow().clone())
            .unwrap_or_default();

        JournalStats {
            indexed: self.pipeline.count(),
            cached_kinds: self.pipeline.cached_kinds().len(),
            high_water_mark: self.pipeline.high_water_mark(),
            known_files: status.known_files,
            active_file: status.active_file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_stop_without_watch_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let journal = Journal::new(JournalConfig::new(temp_dir.path())).unwrap();

        assert!(!journal.is_watching());
        journal.stop().await;
        assert_eq!(journal.stats(), JournalStats::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = JournalConfig::new("/tmp").with_rescan_interval(Duration::ZERO);
        assert!(Journal::new(config).is_err());
    }

    #[tokio::test]
    async fn test_watch_starts_single_supervisor() {
        let temp_dir = TempDir::new().unwrap();
        let journal = Journal::new(JournalConfig::new(temp_dir.path())).unwrap();

        journal.watch(|_| {});
        journal.watch(|_| {});
        assert!(journal.is_watching());

        journal.stop().await;
        assert!(!journal.is_watching());
        assert_eq!(journal.pipeline().count(), 0);
    }
}
