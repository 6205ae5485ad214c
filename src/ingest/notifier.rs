//! Per-entry notification fan-out
//!
//! Consumers either register a callback, invoked synchronously once per
//! newly-ingested entry, or subscribe to a broadcast channel. A panicking
//! callback is logged and does not affect other callbacks or later entries.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::error;

use crate::types::Entry;

/// Callback invoked for every newly-ingested entry
pub type EntryCallback = Arc<dyn Fn(&Entry) + Send + Sync>;

/// Message sent to broadcast subscribers
#[derive(Debug, Clone)]
pub struct EntryNotice {
    /// Monotonic sequence number, starting at 0
    pub sequence_id: u64,
    pub entry: Arc<Entry>,
}

/// Delivers newly-ingested entries to callbacks and subscribers
pub struct Notifier {
    callbacks: RwLock<Vec<EntryCallback>>,
    tx: broadcast::Sender<EntryNotice>,
    sequence_counter: AtomicU64,
}

impl Notifier {
    /// Create a notifier whose broadcast channel buffers `capacity` notices
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            callbacks: RwLock::new(Vec::new()),
            tx,
            sequence_counter: AtomicU64::new(0),
        }
    }

    /// Register a callback for all future entries
    pub fn register(&self, callback: EntryCallback) {
        self.callbacks.write().push(callback);
    }

    /// Drop every registered callback
    pub fn clear_callbacks(&self) {
        self.callbacks.write().clear();
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.read().len()
    }

    /// Subscribe to receive broadcast notices
    pub fn subscribe(&self) -> broadcast::Receiver<EntryNotice> {
        self.tx.subscribe()
    }

    /// Number of notices sent so far
    pub fn current_sequence_id(&self) -> u64 {
        self.sequence_counter.load(Ordering::SeqCst)
    }

    /// Deliver entries in order to every callback and subscriber
    pub fn notify(&self, entries: &[Entry]) {
        if entries.is_empty() {
            return;
        }

        // Clone the list so callbacks may register further callbacks
        let callbacks: Vec<EntryCallback> = self.callbacks.read().clone();

        for entry in entries {
            for callback in &callbacks {
                let result = panic::catch_unwind(AssertUnwindSafe(|| callback(entry)));
                if result.is_err() {
                    error!(event = %entry.event, timestamp = %entry.timestamp, "entry callback panicked");
                }
            }

            let seq = self.sequence_counter.fetch_add(1, Ordering::SeqCst);
            // No receivers is fine
            let _ = self.tx.send(EntryNotice {
                sequence_id: seq,
                entry: Arc::new(entry.clone()),
            });
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(1024)
    }
}
