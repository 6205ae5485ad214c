//! Retention classification
//!
//! Decides per event kind whether an entry is dropped, kept in full in the
//! indexed store, or only kept as the latest instance of its kind.

use std::collections::HashSet;

/// Kinds that never reach a store
pub const DEFAULT_IGNORED: &[&str] = &["Music"];

/// Kinds that describe a stream of distinct facts and are kept in full
pub const DEFAULT_HISTORY: &[&str] = &["FSSBodySignals", "FSSDiscoveryScan", "FSSSignalDiscovered"];

/// Where an entry of a given kind goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Retention {
    /// Dropped entirely
    Ignore,
    /// Checksummed and kept in the indexed store
    History,
    /// Only the newest entry of the kind is cached
    LatestOnly,
}

impl std::fmt::Display for Retention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Retention::Ignore => write!(f, "ignore"),
            Retention::History => write!(f, "history"),
            Retention::LatestOnly => write!(f, "latest_only"),
        }
    }
}

/// Membership sets used to classify event kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    ignored: HashSet<String>,
    history: HashSet<String>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            ignored: DEFAULT_IGNORED.iter().map(|s| s.to_string()).collect(),
            history: DEFAULT_HISTORY.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl RetentionPolicy {
    /// Policy with no ignored and no history kinds: everything is latest-only
    pub fn empty() -> Self {
        Self {
            ignored: HashSet::new(),
            history: HashSet::new(),
        }
    }

    /// Add a kind to the ignore set
    pub fn ignore(mut self, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        self.history.remove(&kind);
        self.ignored.insert(kind);
        self
    }

    /// Add a kind to the history set
    pub fn history(mut self, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        self.ignored.remove(&kind);
        self.history.insert(kind);
        self
    }

    pub fn classify(&self, kind: &str) -> Retention {
        if self.ignored.contains(kind) {
            Retention::Ignore
        } else if self.history.contains(kind) {
            Retention::History
        } else {
            Retention::LatestOnly
        }
    }
}
