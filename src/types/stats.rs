//! Journal statistics snapshot

use std::path::PathBuf;

use serde::Serialize;

/// Point-in-time view of the ingestion state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JournalStats {
    /// Entries in the indexed store
    pub indexed: usize,
    /// Event kinds held in the latest-value cache
    pub cached_kinds: usize,
    /// Latest timestamp observed so far
    pub high_water_mark: Option<String>,
    /// Journal files seen by the supervisor
    pub known_files: usize,
    /// File currently being watched
    pub active_file: Option<PathBuf>,
}

impl std::fmt::Display for JournalStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} indexed, {} cached kinds, {} files, newest {}",
            self.indexed,
            self.cached_kinds,
            self.known_files,
            self.high_water_mark.as_deref().unwrap_or("-")
        )
    }
}
