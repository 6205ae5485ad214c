//! Error types for journal ingestion
//!
//! Only failures that a caller can act on surface here. Malformed lines and
//! duplicate indexed entries are resolved locally and never become errors.

use std::path::PathBuf;

/// Result type for journal operations
pub type Result<T> = std::result::Result<T, JournalError>;

/// Errors raised by the indexed store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the ingestion pipeline and the journal facade
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// Store failure other than a uniqueness violation
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The journal directory could not be listed
    #[error("cannot list journal directory {}: {source}", .dir.display())]
    Discovery {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A journal file could not be read within the retry budget
    #[error("cannot read journal {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}
