//! Journal Tail
//!
//! Rotation-aware ingestion of line-delimited JSON journal files, with a
//! deduplicated and queryable view of the event stream.
//!
//! # Features
//!
//! - **Polling tail**: the active journal is polled, never watched through OS events
//! - **Rotation safe**: a rotated-out file always gets a final load
//! - **Deduplicated history**: history-worthy kinds are unique by SHA-256 checksum
//! - **Latest values**: every other kind keeps only its newest entry
//! - **Notifications**: callbacks and a broadcast channel, once per new entry
//!
//! # Modules
//!
//! - `types`: `Entry` and `JournalStats`
//! - `ingest`: parser, retention classifier, notifier and pipeline
//! - `store`: indexed store and latest-value cache
//! - `watch`: discovery, per-file polling and the rotation supervisor
//! - `config`: `JournalConfig` and `RetryPolicy`
//! - `journal`: the `Journal` facade consumers use
//!
//! # Example
//!
//! ```no_run
//! use journal_tail::{Journal, JournalConfig};
//!
//! #[tokio::main]
//! async fn main() -> journal_tail::Result<()> {
//!     let journal = Journal::new(JournalConfig::from_env()?)?;
//!     journal.watch(|entry| println!("{} {}", entry.timestamp, entry.event));
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     journal.stop().await;
//!     println!("{:?}", journal.get_event("Location"));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ingest;
pub mod journal;
pub mod store;
pub mod types;
pub mod utils;
pub mod watch;

// Re-export commonly used items at crate root
pub use config::{JournalConfig, RetryPolicy};
pub use error::{JournalError, Result, StoreError};
pub use ingest::{EntryNotice, Pipeline, Retention, RetentionPolicy};
pub use journal::Journal;
pub use types::{Entry, JournalStats};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
