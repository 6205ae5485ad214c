//! Data types for journal ingestion
//!
//! This module contains the core data structures shared by the parser,
//! the stores and the watch layer.

mod entry;
mod stats;

pub use entry::Entry;
pub use stats::JournalStats;
