//! Entry stores
//!
//! - `IndexedStore`: full, checksum-unique history for history-worthy kinds
//! - `LatestCache`: newest entry per kind for everything else
//!
//! Both are owned by the ingestion pipeline, which is their only writer.

mod indexed;
mod latest;

pub use indexed::{IndexedStore, InsertOutcome, StoreResult};
pub use latest::LatestCache;
