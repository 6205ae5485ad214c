//! File discovery, per-file polling and rotation handling
//!
//! - `discover`: lists `Journal.*.log` files with their modification times
//! - `FileWatch`: polls the active file and triggers debounced loads
//! - `Supervisor`: rescans on an interval and moves the watch on rotation

mod discovery;
mod file_watch;
mod supervisor;

pub use discovery::{discover, most_recent, SourceFile};
pub use file_watch::FileWatch;
pub use supervisor::{Supervisor, SupervisorStatus};
