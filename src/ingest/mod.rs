//! Ingestion: parsing, classification and the pipeline
//!
//! # Data flow
//!
//! ```text
//! ┌──────────────┐   ┌──────────┐   ┌────────────┐   ┌───────────────┐
//! │ Journal.*.log│──►│ parse()  │──►│ classify() │──►│ IndexedStore  │──┐
//! │ (retried     │   │ newest   │   │ by kind    │   │ (History)     │  │
//! │  read)       │   │ first    │   └────────────┘   ├───────────────┤  ├──► Notifier
//! └──────────────┘   └──────────┘         │          │ LatestCache   │──┘
//!                                         ▼          │ (LatestOnly)  │
//!                                      dropped       └───────────────┘
//!                                      (Ignore)
//! ```

mod classifier;
mod notifier;
pub mod parser;
mod pipeline;

pub use classifier::{Retention, RetentionPolicy, DEFAULT_HISTORY, DEFAULT_IGNORED};
pub use notifier::{EntryCallback, EntryNotice, Notifier};
pub use pipeline::{Pipeline, DEFAULT_EVENT_COUNT};
