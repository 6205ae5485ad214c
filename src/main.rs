//! Journal Tail - Binary Entry Point
//!
//! Tails the journal directory and logs every newly-ingested entry until
//! Ctrl-C. The directory comes from the first argument or `JOURNAL_DIR`.

use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use journal_tail::{Journal, JournalConfig};

#[tokio::main]
async fn main() -> journal_tail::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = JournalConfig::from_env()?;
    if let Some(dir) = std::env::args().nth(1) {
        config.dir = PathBuf::from(dir);
    }

    info!(dir = %config.dir.display(), version = journal_tail::VERSION, "starting journal tail");

    let journal = Journal::new(config)?;
    journal.watch(|entry| {
        info!(event = %entry.event, timestamp = %entry.timestamp, "journal entry");
    });

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C, stopping");
    }

    let stats = journal.stats();
    journal.stop().await;
    info!(%stats, "journal tail stopped");
    Ok(())
}
