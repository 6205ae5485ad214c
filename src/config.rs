//! Journal configuration
//!
//! Values come from `JournalConfig::default()` and can be overridden from the
//! environment with `JournalConfig::from_env()`:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `JOURNAL_DIR` | directory holding `Journal.*.log` files |
//! | `JOURNAL_INDEX_PATH` | persist the indexed store to this JSONL file |
//! | `JOURNAL_RESCAN_SECS` | directory rescan interval |
//! | `JOURNAL_WATCH_MS` | active file poll interval |

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{JournalError, Result};
use crate::ingest::RetentionPolicy;

/// Bounded exponential backoff for reading a file that is being written
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt
    pub retries: u32,
    /// Delay before the first retry
    pub min_delay: Duration,
    /// Growth factor applied after every retry
    pub factor: u32,
    /// Upper bound for a single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 10,
            min_delay: Duration::from_millis(50),
            factor: 2,
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let multiplier = self.factor.max(1).saturating_pow(exponent);
        self.min_delay
            .checked_mul(multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Configuration for discovery, polling and storage
#[derive(Debug, Clone)]
pub struct JournalConfig {
    /// Directory that holds the journal files
    pub dir: PathBuf,
    /// File name prefix of journal files (`Journal.` excludes `JournalAlpha.`)
    pub file_prefix: String,
    /// File name suffix of journal files
    pub file_suffix: String,
    /// How often the directory is rescanned for rotation
    pub rescan_interval: Duration,
    /// How often the active file is polled for changes
    pub watch_interval: Duration,
    /// Coalescing window for change notifications on the active file
    pub debounce: Duration,
    /// Backoff used when a journal file cannot be read
    pub read_retry: RetryPolicy,
    /// Optional JSONL file backing the indexed store
    pub index_path: Option<PathBuf>,
    /// Whether every append to the index file is fsynced
    pub sync_writes: bool,
    /// Which event kinds are ignored, indexed or cached
    pub retention: RetentionPolicy,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            dir: default_journal_dir(),
            file_prefix: "Journal.".to_string(),
            file_suffix: ".log".to_string(),
            rescan_interval: Duration::from_secs(10),
            watch_interval: Duration::from_millis(1000),
            debounce: Duration::from_millis(100),
            read_retry: RetryPolicy::default(),
            index_path: None,
            sync_writes: true,
            retention: RetentionPolicy::default(),
        }
    }
}

impl JournalConfig {
    /// Create config for a journal directory
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Build config from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(dir) = env::var("JOURNAL_DIR") {
            config.dir = resolve_path(&dir);
        }

        if let Ok(path) = env::var("JOURNAL_INDEX_PATH") {
            config.index_path = Some(resolve_path(&path));
        }

        if let Ok(secs) = env::var("JOURNAL_RESCAN_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| JournalError::Config(format!("JOURNAL_RESCAN_SECS: {secs:?}")))?;
            config.rescan_interval = Duration::from_secs(secs);
        }

        if let Ok(ms) = env::var("JOURNAL_WATCH_MS") {
            let ms: u64 = ms
                .parse()
                .map_err(|_| JournalError::Config(format!("JOURNAL_WATCH_MS: {ms:?}")))?;
            config.watch_interval = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject intervals that would turn the poll loops into busy loops
    pub fn validate(&self) -> Result<()> {
        if self.rescan_interval.is_zero() {
            return Err(JournalError::Config("rescan interval must be non-zero".into()));
        }
        if self.watch_interval.is_zero() {
            return Err(JournalError::Config("watch interval must be non-zero".into()));
        }
        if self.file_prefix.is_empty() {
            return Err(JournalError::Config("file prefix must not be empty".into()));
        }
        Ok(())
    }

    pub fn with_index_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.index_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_rescan_interval(mut self, interval: Duration) -> Self {
        self.rescan_interval = interval;
        self
    }

    pub fn with_watch_interval(mut self, interval: Duration) -> Self {
        self.watch_interval = interval;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_read_retry(mut self, policy: RetryPolicy) -> Self {
        self.read_retry = policy;
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Whether a file name follows the journal naming convention
    pub fn matches_file_name(&self, name: &str) -> bool {
        name.len() > self.file_prefix.len() + self.file_suffix.len()
            && name.starts_with(&self.file_prefix)
            && name.ends_with(&self.file_suffix)
    }
}

/// Default location the game writes its journals to
fn default_journal_dir() -> PathBuf {
    let home = env::var("USERPROFILE")
        .or_else(|_| env::var("HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));

    home.join("Saved Games")
        .join("Frontier Developments")
        .join("Elite Dangerous")
}

fn resolve_path(path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    }
}
