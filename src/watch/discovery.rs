//! Journal file discovery

use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use tracing::debug;

use crate::config::JournalConfig;
use crate::error::{JournalError, Result};

use super::file_watch::FileWatch;

/// One journal file on disk
#[derive(Debug)]
pub struct SourceFile {
    /// Full path to the file
    pub path: PathBuf,
    /// Last modification time at discovery
    pub last_modified: SystemTime,
    /// Poll task, present only while this is the active file
    pub watch: Option<FileWatch>,
}

impl SourceFile {
    pub fn new(path: PathBuf, last_modified: SystemTime) -> Self {
        Self {
            path,
            last_modified,
            watch: None,
        }
    }

    pub fn is_watched(&self) -> bool {
        self.watch.is_some()
    }
}

/// List the journal files in the configured directory
///
/// Only names matching the configured prefix and suffix are returned, so
/// `JournalAlpha.*.log` and `JournalBeta.*.log` never show up for the
/// default `Journal.` prefix.
pub fn discover(config: &JournalConfig) -> Result<Vec<SourceFile>> {
    let read_dir = fs::read_dir(&config.dir).map_err(|source| JournalError::Discovery {
        dir: config.dir.clone(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in read_dir.filter_map(|e| e.ok()) {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !config.matches_file_name(name) {
            continue;
        }

        // The file can vanish between listing and stat
        let metadata = match entry.metadata() {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => continue,
            Err(e) => {
                debug!(path = %entry.path().display(), error = %e, "cannot stat journal file");
                continue;
            }
        };
        let last_modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        files.push(SourceFile::new(entry.path(), last_modified));
    }

    Ok(files)
}

/// The most recently modified file; ties go to the later file name
pub fn most_recent(files: &[SourceFile]) -> Option<&SourceFile> {
    files.iter().max_by(|a, b| {
        a.last_modified
            .cmp(&b.last_modified)
            .then_with(|| a.path.cmp(&b.path))
    })
}
