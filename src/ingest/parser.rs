//! Journal file reading and line parsing
//!
//! The game appends to the active journal while we read it, so a read may
//! fail transiently and the last line may be half written. Reads are retried
//! with bounded backoff; lines that do not parse are dropped.

use std::io;
use std::path::Path;

use rayon::prelude::*;
use tracing::{trace, warn};

use crate::config::RetryPolicy;
use crate::types::Entry;

/// Parse raw journal content into entries, most recent first
///
/// Each line is parsed on its own. Lines that are not a JSON object with
/// `event` and `timestamp` are skipped without error. Derived metadata found
/// in a line is discarded: the checksum is always computed from content.
pub fn parse(raw: &str, source: Option<&Path>) -> Vec<Entry> {
    let lines: Vec<&str> = raw.lines().collect();

    let entries: Vec<Entry> = lines
        .par_iter()
        .rev()
        .filter_map(|line| Entry::from_json_line(line))
        .map(|mut entry| {
            entry.checksum = None;
            entry.source = source.map(Path::to_path_buf);
            entry
        })
        .collect();

    let skipped = lines.iter().filter(|l| !l.trim().is_empty()).count() - entries.len();
    if skipped > 0 {
        trace!(skipped, "dropped unparseable journal lines");
    }

    entries
}

/// Read a whole journal file, retrying transient failures
///
/// Makes one attempt plus up to `policy.retries` retries, sleeping
/// `policy.delay_for(n)` before retry `n`. Returns the last error once the
/// budget is spent.
pub async fn read_with_retry(path: &Path, policy: &RetryPolicy) -> io::Result<String> {
    let mut attempt = 0;
    loop {
        match tokio::fs::read(path).await {
            Ok(bytes) => return Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if attempt < policy.retries => {
                attempt += 1;
                let delay = policy.delay_for(attempt);
                trace!(path = %path.display(), attempt, error = %e, "journal read failed, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                warn!(path = %path.display(), attempts = attempt + 1, error = %e, "giving up on journal read");
                return Err(e);
            }
        }
    }
}

/// Read and parse one journal file
pub async fn load_file(path: &Path, policy: &RetryPolicy) -> io::Result<Vec<Entry>> {
    let raw = read_with_retry(path, policy).await?;
    Ok(parse(&raw, Some(path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    const LOG: &str = concat!(
        r#"{"timestamp":"2023-01-01T00:00:00Z","event":"Fileheader","part":1}"#,
        "\n",
        r#"{"timestamp":"2023-01-01T00:00:01Z","event":"LoadGame","Commander":"Jameson"}"#,
        "\n",
        "not valid json\n",
        "\n",
        r#"{"timestamp":"2023-01-01T00:00:02Z","event":"Music","MusicTrack":"NoTrack"}"#,
        "\n",
        r#"{"timestamp":"2023-01-01T00:00:03Z","event":"Loca"#,
    );

    #[test]
    fn test_parse_reverses_and_skips_bad_lines() {
        let entries = parse(LOG, None);

        let events: Vec<_> = entries.iter().map(|e| e.event.as_str()).collect();
        assert_eq!(events, vec!["Music", "LoadGame", "Fileheader"]);
    }

    #[test]
    fn test_parse_tags_source() {
        let entries = parse(LOG, Some(Path::new("Journal.1.log")));
        assert!(entries
            .iter()
            .all(|e| e.source.as_deref() == Some(Path::new("Journal.1.log"))));
    }

    #[test]
    fn test_parse_discards_supplied_checksum() {
        let raw = concat!(
            r#"{"timestamp":"2023-01-01T00:00:00Z","event":"FSSDiscoveryScan","_checksum":"abc","_source":"x.log"}"#,
            "\n",
        );
        let entries = parse(raw, None);

        assert_eq!(entries.len(), 1);
        assert!(entries[0].checksum.is_none());
        assert!(entries[0].source.is_none());
        assert!(!entries[0].fields.contains_key("_checksum"));
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse("", None).is_empty());
        assert!(parse("\n\n", None).is_empty());
    }

    #[tokio::test]
    async fn test_load_file_reads_entries() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Journal.1.log");
        std::fs::write(&path, LOG).unwrap();

        let entries = load_file(&path, &RetryPolicy::default()).await.unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[tokio::test]
    async fn test_read_retry_is_bounded() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Journal.missing.log");
        let policy = RetryPolicy {
            retries: 3,
            min_delay: Duration::from_millis(1),
            factor: 2,
            max_delay: Duration::from_millis(4),
        };

        let started = Instant::now();
        let err = read_with_retry(&path, &policy).await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_read_succeeds_once_file_appears() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Journal.late.log");
        let policy = RetryPolicy {
            retries: 10,
            min_delay: Duration::from_millis(20),
            factor: 2,
            max_delay: Duration::from_millis(100),
        };

        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            let staging = writer_path.with_extension("tmp");
            std::fs::write(&staging, LOG).unwrap();
            std::fs::rename(&staging, &writer_path).unwrap();
        });

        let raw = read_with_retry(&path, &policy).await.unwrap();
        writer.await.unwrap();
        assert_eq!(raw, LOG);
    }
}
