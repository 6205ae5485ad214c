//! Watch and Rotation Integration Tests
//!
//! Tests for the background supervisor:
//! - Entries appended to the active journal are delivered once
//! - Rotation to a new journal never loses the old file's tail
//! - No callback fires after stop

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use journal_tail::{Entry, Journal, JournalConfig};
use parking_lot::Mutex;
use tempfile::TempDir;

fn fast_config(dir: &Path) -> JournalConfig {
    JournalConfig::new(dir)
        .with_rescan_interval(Duration::from_millis(50))
        .with_watch_interval(Duration::from_millis(20))
        .with_debounce(Duration::from_millis(5))
}

fn append(path: &Path, lines: &[String], age: Duration) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .expect("Failed to open journal");
    // One write call, so a concurrent reader sees all of these lines or none
    let mut chunk = String::new();
    for line in lines {
        chunk.push_str(line);
        chunk.push('\n');
    }
    file.write_all(chunk.as_bytes())
        .expect("Failed to write journal lines");
    file.set_modified(SystemTime::now() - age)
        .expect("Failed to set modification time");
}

fn signal(second: u32, name: &str) -> String {
    format!(
        r#"{{"event":"FSSSignalDiscovered","timestamp":"2023-01-01T00:00:{:02}Z","SignalName":"{}"}}"#,
        second, name
    )
}

fn recorder() -> (Arc<Mutex<Vec<Entry>>>, impl Fn(&Entry) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |e: &Entry| sink.lock().push(e.clone()))
}

async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..300 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn test_watch_delivers_startup_and_appended_entries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Journal.2023-01-01T000000.01.log");
    append(&path, &[signal(0, "A")], Duration::ZERO);

    let journal = Journal::new(fast_config(dir.path())).unwrap();
    let (seen, callback) = recorder();
    journal.watch(callback);

    assert!(wait_until(|| seen.lock().len() == 1).await);

    append(&path, &[signal(1, "B"), signal(2, "C")], Duration::ZERO);
    assert!(wait_until(|| seen.lock().len() == 3).await);

    journal.stop().await;

    let names: Vec<_> = seen
        .lock()
        .iter()
        .map(|e| e.get("SignalName").unwrap().as_str().unwrap().to_string())
        .collect();
    // Each newly-ingested entry exactly once; within a load, newest first
    assert_eq!(names.len(), 3);
    assert_eq!(names[0], "A");
    let rest: HashSet<&str> = names[1..].iter().map(String::as_str).collect();
    assert_eq!(rest, HashSet::from(["B", "C"]));
    assert_eq!(journal.count(), 3);
}

#[tokio::test]
async fn test_rotation_keeps_tail_of_previous_journal() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("Journal.2023-01-01T000000.01.log");
    let second = dir.path().join("Journal.2023-01-01T000100.01.log");

    // The active file is polled rarely, so its tail is only seen on rotation
    let config = fast_config(dir.path()).with_watch_interval(Duration::from_secs(3600));
    let journal = Journal::new(config).unwrap();
    let (seen, callback) = recorder();

    append(&first, &[signal(0, "A")], Duration::from_secs(30));
    journal.watch(callback);
    assert!(wait_until(|| journal.stats().active_file.as_deref() == Some(first.as_path())).await);
    assert!(wait_until(|| seen.lock().len() == 1).await);

    append(&first, &[signal(10, "B"), signal(11, "C")], Duration::from_secs(30));
    append(&second, &[signal(20, "D")], Duration::ZERO);

    assert!(wait_until(|| journal.stats().active_file.as_deref() == Some(second.as_path())).await);
    assert!(wait_until(|| seen.lock().len() == 4).await);
    journal.stop().await;

    let names: HashSet<String> = seen
        .lock()
        .iter()
        .map(|e| e.get("SignalName").unwrap().as_str().unwrap().to_string())
        .collect();
    let expected: HashSet<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
    assert_eq!(names, expected);
    assert_eq!(seen.lock().len(), 4);
    assert_eq!(journal.count(), 4);
}

#[tokio::test]
async fn test_no_callbacks_after_stop() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Journal.2023-01-01T000000.01.log");
    append(&path, &[signal(0, "A")], Duration::ZERO);

    let journal = Journal::new(fast_config(dir.path())).unwrap();
    let (seen, callback) = recorder();
    journal.watch(callback);
    assert!(wait_until(|| seen.lock().len() == 1).await);

    journal.stop().await;
    append(&path, &[signal(1, "B")], Duration::ZERO);
    journal.load(Some(&path)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(seen.lock().len(), 1);
    assert_eq!(journal.count(), 2);
}

#[tokio::test]
async fn test_panicking_callback_does_not_stop_ingestion() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Journal.2023-01-01T000000.01.log");
    append(&path, &[signal(0, "A")], Duration::ZERO);

    let journal = Journal::new(fast_config(dir.path())).unwrap();
    journal.watch(|_| panic!("consumer failure"));
    let (seen, callback) = recorder();
    journal.watch(callback);

    assert!(wait_until(|| seen.lock().len() == 1).await);
    append(&path, &[signal(1, "B")], Duration::ZERO);
    assert!(wait_until(|| seen.lock().len() == 2).await);

    journal.stop().await;
}

#[tokio::test]
async fn test_subscribers_see_watched_entries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Journal.2023-01-01T000000.01.log");

    let journal = Journal::new(fast_config(dir.path())).unwrap();
    let mut rx = journal.subscribe();
    journal.watch(|_| {});

    append(&path, &[signal(0, "A")], Duration::ZERO);
    let notice = tokio::time::timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("no notice received")
        .unwrap();

    assert_eq!(notice.entry.event, "FSSSignalDiscovered");
    journal.stop().await;
}
