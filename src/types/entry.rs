//! Journal entry type
//!
//! An `Entry` is one line of a journal file: a flat JSON object with at least
//! an `event` kind and a `timestamp`, plus any number of kind-specific fields.

use std::cmp::Ordering;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::utils::time::{compare_timestamps, parse_timestamp};

/// A single journal event record
///
/// Entries are immutable once ingested. `checksum` is only assigned to
/// entries kept in the indexed store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Event kind, e.g. `FSSDiscoveryScan`
    pub event: String,
    /// ISO-8601 timestamp written by the game
    pub timestamp: String,
    /// Kind-specific payload
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    /// SHA-256 of the canonical form (indexed entries only)
    #[serde(rename = "_checksum", default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Journal file this entry was read from
    #[serde(rename = "_source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl Entry {
    /// Create an entry with an empty payload
    pub fn new(event: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            timestamp: timestamp.into(),
            fields: Map::new(),
            checksum: None,
            source: None,
        }
    }

    /// Add a payload field (builder style, mostly for tests and fixtures)
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Parse a single journal line
    ///
    /// Returns `None` for blank lines, half-written lines and objects that
    /// lack a string `event` or an RFC 3339 `timestamp`.
    pub fn from_json_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let entry: Self = serde_json::from_str(line).ok()?;
        parse_timestamp(&entry.timestamp)?;
        Some(entry)
    }

    /// Serialize to a single JSON line (including derived metadata)
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Look up a payload field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Canonical serialized form: event, timestamp and payload with sorted
    /// keys. Derived metadata never takes part.
    pub fn canonical_json(&self) -> String {
        let mut object = self.fields.clone();
        object.insert("event".to_string(), Value::String(self.event.clone()));
        object.insert("timestamp".to_string(), Value::String(self.timestamp.clone()));
        Value::Object(object).to_string()
    }

    /// Hex SHA-256 of the canonical form
    pub fn compute_checksum(&self) -> String {
        hex::encode(Sha256::digest(self.canonical_json().as_bytes()))
    }

    /// Return the entry with its checksum assigned
    ///
    /// A checksum already present is kept; journal lines have theirs
    /// stripped by the parser, so only replayed index lines carry one.
    pub fn with_checksum(mut self) -> Self {
        if self.checksum.is_none() {
            self.checksum = Some(self.compute_checksum());
        }
        self
    }

    /// Order by timestamp
    pub fn cmp_timestamp(&self, other: &Entry) -> Ordering {
        compare_timestamps(&self.timestamp, &other.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_line_with_payload() {
        let entry = Entry::from_json_line(
            r#"{"timestamp":"2023-01-01T00:00:00Z","event":"FSSDiscoveryScan","Progress":0.5,"BodyCount":12}"#,
        )
        .unwrap();

        assert_eq!(entry.event, "FSSDiscoveryScan");
        assert_eq!(entry.timestamp, "2023-01-01T00:00:00Z");
        assert_eq!(entry.get("BodyCount"), Some(&json!(12)));
        assert!(entry.checksum.is_none());
        assert!(entry.source.is_none());
    }

    #[test]
    fn test_rejects_incomplete_lines() {
        assert!(Entry::from_json_line("").is_none());
        assert!(Entry::from_json_line("   ").is_none());
        assert!(Entry::from_json_line("not valid json").is_none());
        assert!(Entry::from_json_line(r#"{"event":"Music","timest"#).is_none());
        assert!(Entry::from_json_line(r#"{"timestamp":"2023-01-01T00:00:00Z"}"#).is_none());
        assert!(Entry::from_json_line(r#"{"event":"Music"}"#).is_none());
        assert!(Entry::from_json_line("[1,2,3]").is_none());
    }

    #[test]
    fn test_rejects_unparseable_timestamp() {
        assert!(Entry::from_json_line(r#"{"event":"Location","timestamp":"yesterday"}"#).is_none());
        assert!(Entry::from_json_line(r#"{"event":"Location","timestamp":"2023-13-01T00:00:00Z"}"#).is_none());
        assert!(Entry::from_json_line(r#"{"event":"Location","timestamp":"2023-01-01T00:00:00+01:00"}"#).is_some());
    }

    #[test]
    fn test_checksum_ignores_key_order_and_metadata() {
        let a = Entry::from_json_line(r#"{"event":"Scan","timestamp":"2023-01-01T00:00:00Z","a":1,"b":2}"#).unwrap();
        let mut b = Entry::from_json_line(r#"{"b":2,"a":1,"timestamp":"2023-01-01T00:00:00Z","event":"Scan"}"#).unwrap();
        b.source = Some(PathBuf::from("Journal.1.log"));

        assert_eq!(a.compute_checksum(), b.compute_checksum());
        assert_eq!(a.compute_checksum().len(), 64);

        let c = a.clone().with_field("a", json!(3));
        assert_ne!(a.compute_checksum(), c.compute_checksum());
    }

    #[test]
    fn test_json_line_keeps_metadata() {
        let mut entry = Entry::new("FSSSignalDiscovered", "2023-01-01T00:00:00Z")
            .with_field("SignalName", json!("Beacon"))
            .with_checksum();
        entry.source = Some(PathBuf::from("Journal.1.log"));

        let line = entry.to_json_line().unwrap();
        assert!(line.contains("\"_checksum\""));

        let parsed = Entry::from_json_line(&line).unwrap();
        assert_eq!(parsed, entry);
    }
}
