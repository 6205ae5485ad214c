//! Latest-Value Cache
//!
//! Keeps exactly one entry per event kind: the one with the newest
//! timestamp seen so far.

use std::collections::HashMap;

use crate::types::Entry;
use crate::utils::time::is_newer;

/// In-memory map from event kind to its most recent entry
#[derive(Debug, Default)]
pub struct LatestCache {
    entries: HashMap<String, Entry>,
}

impl LatestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `entry` if its kind has no cached value or it is strictly newer
    ///
    /// Returns true when the cache changed.
    pub fn offer(&mut self, entry: &Entry) -> bool {
        match self.entries.get(&entry.event) {
            Some(current) if !is_newer(&entry.timestamp, &current.timestamp) => false,
            _ => {
                self.entries.insert(entry.event.clone(), entry.clone());
                true
            }
        }
    }

    pub fn get(&self, kind: &str) -> Option<&Entry> {
        self.entries.get(kind)
    }

    /// Cached event kinds
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn materials(ts: &str, x: i64) -> Entry {
        Entry::new("Materials", ts).with_field("x", json!(x))
    }

    #[test]
    fn test_newer_replaces_older() {
        let mut cache = LatestCache::new();

        assert!(cache.offer(&materials("2023-01-01T00:00:00Z", 1)));
        assert!(cache.offer(&materials("2023-01-01T00:00:05Z", 2)));

        assert_eq!(cache.get("Materials").unwrap().get("x"), Some(&json!(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_older_or_equal_does_not_replace() {
        let mut cache = LatestCache::new();

        assert!(cache.offer(&materials("2023-01-01T00:00:05Z", 2)));
        assert!(!cache.offer(&materials("2023-01-01T00:00:00Z", 1)));
        assert!(!cache.offer(&materials("2023-01-01T00:00:05Z", 3)));

        assert_eq!(cache.get("Materials").unwrap().get("x"), Some(&json!(2)));
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut cache = LatestCache::new();
        cache.offer(&materials("2023-01-01T00:00:05Z", 2));
        cache.offer(&Entry::new("Location", "2023-01-01T00:00:00Z"));

        let mut kinds: Vec<_> = cache.kinds().collect();
        kinds.sort();
        assert_eq!(kinds, vec!["Location", "Materials"]);
        assert!(cache.get("Cargo").is_none());
    }
}
