//! Journal timestamp utilities
//!
//! Journal timestamps are ISO-8601 strings such as `2023-01-01T00:00:05Z`.
//! They are compared as instants. A string that does not parse sorts before
//! every instant, and such strings order among themselves as plain text, so
//! the comparison stays a total order over any mix of inputs.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

/// Parse a journal timestamp into a UTC instant
pub fn parse_timestamp(timestamp: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Order two journal timestamps
pub fn compare_timestamps(a: &str, b: &str) -> Ordering {
    match (parse_timestamp(a), parse_timestamp(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// True if `candidate` is strictly later than `current`
pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare_timestamps(candidate, current) == Ordering::Greater
}
