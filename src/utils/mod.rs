//! Utility functions and helpers
//!
//! This module contains timestamp comparison helpers.

pub mod time;

pub use time::{compare_timestamps, is_newer, parse_timestamp};
