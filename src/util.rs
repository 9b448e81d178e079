//! Shared helpers for the treescribe codebase

use chrono::Local;

/// Timestamp format used in progress markers and host reports
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Return the longest prefix of `s` holding at most `max` characters.
/// Counts `char`s, not bytes, so multi-byte names never split mid-codepoint.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Current local time as `YYYY-MM-DD HH:MM:SS`
pub fn local_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}
