//! Small text and time helpers shared by the reporter and the query client.

use chrono::{DateTime, SecondsFormat, Utc};

/// Truncate a string to `max_len` characters, ending with "..." when cut.
///
/// # Examples
/// ```ignore
/// assert_eq!(truncate("hello world", 8), "hello...");
/// assert_eq!(truncate("hi", 10), "hi");
/// ```
pub fn truncate(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        s.to_string()
    } else if max_len < 3 {
        "...".to_string()
    } else {
        format!("{}...", s.chars().take(max_len - 3).collect::<String>())
    }
}

/// Render an instant as ISO-8601 UTC with milliseconds, e.g. `2024-01-01T00:00:00.000Z`.
///
/// This is the form the analytics API accepts for `Time` variables and the
/// form written to the output file.
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Short `YYYY-MM-DD HH:MM` form for table headers.
pub fn format_instant_short(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d %H:%M").to_string()
}

/// Shorten an RFC 3339 string for display. Unparseable input is returned as is.
pub fn shorten_instant(value: &str) -> String {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| format_instant_short(dt.with_timezone(&Utc)))
        .unwrap_or_else(|_| value.to_string())
}
