//! Wall-clock helpers.
//!
//! Envelope timestamps and mail record arrival times are Unix milliseconds
//! so that a wire record survives decode/encode without losing precision.

/// Returns the current Unix timestamp in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Formats a Unix millisecond timestamp as RFC 3339, for display only.
pub fn format_millis(millis: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        .unwrap_or_else(|| millis.to_string())
}
