//! Conversion of compact page timestamps.

use chrono::NaiveDateTime;

const COMPACT_FORMAT: &str = "%Y%m%d%H%M%S";
const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Convert a 14-digit `YYYYMMDDHHMMSS` timestamp to ISO-8601 (UTC).
///
/// Empty or malformed input yields an empty string.
pub fn compact_to_iso8601(timestamp: &str) -> String {
    if timestamp.len() != 14 || !timestamp.bytes().all(|b| b.is_ascii_digit()) {
        return String::new();
    }

    NaiveDateTime::parse_from_str(timestamp, COMPACT_FORMAT)
        .map(|dt| dt.and_utc().format(ISO_FORMAT).to_string())
        .unwrap_or_default()
}
