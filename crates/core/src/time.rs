//! Timestamp formatting shared by documents and filters.
//!
//! Stored timestamps use RFC 3339 with millisecond precision and a `Z`
//! suffix, so string ordering and chronological ordering agree.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse either a full RFC 3339 timestamp or a bare `YYYY-MM-DD` date
/// (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
