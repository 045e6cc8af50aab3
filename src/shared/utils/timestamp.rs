use chrono::{DateTime, SecondsFormat, Utc};

/// Render a timestamp in the fixed-width form used for every stored time column.
///
/// Microsecond precision with a `Z` suffix keeps lexicographic order equal to
/// chronological order, which the store relies on for range filters and `MAX()`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
