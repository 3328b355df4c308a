//! Date/time utilities for gator.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc, Weekday};

/// The publication date format feeds are expected to use (RFC 1123 with a
/// numeric zone), e.g. `Mon, 02 Jan 2006 15:04:05 -0700`.
pub const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// [`PUB_DATE_FORMAT`] after the leading `"<Day>, "`.
const PUB_DATE_BODY_FORMAT: &str = "%d %b %Y %H:%M:%S %z";

/// Parse an item's `pubDate` using [`PUB_DATE_FORMAT`].
///
/// The day name must be a valid abbreviation but is not checked against the
/// date. Returns `None` for anything else that does not match, including named
/// zones such as `GMT`.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let (day, body) = raw.trim().split_once(", ")?;
    if day.len() != 3 || day.parse::<Weekday>().is_err() {
        return None;
    }

    DateTime::parse_from_str(body, PUB_DATE_BODY_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format a timestamp for storage.
///
/// Always UTC with microsecond precision, so stored values are fixed width and
/// sort chronologically as text on every backend.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp (RFC 3339 or SQLite `YYYY-MM-DD HH:MM:SS`).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
