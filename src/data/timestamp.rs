//! ISO-8601 handling for `publishTime`.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use mongodb::bson;

// Inputs are canonicalized to a `T` separator and at least minute precision
// before these are tried.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

const DATE_LEN: usize = "YYYY-MM-DD".len();

/// What the importer does with a `publishTime` string it cannot parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampPolicy {
    /// Replace the value with the import start time and record the repair.
    #[default]
    Substitute,
    /// Abort the import before the collection is touched.
    Reject,
}

/// Parses an ISO-8601 timestamp. A trailing `Z` is read as `+00:00`, any
/// single non-digit character may separate date and time, the time may stop
/// at the hour, and values without an offset (including bare dates) are
/// taken as UTC.
pub fn parse_iso8601(raw: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = canonical_separator(&normalize_utc_marker(trimmed));

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(parsed);
    }
    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(&normalized, format) {
            return Some(parsed);
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

pub fn to_bson_datetime<Tz: TimeZone>(value: &DateTime<Tz>) -> bson::DateTime {
    bson::DateTime::from_millis(value.timestamp_millis())
}

fn normalize_utc_marker(value: &str) -> String {
    match value.strip_suffix(&['Z', 'z'][..]) {
        Some(stripped) => format!("{stripped}+00:00"),
        None => value.to_string(),
    }
}

/// Rewrites `date<sep>time[offset]` as `dateTtime[offset]`, padding an
/// hour-only time with `:00`. Anything else is returned unchanged.
fn canonical_separator(value: &str) -> String {
    let (Some(date), Some(rest)) = (value.get(..DATE_LEN), value.get(DATE_LEN..)) else {
        return value.to_string();
    };
    let mut chars = rest.chars();
    let Some(separator) = chars.next() else {
        return value.to_string();
    };
    if separator.is_ascii_digit() {
        return value.to_string();
    }

    let time = chars.as_str();
    let (clock, offset) = time.split_at(time.find(&['+', '-'][..]).unwrap_or(time.len()));
    if clock.len() == 2 && clock.bytes().all(|byte| byte.is_ascii_digit()) {
        format!("{date}T{clock}:00{offset}")
    } else {
        format!("{date}T{time}")
    }
}
