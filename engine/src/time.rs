//! Timestamp normalization.
//!
//! All timestamps that leave the engine (incremental filters, local stamps,
//! audit dates) are rendered as ISO-8601 UTC with millisecond precision.

use crate::{Error, Result, Timestamp};
use chrono::{NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Render a timestamp in canonical ISO-8601 form, e.g. `2024-03-01T12:00:00.000Z`.
pub fn to_iso(timestamp: Timestamp) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a timestamp in any of the accepted input forms.
///
/// Accepts RFC 3339 with any offset, naive `YYYY-MM-DD HH:MM:SS` (read as
/// UTC), and bare dates.
pub fn parse(input: &str) -> Result<Timestamp> {
    let trimmed = input.trim();

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    Err(Error::InvalidTimestamp(input.to_string()))
}

/// Re-render any accepted timestamp string in canonical form.
pub fn normalize(input: &str) -> Result<String> {
    parse(input).map(to_iso)
}

/// Whole seconds elapsed from `earlier` to `later`, rounded to nearest.
pub fn elapsed_secs(later: Timestamp, earlier: Timestamp) -> i64 {
    let millis = (later - earlier).num_milliseconds();
    (millis + 500).div_euclid(1000)
}
