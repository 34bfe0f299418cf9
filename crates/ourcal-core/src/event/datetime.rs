//! Timestamp parsing and storage encoding
//!
//! Input timestamps are accepted in several ISO-8601 shapes. Values without an
//! offset are taken as UTC; everything is normalized to UTC before storage.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::{Error, Result};

/// Offset-carrying formats tried after RFC 3339.
///
/// `%#z` accepts `Z`, `+02`, `+0200` and `+02:00`.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M%#z",
    "%Y%m%dT%H%M%S%.f%#z",
    "%Y%m%dT%H%M%#z",
];

/// Naive date-time formats, interpreted as UTC
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S%.f",
    "%Y%m%dT%H%M",
];

/// Date-only formats, taken as midnight UTC
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];

/// Fixed-width storage format; sorts lexicographically in time order
const STORAGE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Parse a user-supplied timestamp
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>> {
    let value = input.trim();

    let rfc3339_err = match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => return Ok(dt.with_timezone(&Utc)),
        Err(e) => e,
    };

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }

    for format in DATE_FORMATS {
        if let Some(naive) = NaiveDate::parse_from_str(value, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
        {
            return Ok(naive.and_utc());
        }
    }

    Err(Error::InvalidDate(format!(
        "Invalid date '{}': {}",
        input, rfc3339_err
    )))
}

/// Encode a timestamp for the database
pub fn to_storage(value: &DateTime<Utc>) -> String {
    value.format(STORAGE_FORMAT).to_string()
}

/// Decode a timestamp read from the database
pub fn from_storage(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
