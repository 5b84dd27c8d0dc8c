//! Timestamp normalization.
//!
//! The API reports times in UTC, either as RFC 3339 strings or as Unix
//! seconds. Documents carry them as local wall-clock strings with minute
//! precision (`2017-03-01 20:15`).

use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde_json::Value;

use crate::{OffprintError, Result};

/// Display format of normalized timestamps.
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Parses an API timestamp into a UTC instant.
pub fn parse(raw: &Value) -> Result<DateTime<Utc>> {
    match raw {
        Value::String(text) => DateTime::parse_from_rfc3339(text.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| OffprintError::InvalidTimestamp(format!("{text}: {e}"))),
        Value::Number(number) => number
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| OffprintError::InvalidTimestamp(number.to_string())),
        other => Err(OffprintError::InvalidTimestamp(other.to_string())),
    }
}

/// Formats an API timestamp in the zone `tz`.
pub fn format_in<Tz>(raw: &Value, tz: &Tz) -> Result<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    Ok(parse(raw)?.with_timezone(tz).format(DISPLAY_FORMAT).to_string())
}

/// Formats an API timestamp in the process-local zone.
pub fn to_local(raw: &Value) -> Result<String> {
    format_in(raw, &Local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use serde_json::json;

    #[test]
    fn test_rfc3339_to_utc_display() {
        let formatted = format_in(&json!("2017-03-01T12:34:56Z"), &Utc).unwrap();
        assert_eq!(formatted, "2017-03-01 12:34");
    }

    #[test]
    fn test_offset_conversion() {
        let shanghai = FixedOffset::east_opt(8 * 3600).unwrap();
        let formatted = format_in(&json!("2017-03-01T20:15:00+00:00"), &shanghai).unwrap();
        assert_eq!(formatted, "2017-03-02 04:15");
    }

    #[test]
    fn test_source_offset_is_respected() {
        let formatted = format_in(&json!("2017-03-01T20:15:00+08:00"), &Utc).unwrap();
        assert_eq!(formatted, "2017-03-01 12:15");
    }

    #[test]
    fn test_unix_seconds() {
        let formatted = format_in(&json!(0), &Utc).unwrap();
        assert_eq!(formatted, "1970-01-01 00:00");
    }

    #[test]
    fn test_to_local_shape() {
        let formatted = to_local(&json!("2020-06-15T08:00:00Z")).unwrap();
        assert_eq!(formatted.len(), "2020-06-15 08:00".len());
        assert!(formatted.starts_with("2020-06-1"));
    }

    #[test]
    fn test_invalid_timestamps() {
        assert!(matches!(parse(&json!("yesterday")), Err(OffprintError::InvalidTimestamp(_))));
        assert!(matches!(parse(&json!(null)), Err(OffprintError::InvalidTimestamp(_))));
        assert!(matches!(parse(&json!(1.5)), Err(OffprintError::InvalidTimestamp(_))));
    }
}
