//! Timestamp and date encoding shared by storage and tools.
//!
//! Timestamps are stored as UTC text in `YYYY-MM-DD HH:MM:SS` so that string
//! comparison in SQL matches chronological order.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::errors::DomainError;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_date(value: &NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS]`, `YYYY-MM-DDTHH:MM[:SS]` or a bare
/// date (midnight UTC). Values without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DomainError> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Ok(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default()));
    }

    Err(DomainError::InvalidTimestamp(raw.to_string()))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, DomainError> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Ok(date);
    }
    parse_timestamp(trimmed).map(|timestamp| timestamp.date_naive())
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::{format_timestamp, parse_date, parse_timestamp};

    #[test]
    fn parses_common_timestamp_shapes() {
        let rfc = parse_timestamp("2024-05-01T10:30:00+02:00").expect("rfc3339");
        assert_eq!(rfc.hour(), 8);

        let spaced = parse_timestamp("2024-05-01 10:30").expect("spaced");
        assert_eq!(format_timestamp(&spaced), "2024-05-01 10:30:00");

        let bare = parse_timestamp("2024-05-01").expect("date only");
        assert_eq!(format_timestamp(&bare), "2024-05-01 00:00:00");
    }

    #[test]
    fn date_parsing_truncates_timestamps() {
        let date = parse_date("2024-07-09T18:00:00Z").expect("timestamp as date");
        assert_eq!((date.year(), date.month(), date.day()), (2024, 7, 9));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("next tuesday").is_err());
    }
}
