//! Timestamp utilities
//!
//! The backend formats capture times for display (`16/10/2026`, `14.05.32`).
//! These helpers turn them back into sortable instants.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::{Error, Result};

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H.%M.%S", "%H:%M", "%H.%M"];

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a backend-formatted capture date
pub fn parse_capture_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| Error::MalformedPayload(format!("unrecognized capture date '{raw}'")))
}

/// Parse a backend-formatted time of day
pub fn parse_capture_time(raw: &str) -> Result<NaiveTime> {
    let raw = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| Error::MalformedPayload(format!("unrecognized capture time '{raw}'")))
}

/// Combine the separately formatted date and time into one instant
pub fn parse_capture_instant(date: &str, time: &str) -> Result<NaiveDateTime> {
    Ok(parse_capture_date(date)?.and_time(parse_capture_time(time)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_parse_day_first_date() {
        let date = parse_capture_date("16/10/2026").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2026, 10, 16));
    }

    #[test]
    fn test_parse_unpadded_date() {
        let date = parse_capture_date("6/1/2026").unwrap();
        assert_eq!((date.month(), date.day()), (1, 6));
    }

    #[test]
    fn test_parse_iso_date() {
        let date = parse_capture_date("2026-10-16").unwrap();
        assert_eq!(date.day(), 16);
    }

    #[test]
    fn test_parse_dotted_time() {
        let time = parse_capture_time("14.05.32").unwrap();
        assert_eq!((time.hour(), time.minute(), time.second()), (14, 5, 32));
    }

    #[test]
    fn test_parse_time_without_seconds() {
        let time = parse_capture_time("08:30").unwrap();
        assert_eq!((time.hour(), time.minute(), time.second()), (8, 30, 0));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            parse_capture_date("yesterday"),
            Err(Error::MalformedPayload(_))
        ));
        assert!(matches!(
            parse_capture_time("25:99:00"),
            Err(Error::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_instant_orders_by_date_then_time() {
        let a = parse_capture_instant("15/10/2026", "23:59:59").unwrap();
        let b = parse_capture_instant("16/10/2026", "00:00:01").unwrap();
        assert!(b > a);
    }
}
