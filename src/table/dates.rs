//! Recognised date formats and the canonical date rendering.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike as _};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d %b %Y"];

/// Parse a date or date-time in any recognised format.
///
/// Offsets (RFC 3339) are converted to UTC and dropped. Calendar dates become
/// midnight date-times.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// ISO 8601 rendering: `YYYY-MM-DD` for midnight, full date-time otherwise.
pub fn render_date(dt: NaiveDateTime) -> String {
    if dt.time() == NaiveTime::MIN {
        dt.format("%Y-%m-%d").to_string()
    } else if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date")
    }

    #[test]
    fn test_recognised_formats() {
        let expected = ymd(2024, 1, 3);
        for raw in ["2024-01-03", "2024/01/03", "01/03/2024", "03 Jan 2024"] {
            assert_eq!(parse_date(raw), Some(expected), "format {raw}");
        }
    }

    #[test]
    fn test_datetime_and_offsets() {
        let parsed = parse_date("2024-01-03T10:30:00").expect("datetime");
        assert_eq!(render_date(parsed), "2024-01-03T10:30:00");

        let utc = parse_date("2024-01-03T10:30:00+02:00").expect("rfc3339");
        assert_eq!(render_date(utc), "2024-01-03T08:30:00");

        let spaced = parse_date("2024-01-03 10:30:00.250").expect("fractional");
        assert_eq!(render_date(spaced), "2024-01-03T10:30:00.250");
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("2024-13-45"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_midnight_renders_as_calendar_date() {
        assert_eq!(render_date(ymd(2024, 2, 29)), "2024-02-29");
    }
}
