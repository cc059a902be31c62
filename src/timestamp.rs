//! Timestamp parsing and normalization to a fixed UTC offset
//!
//! Source files mix timezone-naive strings (forum exports, averaged lap
//! tables) with offset-aware ones (telemetry APIs). Naive values are read as
//! wall-clock time in the configured offset; aware values are converted to it.
//! After normalization every timestamp compares on the same clock.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone};

/// Korea Standard Time, the default normalization offset (no DST)
pub const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Output format used for every normalized timestamp column
pub const OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

const AWARE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
];

/// Parse a UTC offset such as `+09:00`, `+0900`, `-05:30`, `Z` or `UTC`
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let s = raw.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| Error::config("invalid UTC offset"));
    }

    let (sign, rest) = match s.chars().next() {
        Some('+') => (1, &s[1..]),
        Some('-') => (-1, &s[1..]),
        _ => {
            return Err(Error::config(format!(
                "Invalid UTC offset '{}': expected +HH:MM",
                s
            )))
        }
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::config(format!(
            "Invalid UTC offset '{}': expected +HH:MM",
            s
        )));
    }

    let hours: i32 = digits[..2].parse().map_err(|_| Error::config("bad hours"))?;
    let minutes: i32 = digits[2..].parse().map_err(|_| Error::config("bad minutes"))?;
    if minutes >= 60 {
        return Err(Error::config(format!(
            "Invalid UTC offset '{}': minutes out of range",
            s
        )));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| Error::config(format!("UTC offset '{}' out of range", s)))
}

/// Render a normalized timestamp as `YYYY-MM-DD HH:MM:SS.mmm`
pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.format(OUTPUT_FORMAT).to_string()
}

/// Duration in (fractional) seconds with millisecond resolution
pub fn duration_secs(d: Duration) -> f64 {
    d.num_milliseconds() as f64 / 1000.0
}

/// Converts raw timestamp strings to one fixed offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    offset: FixedOffset,
}

impl Normalizer {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Normalizer for Korea Standard Time
    pub fn kst() -> Self {
        Self::new(FixedOffset::east_opt(KST_OFFSET_SECS).expect("+09:00 is a valid offset"))
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Parse and normalize one timestamp string
    ///
    /// Fails with [`Error::Data`] when the string matches none of the
    /// accepted layouts.
    pub fn normalize(&self, raw: &str) -> Result<DateTime<FixedOffset>> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(Error::data("Empty timestamp"));
        }

        if let Some(aware) = parse_aware(s) {
            return Ok(aware.with_timezone(&self.offset));
        }

        if let Some(naive) = parse_naive(s) {
            return self.localize(naive);
        }

        Err(Error::data(format!("Unparseable timestamp: '{}'", s)))
    }

    /// Attach the configured offset to a wall-clock time
    pub fn localize(&self, naive: NaiveDateTime) -> Result<DateTime<FixedOffset>> {
        self.offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| Error::data(format!("Cannot localize timestamp {}", naive)))
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::kst()
    }
}

fn parse_aware(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    AWARE_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_offsets() {
        assert_eq!(parse_utc_offset("+09:00").unwrap().local_minus_utc(), 9 * 3600);
        assert_eq!(parse_utc_offset("+0900").unwrap().local_minus_utc(), 9 * 3600);
        assert_eq!(
            parse_utc_offset("-05:30").unwrap().local_minus_utc(),
            -(5 * 3600 + 30 * 60)
        );
        assert_eq!(parse_utc_offset("UTC").unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn test_parse_offset_rejects_garbage() {
        assert!(parse_utc_offset("Asia/Seoul").is_err());
        assert!(parse_utc_offset("+9").is_err());
        assert!(parse_utc_offset("+09:75").is_err());
    }

    #[test]
    fn test_naive_is_localized() {
        let n = Normalizer::kst();
        let ts = n.normalize("2024-03-03 00:03:05").unwrap();
        assert_eq!(ts.hour(), 0);
        assert_eq!(ts.minute(), 3);
        assert_eq!(ts.offset().local_minus_utc(), KST_OFFSET_SECS);
    }

    #[test]
    fn test_aware_is_converted() {
        let n = Normalizer::kst();
        let ts = n.normalize("2024-03-02T15:03:05.120Z").unwrap();
        assert_eq!(format_timestamp(&ts), "2024-03-03 00:03:05.120");

        let ts = n.normalize("2024-03-02 16:03:05+01:00").unwrap();
        assert_eq!(format_timestamp(&ts), "2024-03-03 00:03:05.000");
    }

    #[test]
    fn test_fractional_seconds_optional() {
        let n = Normalizer::kst();
        let a = n.normalize("2024-12-08 22:03:05.250").unwrap();
        let b = n.normalize("2024-12-08 22:03:05").unwrap();
        assert_eq!((a - b).num_milliseconds(), 250);
    }

    #[test]
    fn test_minutes_only() {
        let n = Normalizer::kst();
        let ts = n.normalize("2024-12-08 22:03").unwrap();
        assert_eq!(format_timestamp(&ts), "2024-12-08 22:03:00.000");
    }

    #[test]
    fn test_unparseable_is_data_error() {
        let n = Normalizer::kst();
        assert!(n.normalize("not a time").unwrap_err().is_data());
        assert!(n.normalize("   ").unwrap_err().is_data());
    }

    #[test]
    fn test_duration_secs() {
        assert_eq!(duration_secs(Duration::milliseconds(1500)), 1.5);
        assert_eq!(duration_secs(Duration::seconds(-2)), -2.0);
    }
}
