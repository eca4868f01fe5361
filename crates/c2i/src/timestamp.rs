use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};
use thiserror::Error;

use crate::report::Report;

const TIMESTAMP_PATH: &str = "Summary.Timestamp";
const TIMESTAMP_LAYOUT: &str = "%Y%m%d%H%M%S";
const TIMESTAMP_LEN: usize = 14;

#[derive(Debug, Error, PartialEq)]
pub enum TimestampError {
    #[error("Summary.Timestamp {0:?} is shorter than 14 characters")]
    TooShort(String),

    #[error("Summary.Timestamp {value:?} does not match YYYYMMDDhhmmss: {reason}")]
    Malformed { value: String, reason: String },
}

/// Time shared by every point of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    /// The zero time. Points carrying it are written without a timestamp,
    /// leaving the server to assign one.
    Zero,
    At(DateTime<Utc>),
}

impl Timestamp {
    pub fn is_zero(&self) -> bool {
        matches!(self, Timestamp::Zero)
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Zero => None,
            Timestamp::At(dt) => Some(*dt),
        }
    }

    /// Calendar year; the zero time reads as year 1.
    pub fn year(&self) -> i32 {
        self.datetime().map_or(1, |dt| dt.year())
    }

    /// Calendar month; the zero time reads as January.
    pub fn month(&self) -> u32 {
        self.datetime().map_or(1, |dt| dt.month())
    }
}

/// How a request's timestamp is chosen.
#[derive(Debug, Clone, Copy)]
pub enum TimestampPolicy {
    /// Parse `Summary.Timestamp`; absent resolves to [`Timestamp::Zero`].
    /// Also stamps `month`, `year` and `year-month` onto `test_counter`.
    FromReport,
    /// Wall-clock time at processing, from the given clock.
    ProcessingTime(fn() -> DateTime<Utc>),
}

impl TimestampPolicy {
    pub fn processing_time() -> Self {
        TimestampPolicy::ProcessingTime(Utc::now)
    }

    pub fn resolve(&self, report: &Report) -> Result<Timestamp, TimestampError> {
        match self {
            TimestampPolicy::FromReport => match report.str_at(TIMESTAMP_PATH) {
                Some(raw) => parse_report_timestamp(raw).map(Timestamp::At),
                None => Ok(Timestamp::Zero),
            },
            TimestampPolicy::ProcessingTime(now) => Ok(Timestamp::At(now())),
        }
    }

    pub fn stamps_calendar_fields(&self) -> bool {
        matches!(self, TimestampPolicy::FromReport)
    }
}

/// Parse the first 14 characters of `raw` as `YYYYMMDDhhmmss` in UTC.
/// Anything after the prefix is ignored.
pub fn parse_report_timestamp(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    let prefix = raw
        .get(..TIMESTAMP_LEN)
        .ok_or_else(|| TimestampError::TooShort(raw.to_owned()))?;

    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimestampError::Malformed {
            value: raw.to_owned(),
            reason: "expected 14 digits".to_owned(),
        });
    }

    let naive = NaiveDateTime::parse_from_str(prefix, TIMESTAMP_LAYOUT).map_err(|e| {
        TimestampError::Malformed {
            value: raw.to_owned(),
            reason: e.to_string(),
        }
    })?;

    // chrono reads second 60 as a leap second
    if naive.nanosecond() >= 1_000_000_000 {
        return Err(TimestampError::Malformed {
            value: raw.to_owned(),
            reason: "second out of range".to_owned(),
        });
    }

    Ok(naive.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn report(ts: serde_json::Value) -> Report {
        Report::new(json!({ "Summary": { "Timestamp": ts } }))
    }

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 29, 8, 0, 0).unwrap()
    }

    #[test]
    fn parses_fourteen_digit_prefix_and_ignores_suffix() {
        let ts = TimestampPolicy::FromReport
            .resolve(&report(json!("20230615143000XYZ")))
            .unwrap();
        assert_eq!(
            ts,
            Timestamp::At(Utc.with_ymd_and_hms(2023, 6, 15, 14, 30, 0).unwrap())
        );
    }

    #[test]
    fn absent_timestamp_resolves_to_zero() {
        let ts = TimestampPolicy::FromReport
            .resolve(&Report::new(json!({ "Summary": {} })))
            .unwrap();
        assert!(ts.is_zero());
        assert_eq!(ts.year(), 1);
        assert_eq!(ts.month(), 1);
    }

    #[test]
    fn non_string_timestamp_resolves_to_zero() {
        let ts = TimestampPolicy::FromReport
            .resolve(&report(json!(20230615143000u64)))
            .unwrap();
        assert!(ts.is_zero());
    }

    #[test]
    fn short_timestamp_is_an_error() {
        let err = TimestampPolicy::FromReport
            .resolve(&report(json!("2023061514")))
            .unwrap_err();
        assert!(matches!(err, TimestampError::TooShort(_)));
    }

    #[test]
    fn non_digit_prefix_is_an_error() {
        let err = parse_report_timestamp("2023-06-15T14:30:00Z").unwrap_err();
        assert!(matches!(err, TimestampError::Malformed { .. }));
    }

    #[test]
    fn out_of_range_month_is_an_error() {
        let err = parse_report_timestamp("20231315143000").unwrap_err();
        assert!(matches!(err, TimestampError::Malformed { .. }));
    }

    #[test]
    fn leap_second_is_an_error() {
        let err = parse_report_timestamp("20230615143060").unwrap_err();
        assert_eq!(
            err,
            TimestampError::Malformed {
                value: "20230615143060".into(),
                reason: "second out of range".into(),
            }
        );
        assert!(parse_report_timestamp("20230615143059").is_ok());
    }

    #[test]
    fn multibyte_prefix_boundary_is_an_error() {
        // 13 ASCII digits followed by a two-byte character straddling byte 14
        let err = parse_report_timestamp("2023061514300é").unwrap_err();
        assert!(matches!(err, TimestampError::TooShort(_)));
    }

    #[test]
    fn processing_time_ignores_report() {
        let policy = TimestampPolicy::ProcessingTime(fixed_clock);
        let ts = policy
            .resolve(&report(json!("20230615143000")))
            .unwrap();
        assert_eq!(ts, Timestamp::At(fixed_clock()));
        assert!(!policy.stamps_calendar_fields());
    }

    #[test]
    fn processing_time_ignores_malformed_report_timestamp() {
        let ts = TimestampPolicy::ProcessingTime(fixed_clock)
            .resolve(&report(json!("bogus")))
            .unwrap();
        assert_eq!(ts, Timestamp::At(fixed_clock()));
    }
}
