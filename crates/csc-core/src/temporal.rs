//! # Temporal Types — UTC-Only Timestamps
//!
//! Defines `Timestamp`, a UTC-only instant truncated to seconds precision.
//! Webhook payloads carry timestamps as ISO-8601 with a `Z` suffix, and
//! decision metadata (validation time, override decision time, delivery
//! outcomes) is stamped with the same type.
//!
//! Calendar-date logic (transaction dates, licence windows, reclassification
//! effective dates) uses `chrono::NaiveDate` directly; regulatory dates are
//! calendar days, not instants.
//!
//! Non-UTC inputs are rejected by [`Timestamp::parse()`]; there is no silent
//! offset conversion on the strict path.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CscError;

/// A UTC-only timestamp, truncated to seconds precision.
///
/// # Construction
///
/// - [`Timestamp::now()`]: current UTC time, truncated.
/// - [`Timestamp::from_utc()`]: from a `DateTime<Utc>`, truncating sub-seconds.
/// - [`Timestamp::parse()`]: from an ISO-8601 string, rejecting non-UTC offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse a timestamp from an RFC 3339 string.
    ///
    /// Only the `Z` suffix is accepted. Even `+00:00` is rejected, so
    /// the rendered form of a parsed timestamp is byte-identical to its input.
    ///
    /// # Errors
    ///
    /// Returns [`CscError::Temporal`] if the string is not valid RFC 3339
    /// or uses a non-`Z` offset.
    pub fn parse(s: &str) -> Result<Self, CscError> {
        if !s.ends_with('Z') {
            return Err(CscError::Temporal(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| CscError::Temporal(format!("invalid RFC 3339 timestamp {s:?}: {e}")))?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Midnight UTC at the start of the given calendar date.
    pub fn start_of_day(date: NaiveDate) -> Self {
        Self(Utc.from_utc_datetime(&date.and_time(NaiveTime::default())))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// The UTC calendar date of this instant.
    pub fn date(&self) -> NaiveDate {
        self.0.date_naive()
    }

    /// Render as ISO-8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// Truncate a `DateTime<Utc>` to seconds precision (discard nanoseconds).
fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_has_no_subseconds() {
        let ts = Timestamp::now();
        assert_eq!(ts.as_datetime().nanosecond(), 0);
    }

    #[test]
    fn test_from_utc_truncates() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 12, 30, 45).unwrap();
        let ts = Timestamp::from_utc(dt.with_nanosecond(123_456_789).unwrap());
        assert_eq!(ts.to_iso8601(), "2026-01-15T12:30:45Z");
    }

    #[test]
    fn test_parse_z_suffix_accepted() {
        let ts = Timestamp::parse("2025-12-15T08:00:00Z").unwrap();
        assert_eq!(ts.to_iso8601(), "2025-12-15T08:00:00Z");
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2025, 12, 15).unwrap());
    }

    #[test]
    fn test_parse_offsets_rejected() {
        assert!(Timestamp::parse("2026-01-15T12:00:00+00:00").is_err());
        assert!(Timestamp::parse("2026-01-15T17:00:00+05:00").is_err());
        assert!(Timestamp::parse("not a timestamp Z").is_err());
    }

    #[test]
    fn test_start_of_day() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(Timestamp::start_of_day(date).to_iso8601(), "2026-01-01T00:00:00Z");
    }

    #[test]
    fn test_display_matches_iso8601() {
        let ts = Timestamp::from_utc(Utc.with_ymd_and_hms(2026, 6, 30, 23, 59, 59).unwrap());
        assert_eq!(format!("{ts}"), ts.to_iso8601());
    }
}
