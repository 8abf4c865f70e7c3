//! Date range handling for metrics runs.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// An inclusive date range bounding a metrics run.
///
/// Invariant: `start <= end`, enforced at construction. Immutable once
/// built from caller input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    /// Creates a range from two instants.
    ///
    /// Returns `None` if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if start <= end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Parses a range from `YYYY-MM-DD` date strings.
    ///
    /// The start date maps to midnight UTC and the end date to the last
    /// second of that day, so a single-day range covers the whole day.
    pub fn from_dates(start: &str, end: &str) -> Result<Self, String> {
        let start_date = parse_ymd(start)?;
        let end_date = parse_ymd(end)?;

        let start = Utc.from_utc_datetime(&start_date.and_time(NaiveTime::MIN));
        let end = Utc.from_utc_datetime(
            &end_date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)),
        );

        Self::new(start, end).ok_or_else(|| format!("start date {} is after end date {}", start, end))
    }

    /// Start of the range (inclusive).
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// End of the range (inclusive).
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns true if `instant` falls inside the range, inclusive on
    /// both ends.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

fn parse_ymd(input: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| format!("date '{}' must be in YYYY-MM-DD format", input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rejects_inverted_range() {
        let start = Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert!(DateRange::new(start, end).is_none());
    }

    #[test]
    fn accepts_equal_endpoints() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let range = DateRange::new(at, at).unwrap();
        assert!(range.contains(at));
    }

    #[test]
    fn from_dates_covers_whole_end_day() {
        let range = DateRange::from_dates("2024-06-01", "2024-06-01").unwrap();
        let late = Utc.with_ymd_and_hms(2024, 6, 1, 23, 30, 0).unwrap();
        assert!(range.contains(late));
    }

    #[test]
    fn from_dates_rejects_bad_format() {
        assert!(DateRange::from_dates("06/01/2024", "2024-06-02").is_err());
        assert!(DateRange::from_dates("2024-06-01", "yesterday").is_err());
    }

    #[test]
    fn from_dates_rejects_inverted_order() {
        assert!(DateRange::from_dates("2024-06-02", "2024-06-01").is_err());
    }

    #[test]
    fn contains_is_inclusive() {
        let range = DateRange::from_dates("2024-06-01", "2024-06-03").unwrap();
        assert!(range.contains(range.start()));
        assert!(range.contains(range.end()));
        let before = Utc.with_ymd_and_hms(2024, 5, 31, 23, 59, 59).unwrap();
        assert!(!range.contains(before));
    }
}
