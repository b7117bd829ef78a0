use std::fmt;

use chrono::{Days, NaiveDate};

use serde::Serialize;

/// Display format used in rendered notifications
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Start date {start} must not be after end date {end}")]
pub struct InvalidRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Closed range of calendar days, both ends inclusive.
///
/// A single-day rental has `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    #[serde(rename = "start_date")]
    start: NaiveDate,
    #[serde(rename = "end_date")]
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InvalidRange> {
        if start > end {
            return Err(InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Inclusive overlap: ranges sharing a boundary day overlap
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Number of calendar days covered, at least 1
    pub fn days(&self) -> u64 {
        (self.end - self.start).num_days() as u64 + 1
    }

    /// Clamp this range to `window`, `None` when they do not overlap
    pub fn intersect(&self, window: &DateRange) -> Option<DateRange> {
        if !self.overlaps(window) {
            return None;
        }
        Some(Self {
            start: self.start.max(window.start),
            end: self.end.min(window.end),
        })
    }

    /// Day right after the end of this range
    pub(crate) fn day_after(&self) -> Option<NaiveDate> {
        self.end.checked_add_days(Days::new(1))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format(DISPLAY_DATE_FORMAT),
            self.end.format(DISPLAY_DATE_FORMAT)
        )
    }
}

#[cfg(test)]
mod tests {
    use claims::{assert_err, assert_ok};

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[test]
    fn start_after_end_is_rejected() {
        let err = assert_err!(DateRange::new(day(15), day(10)));
        assert_eq!(err.start, day(15));
    }

    #[test]
    fn single_day_range_is_valid() {
        let range = assert_ok!(DateRange::new(day(10), day(10)));
        assert_eq!(range.days(), 1);
        assert_eq!(range, DateRange::single_day(day(10)));
    }

    #[test]
    fn shared_boundary_day_overlaps() {
        let a = DateRange::new(day(10), day(15)).unwrap();
        let b = DateRange::new(day(15), day(20)).unwrap();
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn adjacent_days_do_not_overlap() {
        let a = DateRange::new(day(10), day(15)).unwrap();
        let b = DateRange::new(day(16), day(20)).unwrap();
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn containment_overlaps() {
        let outer = DateRange::new(day(1), day(31)).unwrap();
        let inner = DateRange::single_day(day(12));
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
        assert_eq!(inner.intersect(&outer), Some(inner));
    }

    #[test]
    fn displays_in_day_month_year_order() {
        let range = DateRange::new(day(10), day(15)).unwrap();
        assert_eq!(range.to_string(), "10/01/2025 - 15/01/2025");
    }
}
