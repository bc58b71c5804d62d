use chrono::{Days, NaiveDate};

use super::DateRangeError;

/// A date range with inclusive start and end dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a new date range, validating that start <= end.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError::InvalidRange);
        }
        Ok(Self { start, end })
    }

    /// `today` through `today + days`, both inclusive.
    pub fn next_days(today: NaiveDate, days: u32) -> Result<Self, DateRangeError> {
        let end = today
            .checked_add_days(Days::new(u64::from(days)))
            .ok_or(DateRangeError::InvalidRange)?;
        Ok(Self { start: today, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_valid_range_construction() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert_eq!(range.start, date(2024, 1, 1));
        assert_eq!(range.end, date(2024, 1, 31));
    }

    #[test]
    fn test_same_day_range_is_valid() {
        let range = DateRange::new(date(2024, 6, 15), date(2024, 6, 15)).unwrap();
        assert!(range.contains(date(2024, 6, 15)));
    }

    #[test]
    fn test_invalid_range_returns_error() {
        assert_eq!(
            DateRange::new(date(2024, 1, 31), date(2024, 1, 1)),
            Err(DateRangeError::InvalidRange)
        );
    }

    #[test]
    fn test_next_days_crosses_month_boundary() {
        let range = DateRange::next_days(date(2024, 1, 20), 30).unwrap();
        assert_eq!(range.end, date(2024, 2, 19));
        assert!(range.contains(date(2024, 1, 20)));
        assert!(range.contains(date(2024, 2, 19)));
        assert!(!range.contains(date(2024, 2, 20)));
        assert!(!range.contains(date(2024, 1, 19)));
    }

    #[test]
    fn test_next_days_out_of_range() {
        assert_eq!(
            DateRange::next_days(NaiveDate::MAX, 1),
            Err(DateRangeError::InvalidRange)
        );
    }
}
