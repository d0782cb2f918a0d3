//! Query window and pagination parameters

use crate::types::LedgerError;
use chrono::{NaiveDate, NaiveDateTime};

/// Input format of window boundaries
const DATE_FORMAT: &str = "%Y%m%d";

/// Half-open creation-time window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// Build a window from two `yyyymmdd` dates, each taken at midnight
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedInput` if either date is malformed or `start > end`.
    pub fn from_dates(start: &str, end: &str) -> Result<Self, LedgerError> {
        let start_at = parse_date(start.trim(), "start")?;
        let end_at = parse_date(end.trim(), "end")?;
        if start_at > end_at {
            return Err(LedgerError::unsupported_input(
                "window",
                format!("{}..{}", start, end),
            ));
        }
        Ok(TimeWindow {
            start: start_at,
            end: end_at,
        })
    }
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDateTime, LedgerError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| LedgerError::unsupported_input(field, value))
}

/// Zero-based page of a newest-first listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub index: usize,
    pub size: usize,
}

impl PageRequest {
    /// # Errors
    ///
    /// Returns `UnsupportedInput` for a zero page size or a page beyond `i64` range.
    pub fn new(index: usize, size: usize) -> Result<Self, LedgerError> {
        if size == 0 {
            return Err(LedgerError::unsupported_input("page_size", size));
        }
        let page = PageRequest { index, size };
        if page.offset_checked().is_none() {
            return Err(LedgerError::unsupported_input("page_index", index));
        }
        Ok(page)
    }

    /// Number of rows skipped before this page
    pub fn offset(&self) -> i64 {
        self.offset_checked().unwrap_or(i64::MAX)
    }

    pub fn limit(&self) -> i64 {
        i64::try_from(self.size).unwrap_or(i64::MAX)
    }

    fn offset_checked(&self) -> Option<i64> {
        self.index
            .checked_mul(self.size)
            .and_then(|offset| i64::try_from(offset).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_window_bounds_are_midnight() {
        let window = TimeWindow::from_dates("20240101", "20240103").unwrap();
        let midnight = |d: u32| {
            NaiveDate::from_ymd_opt(2024, 1, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };

        assert_eq!(window.start, midnight(1));
        assert_eq!(window.end, midnight(3));
    }

    #[test]
    fn test_empty_window_allowed() {
        let window = TimeWindow::from_dates("20240101", "20240101").unwrap();
        assert_eq!(window.start, window.end);
    }

    #[rstest]
    #[case::malformed_start("2024-01-01", "20240102")]
    #[case::malformed_end("20240101", "tomorrow")]
    #[case::impossible_date("20240230", "20240301")]
    #[case::reversed("20240105", "20240101")]
    fn test_window_errors(#[case] start: &str, #[case] end: &str) {
        let err = TimeWindow::from_dates(start, end).unwrap_err();
        assert!(matches!(err, LedgerError::UnsupportedInput { .. }));
    }

    #[rstest]
    #[case(0, 10, 0, 10)]
    #[case(3, 25, 75, 25)]
    fn test_page_offsets(
        #[case] index: usize,
        #[case] size: usize,
        #[case] offset: i64,
        #[case] limit: i64,
    ) {
        let page = PageRequest::new(index, size).unwrap();
        assert_eq!(page.offset(), offset);
        assert_eq!(page.limit(), limit);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(matches!(
            PageRequest::new(0, 0),
            Err(LedgerError::UnsupportedInput { .. })
        ));
    }
}
