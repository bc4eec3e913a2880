//! Report month and billing period resolution.
//!
//! A report month `(year, month)` names the column that holds the bill for
//! the *previous* calendar month, matching the billing API convention of
//! half-open monthly ranges. Resolving January therefore rolls back to
//! December of the prior year.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while resolving report periods
#[derive(Error, Debug)]
pub enum PeriodError {
    /// Month outside `"01"`..`"12"`
    #[error("invalid month '{0}': expected a two-digit value between 01 and 12")]
    InvalidMonth(String),

    /// Year is not a four-digit number
    #[error("invalid year '{0}': expected a four-digit value")]
    InvalidYear(String),

    /// Combined label is not `YYYY-MM`
    #[error("invalid month label '{0}': expected YYYY-MM")]
    InvalidLabel(String),

    /// Explicit range where start does not precede end
    #[error("invalid period: start {start} is not before end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

/// A validated report month
///
/// The year/month pair keys the report column; the billed range it resolves
/// to via [`ReportMonth::period`] is the prior calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReportMonth {
    year: i32,
    month: u32,
}

impl ReportMonth {
    /// Parse a four-digit year and a two-digit month (`"01"`-`"12"`)
    ///
    /// # Errors
    ///
    /// Returns an error for any other input. Callers treat this as a
    /// configuration fault and abort the run.
    pub fn parse(year: &str, month: &str) -> Result<Self, PeriodError> {
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PeriodError::InvalidYear(year.to_string()));
        }
        let year_num: i32 = year
            .parse()
            .map_err(|_| PeriodError::InvalidYear(year.to_string()))?;

        if month.len() != 2 || !month.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PeriodError::InvalidMonth(month.to_string()));
        }
        let month_num: u32 = month
            .parse()
            .map_err(|_| PeriodError::InvalidMonth(month.to_string()))?;
        if !(1..=12).contains(&month_num) {
            return Err(PeriodError::InvalidMonth(month.to_string()));
        }

        Ok(Self {
            year: year_num,
            month: month_num,
        })
    }

    /// Parse a combined `YYYY-MM` label
    ///
    /// # Errors
    ///
    /// Returns an error when the label is not a dash-separated four-digit
    /// year and two-digit month.
    pub fn from_label(label: &str) -> Result<Self, PeriodError> {
        let (year, month) = label
            .split_once('-')
            .ok_or_else(|| PeriodError::InvalidLabel(label.to_string()))?;
        Self::parse(year, month).map_err(|_| PeriodError::InvalidLabel(label.to_string()))
    }

    /// The column key for this month, `YYYY-MM`
    #[must_use]
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// The report year
    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    /// The next report month in calendar order
    #[must_use]
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Resolve the billed range: the whole prior calendar month
    ///
    /// January rolls back to December of the previous year.
    #[must_use]
    pub fn period(&self) -> BillingPeriod {
        let (start_year, start_month) = if self.month == 1 {
            (self.year - 1, 12)
        } else {
            (self.year, self.month - 1)
        };
        BillingPeriod {
            start: first_of_month(start_year, start_month),
            end: first_of_month(self.year, self.month),
        }
    }
}

impl fmt::Display for ReportMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A half-open billing date range: `start` inclusive, `end` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    /// First billed day
    pub start: NaiveDate,
    /// First day after the billed range
    pub end: NaiveDate,
}

impl BillingPeriod {
    /// Build a period from explicit dates, enforcing `start < end`
    ///
    /// # Errors
    ///
    /// Returns an error when the range is empty or inverted.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Result<Self, PeriodError> {
        if start >= end {
            return Err(PeriodError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    // month is always in 1..=12 here
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mid_year_month_covers_prior_month() {
        let month = ReportMonth::parse("2022", "05").unwrap();
        let period = month.period();
        assert_eq!(period.start, NaiveDate::from_ymd_opt(2022, 4, 1).unwrap());
        assert_eq!(period.end, NaiveDate::from_ymd_opt(2022, 5, 1).unwrap());
    }

    #[test]
    fn test_january_rolls_back_to_prior_december() {
        let month = ReportMonth::parse("2022", "01").unwrap();
        let period = month.period();
        assert_eq!(period.start, NaiveDate::from_ymd_opt(2021, 12, 1).unwrap());
        assert_eq!(period.end, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
    }

    #[test]
    fn test_december_stays_within_year() {
        let month = ReportMonth::parse("2022", "12").unwrap();
        let period = month.period();
        assert_eq!(period.start, NaiveDate::from_ymd_opt(2022, 11, 1).unwrap());
        assert_eq!(period.end, NaiveDate::from_ymd_opt(2022, 12, 1).unwrap());
    }

    #[test]
    fn test_label_preserves_input_pair() {
        let month = ReportMonth::parse("2022", "05").unwrap();
        assert_eq!(month.label(), "2022-05");
        // the label names the report column, not the billed range
        assert_eq!(month.period().start.format("%Y-%m").to_string(), "2022-04");
    }

    #[test]
    fn test_invalid_month_rejected() {
        assert!(ReportMonth::parse("2022", "13").is_err());
        assert!(ReportMonth::parse("2022", "00").is_err());
        assert!(ReportMonth::parse("2022", "5").is_err());
        assert!(ReportMonth::parse("2022", "ab").is_err());
    }

    #[test]
    fn test_invalid_year_rejected() {
        assert!(ReportMonth::parse("22", "05").is_err());
        assert!(ReportMonth::parse("20x2", "05").is_err());
    }

    #[test]
    fn test_label_round_trip() {
        let month = ReportMonth::from_label("2023-01").unwrap();
        assert_eq!(month.label(), "2023-01");
        assert!(ReportMonth::from_label("2023-1").is_err());
        assert!(ReportMonth::from_label("trend").is_err());
        assert!(ReportMonth::from_label("total").is_err());
    }

    #[test]
    fn test_next_rolls_over_december() {
        let month = ReportMonth::from_label("2022-12").unwrap();
        assert_eq!(month.next().label(), "2023-01");
        assert_eq!(month.next().next().label(), "2023-02");
    }

    #[test]
    fn test_from_dates_rejects_inverted_range() {
        let start = NaiveDate::from_ymd_opt(2022, 5, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2022, 4, 1).unwrap();
        assert!(BillingPeriod::from_dates(start, end).is_err());
        assert!(BillingPeriod::from_dates(start, start).is_err());
    }

    #[test]
    fn test_period_ordering() {
        let earlier = ReportMonth::from_label("2022-11").unwrap();
        let later = ReportMonth::from_label("2023-02").unwrap();
        assert!(earlier < later);
    }
}
