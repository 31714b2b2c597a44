//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - loaded once and shared read-only by every view recomputation
//! - exported to CSV
//! - compared and ordered without reaching back into the raw tables

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use encoding_rs::{Encoding, SHIFT_JIS};
use serde::{Deserialize, Serialize};

/// First selectable year (case reporting starts in 2020).
pub const EPOCH_YEAR: i32 = 2020;

/// Trailing window used when the user has not picked one.
pub const DEFAULT_TRAILING_DAYS: usize = 3;

/// Largest selectable trailing window.
pub const MAX_TRAILING_DAYS: usize = 30;

/// Number of days in `month` of `year`.
///
/// Returns 0 for a month outside `1..=12`.
pub fn last_day_of_month(year: i32, month: u32) -> u32 {
    YearMonth::new(year, month)
        .map(|ym| ym.last_day().day())
        .unwrap_or(0)
}

/// A calendar month, stored as the first day of that month.
///
/// Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth(NaiveDate);

impl YearMonth {
    /// Returns `None` when `month` is not `1..=12` or the year is outside
    /// the representable date range.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.with_day0(0).unwrap_or(date))
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn first_day(self) -> NaiveDate {
        self.0
    }

    pub fn last_day(self) -> NaiveDate {
        self.0
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(self.0)
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        self.first_day() <= date && date <= self.last_day()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.year(), self.month())
    }
}

impl FromStr for YearMonth {
    type Err = String;

    /// Accepts `YYYY-MM`, `YYYY/MM` and unpadded months (`2020/1`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (year, month) = trimmed
            .split_once(['-', '/'])
            .ok_or_else(|| format!("Invalid month '{trimmed}'. Expected YYYY-MM."))?;
        let year = year
            .parse::<i32>()
            .map_err(|_| format!("Invalid year in '{trimmed}'."))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| format!("Invalid month in '{trimmed}'."))?;
        Self::new(year, month).ok_or_else(|| format!("Month out of range in '{trimmed}'."))
    }
}

/// An inclusive date range spanning whole months.
///
/// Invariant: `start <= end`, so `start_date() <= end_date()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateInterval {
    start: YearMonth,
    end: YearMonth,
}

impl DateInterval {
    /// Returns `None` when `end` is before `start`.
    pub fn new(start: YearMonth, end: YearMonth) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn start(&self) -> YearMonth {
        self.start
    }

    pub fn end(&self) -> YearMonth {
        self.end
    }

    pub fn start_year(&self) -> i32 {
        self.start.year()
    }

    pub fn start_month(&self) -> u32 {
        self.start.month()
    }

    pub fn end_year(&self) -> i32 {
        self.end.year()
    }

    pub fn end_month(&self) -> u32 {
        self.end.month()
    }

    /// Day 1 of the start month.
    pub fn start_date(&self) -> NaiveDate {
        self.start.first_day()
    }

    /// Last calendar day of the end month.
    pub fn end_date(&self) -> NaiveDate {
        self.end.last_day()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date() <= date && date <= self.end_date()
    }
}

impl fmt::Display for DateInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

/// One day of reported cases for one prefecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub prefecture: String,
    pub date: NaiveDate,
    pub new_cases: u64,
}

/// One census row: population of a prefecture in a given year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationRecord {
    pub prefecture: String,
    /// Japanese era label as written in the census table (e.g. `平成`).
    pub era: String,
    /// Gregorian year of the census.
    pub year: i32,
    /// Always > 0 (enforced by the loader).
    pub population: u64,
}

/// All case records of a single prefecture, ordered by date ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefectureSeries {
    pub prefecture: String,
    pub records: Vec<CaseRecord>,
}

impl PrefectureSeries {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }
}

/// Text encoding of an input table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputEncoding {
    /// BOM, then UTF-8 if the first block is valid, else Shift_JIS.
    #[default]
    Auto,
    Fixed(&'static Encoding),
}

impl fmt::Display for InputEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Fixed(encoding) => f.write_str(encoding.name()),
        }
    }
}

impl FromStr for InputEncoding {
    type Err = String;

    /// `auto`, `cp932`, or any WHATWG label (`utf-8`, `shift_jis`, `euc-jp`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        if label.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        // Windows code page 932 is not a WHATWG label.
        if label.eq_ignore_ascii_case("cp932") {
            return Ok(Self::Fixed(SHIFT_JIS));
        }
        Encoding::for_label(label.as_bytes())
            .map(Self::Fixed)
            .ok_or_else(|| format!("Unknown encoding '{label}'."))
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags, environment variables and defaults.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub cases_path: PathBuf,
    pub population_path: PathBuf,

    /// Census era to keep (`None` keeps every row).
    pub era: Option<String>,
    /// Pin a census year instead of using the latest available one.
    pub census_year: Option<i32>,
    /// Encoding of both input tables.
    pub encoding: InputEncoding,

    /// The date treated as "today" when building the selectable ranges.
    pub today: NaiveDate,

    pub trailing_days: usize,

    pub plot_width: usize,
    pub plot_height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_day_handles_leap_years() {
        assert_eq!(last_day_of_month(2020, 2), 29);
        assert_eq!(last_day_of_month(2021, 2), 28);
        assert_eq!(last_day_of_month(1900, 2), 28);
        assert_eq!(last_day_of_month(2000, 2), 29);
        assert_eq!(last_day_of_month(2021, 4), 30);
        assert_eq!(last_day_of_month(2021, 12), 31);
        assert_eq!(last_day_of_month(2021, 13), 0);
        assert_eq!(last_day_of_month(2021, 0), 0);
    }

    #[test]
    fn input_encoding_labels() {
        assert_eq!("auto".parse::<InputEncoding>(), Ok(InputEncoding::Auto));
        assert_eq!("CP932".parse::<InputEncoding>(), Ok(InputEncoding::Fixed(SHIFT_JIS)));
        assert_eq!(
            "sjis".parse::<InputEncoding>(),
            Ok(InputEncoding::Fixed(SHIFT_JIS))
        );
        assert_eq!(
            "utf-8".parse::<InputEncoding>().unwrap().to_string(),
            "UTF-8"
        );
        assert!("klingon".parse::<InputEncoding>().is_err());
    }

    #[test]
    fn year_month_parses_common_forms() {
        let ym: YearMonth = "2020-01".parse().unwrap();
        assert_eq!((ym.year(), ym.month()), (2020, 1));
        let ym: YearMonth = "2021/3".parse().unwrap();
        assert_eq!((ym.year(), ym.month()), (2021, 3));
        assert!("2021-13".parse::<YearMonth>().is_err());
        assert!("202101".parse::<YearMonth>().is_err());
    }

    #[test]
    fn interval_spans_whole_months() {
        let start = YearMonth::new(2020, 1).unwrap();
        let end = YearMonth::new(2020, 2).unwrap();
        let interval = DateInterval::new(start, end).unwrap();
        assert_eq!(interval.start_date(), NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(interval.end_date(), NaiveDate::from_ymd_opt(2020, 2, 29).unwrap());
        assert_eq!(interval.to_string(), "2020/1 - 2020/2");
        assert!(DateInterval::new(end, start).is_none());
    }

    #[test]
    fn year_month_from_date_normalizes_to_first_day() {
        let date = NaiveDate::from_ymd_opt(2021, 7, 19).unwrap();
        let ym = YearMonth::from_date(date);
        assert_eq!(ym.first_day(), NaiveDate::from_ymd_opt(2021, 7, 1).unwrap());
        assert!(ym.contains(date));
        assert_eq!(ym.last_day(), NaiveDate::from_ymd_opt(2021, 7, 31).unwrap());
    }
}
