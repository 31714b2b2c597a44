//! Dependent start/end month selection.
//!
//! Each choice narrows the next one:
//!
//! 1. start year: `EPOCH_YEAR..=current year`
//! 2. start month: capped at the current month when the start year is the current year
//! 3. end year: `start year..=current year`
//! 4. end month: capped at the current month when the end year is the current year,
//!    floored at the start month when the end year is the start year
//!
//! The option functions are pure; `current` is the month treated as "now".

use std::ops::RangeInclusive;

use chrono::NaiveDate;

use crate::domain::{DateInterval, YearMonth, EPOCH_YEAR};

/// The month treated as "now", never earlier than January of `EPOCH_YEAR`.
pub fn current_month(today: NaiveDate) -> YearMonth {
    let now = YearMonth::from_date(today);
    match YearMonth::new(EPOCH_YEAR, 1) {
        Some(epoch) if now < epoch => epoch,
        _ => now,
    }
}

pub fn start_year_options(current: YearMonth) -> RangeInclusive<i32> {
    EPOCH_YEAR..=current.year()
}

pub fn start_month_options(current: YearMonth, start_year: i32) -> RangeInclusive<u32> {
    if start_year == current.year() {
        1..=current.month()
    } else {
        1..=12
    }
}

pub fn end_year_options(current: YearMonth, start_year: i32) -> RangeInclusive<i32> {
    start_year.max(EPOCH_YEAR)..=current.year()
}

pub fn end_month_options(
    current: YearMonth,
    start_year: i32,
    start_month: u32,
    end_year: i32,
) -> RangeInclusive<u32> {
    let lo = if end_year == start_year { start_month } else { 1 };
    let hi = if end_year == current.year() { current.month() } else { 12 };
    lo..=hi
}

/// Which of the four choices is being adjusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermField {
    StartYear,
    StartMonth,
    EndYear,
    EndMonth,
}

/// The four raw choices behind a `DateInterval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSelection {
    pub start_year: i32,
    pub start_month: u32,
    pub end_year: i32,
    pub end_month: u32,
}

impl TermSelection {
    /// Everything from January of `EPOCH_YEAR` through `current`.
    pub fn full_range(current: YearMonth) -> Self {
        Self {
            start_year: EPOCH_YEAR,
            start_month: 1,
            end_year: current.year(),
            end_month: current.month(),
        }
    }

    pub fn from_months(start: YearMonth, end: YearMonth) -> Self {
        Self {
            start_year: start.year(),
            start_month: start.month(),
            end_year: end.year(),
            end_month: end.month(),
        }
    }

    /// Check every choice against its option set, in dependency order.
    pub fn validate(&self, current: YearMonth) -> Result<DateInterval, String> {
        let years = start_year_options(current);
        if !years.contains(&self.start_year) {
            return Err(format!(
                "Start year {} is not selectable (choose {}..={}).",
                self.start_year,
                years.start(),
                years.end()
            ));
        }

        let months = start_month_options(current, self.start_year);
        if !months.contains(&self.start_month) {
            return Err(format!(
                "Start month {} is not selectable for {} (choose {}..={}).",
                self.start_month,
                self.start_year,
                months.start(),
                months.end()
            ));
        }

        let years = end_year_options(current, self.start_year);
        if !years.contains(&self.end_year) {
            return Err(format!(
                "End year {} is not selectable (choose {}..={}).",
                self.end_year,
                years.start(),
                years.end()
            ));
        }

        let months = end_month_options(current, self.start_year, self.start_month, self.end_year);
        if !months.contains(&self.end_month) {
            return Err(format!(
                "End month {} is not selectable for {} (choose {}..={}).",
                self.end_month,
                self.end_year,
                months.start(),
                months.end()
            ));
        }

        let start = YearMonth::new(self.start_year, self.start_month)
            .ok_or_else(|| "Invalid start month.".to_string())?;
        let end = YearMonth::new(self.end_year, self.end_month)
            .ok_or_else(|| "Invalid end month.".to_string())?;
        DateInterval::new(start, end).ok_or_else(|| "End month is before start month.".to_string())
    }

    /// Pull every choice into its option set, nearest value first.
    ///
    /// Later fields are clamped against the already-clamped earlier ones, so
    /// the result always validates.
    pub fn clamp(self, current: YearMonth) -> Self {
        let start_year = clamp_into(self.start_year, start_year_options(current));
        let start_month = clamp_into(self.start_month, start_month_options(current, start_year));
        let end_year = clamp_into(self.end_year, end_year_options(current, start_year));
        let end_month = clamp_into(
            self.end_month,
            end_month_options(current, start_year, start_month, end_year),
        );
        Self {
            start_year,
            start_month,
            end_year,
            end_month,
        }
    }

    /// Move one field by `delta` steps inside its option set, then re-clamp
    /// the dependent fields.
    pub fn step(self, field: TermField, delta: i32, current: YearMonth) -> Self {
        let base = self.clamp(current);
        let moved = match field {
            TermField::StartYear => Self {
                start_year: base.start_year.saturating_add(delta),
                ..base
            },
            TermField::StartMonth => Self {
                start_month: base.start_month.saturating_add_signed(delta),
                ..base
            },
            TermField::EndYear => Self {
                end_year: base.end_year.saturating_add(delta),
                ..base
            },
            TermField::EndMonth => Self {
                end_month: base.end_month.saturating_add_signed(delta),
                ..base
            },
        };
        moved.clamp(current)
    }

    /// Clamp and build the interval.
    ///
    /// A clamped selection always validates, so this only fails when
    /// `current` itself is outside the representable date range.
    pub fn resolve(self, current: YearMonth) -> Result<DateInterval, String> {
        self.clamp(current).validate(current)
    }
}

fn clamp_into<T: Ord + Copy>(value: T, range: RangeInclusive<T>) -> T {
    let (lo, hi) = range.into_inner();
    if hi < lo {
        return lo;
    }
    value.clamp(lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    /// Every selection reachable through the option sets.
    fn all_selections(current: YearMonth) -> Vec<TermSelection> {
        let mut out = Vec::new();
        for start_year in start_year_options(current) {
            for start_month in start_month_options(current, start_year) {
                for end_year in end_year_options(current, start_year) {
                    for end_month in end_month_options(current, start_year, start_month, end_year) {
                        out.push(TermSelection {
                            start_year,
                            start_month,
                            end_year,
                            end_month,
                        });
                    }
                }
            }
        }
        out
    }

    #[test]
    fn every_selectable_choice_is_ordered() {
        for current in [ym(2020, 1), ym(2021, 6), ym(2023, 12)] {
            let selections = all_selections(current);
            assert!(!selections.is_empty());
            for sel in selections {
                let interval = sel.validate(current).unwrap();
                assert!(interval.start_date() <= interval.end_date(), "{sel:?}");
                assert!(interval.end() <= current, "{sel:?}");
            }
        }
    }

    #[test]
    fn start_month_capped_in_current_year() {
        let current = ym(2022, 4);
        assert_eq!(start_month_options(current, 2022), 1..=4);
        assert_eq!(start_month_options(current, 2021), 1..=12);
    }

    #[test]
    fn end_year_never_precedes_start_year() {
        let current = ym(2022, 4);
        assert_eq!(end_year_options(current, 2021), 2021..=2022);
        assert_eq!(end_year_options(current, 2022), 2022..=2022);
    }

    #[test]
    fn end_month_combines_floor_and_cap() {
        let current = ym(2022, 8);
        // Same year as start and as current: floored and capped.
        assert_eq!(end_month_options(current, 2022, 3, 2022), 3..=8);
        // Same year as start only.
        assert_eq!(end_month_options(current, 2020, 5, 2020), 5..=12);
        // Current year only.
        assert_eq!(end_month_options(current, 2020, 5, 2022), 1..=8);
        // Neither.
        assert_eq!(end_month_options(current, 2020, 5, 2021), 1..=12);
    }

    #[test]
    fn validate_rejects_future_and_reversed_choices() {
        let current = ym(2022, 4);
        let future = TermSelection::from_months(ym(2022, 5), ym(2022, 6));
        assert!(future.validate(current).is_err());

        let reversed = TermSelection::from_months(ym(2021, 5), ym(2021, 2));
        assert!(reversed.validate(current).is_err());

        let before_epoch = TermSelection::from_months(ym(2019, 12), ym(2020, 2));
        assert!(before_epoch.validate(current).is_err());
    }

    #[test]
    fn clamp_pulls_dependent_fields_forward() {
        let current = ym(2022, 4);
        let sel = TermSelection::from_months(ym(2021, 9), ym(2021, 3)).clamp(current);
        assert_eq!(sel, TermSelection::from_months(ym(2021, 9), ym(2021, 9)));

        let sel = TermSelection::from_months(ym(2025, 12), ym(2026, 1)).clamp(current);
        assert_eq!(sel, TermSelection::from_months(ym(2022, 4), ym(2022, 4)));
    }

    #[test]
    fn step_moves_within_options() {
        let current = ym(2022, 4);
        let sel = TermSelection::from_months(ym(2020, 1), ym(2020, 3));

        let moved = sel.step(TermField::StartMonth, 5, current);
        assert_eq!(moved.start_month, 6);
        assert_eq!((moved.end_year, moved.end_month), (2020, 6));

        let moved = sel.step(TermField::EndYear, 10, current);
        assert_eq!((moved.end_year, moved.end_month), (2022, 3));

        let moved = sel.step(TermField::StartMonth, -3, current);
        assert_eq!(moved.start_month, 1);
    }

    #[test]
    fn full_range_runs_to_current_month() {
        let current = ym(2021, 2);
        let interval = TermSelection::full_range(current).resolve(current).unwrap();
        assert_eq!(interval.start_date(), NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(interval.end_date(), NaiveDate::from_ymd_opt(2021, 2, 28).unwrap());
    }

    #[test]
    fn current_month_never_before_epoch() {
        let early = NaiveDate::from_ymd_opt(2019, 6, 1).unwrap();
        assert_eq!(current_month(early), ym(2020, 1));
    }
}
