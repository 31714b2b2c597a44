//! Derived figures for one prefecture's case series.
//!
//! All functions are pure and cheap; the dashboard recomputes them on every
//! interaction.

use crate::domain::{CaseRecord, DateInterval};

/// Records whose date lies in `[start_date, end_date]`, in original order.
///
/// An empty result is not an error.
pub fn filter_by_interval<'a>(series: &'a [CaseRecord], interval: &DateInterval) -> &'a [CaseRecord] {
    // The series is sorted by date, so the matching records are contiguous.
    let lo = series.partition_point(|r| r.date < interval.start_date());
    let hi = series.partition_point(|r| r.date <= interval.end_date());
    if hi <= lo {
        return &series[..0];
    }
    &series[lo..hi]
}

/// Sum of `new_cases` over the last `n` records of the full series.
///
/// Saturates to the whole series when `n` exceeds its length.
pub fn trailing_sum(series: &[CaseRecord], n: usize) -> u64 {
    let skip = series.len().saturating_sub(n);
    series[skip..].iter().map(|r| r.new_cases).sum()
}

/// `cases` as a percentage of `population`.
///
/// `population` is positive for every loaded census row.
pub fn rate(cases: u64, population: u64) -> f64 {
    cases as f64 / population as f64 * 100.0
}

/// Convert a percentage into "about N people per 10,000".
pub fn per_ten_thousand(rate_percent: f64) -> u64 {
    let v = (rate_percent * 100.0).round();
    if v.is_finite() && v > 0.0 { v as u64 } else { 0 }
}

/// Largest daily count in a series (0 when empty).
pub fn peak(series: &[CaseRecord]) -> u64 {
    series.iter().map(|r| r.new_cases).max().unwrap_or(0)
}

/// Total of `new_cases` over a series.
pub fn total(series: &[CaseRecord]) -> u64 {
    series.iter().map(|r| r.new_cases).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::YearMonth;
    use chrono::NaiveDate;

    fn rec(y: i32, m: u32, d: u32, n: u64) -> CaseRecord {
        CaseRecord {
            prefecture: "東京都".to_string(),
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            new_cases: n,
        }
    }

    fn interval(start: (i32, u32), end: (i32, u32)) -> DateInterval {
        DateInterval::new(
            YearMonth::new(start.0, start.1).unwrap(),
            YearMonth::new(end.0, end.1).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn trailing_sum_takes_last_records() {
        let series = vec![rec(2020, 1, 1, 10), rec(2020, 1, 2, 20), rec(2020, 1, 3, 30)];
        assert_eq!(trailing_sum(&series, 2), 50);
        assert_eq!(trailing_sum(&series, 1), 30);
    }

    #[test]
    fn trailing_sum_saturates() {
        let series = vec![rec(2020, 1, 1, 10), rec(2020, 1, 2, 20), rec(2020, 1, 3, 30)];
        assert_eq!(trailing_sum(&series, 3), 60);
        assert_eq!(trailing_sum(&series, 30), 60);
        assert_eq!(trailing_sum(&[], 3), 0);
    }

    #[test]
    fn rate_is_percentage_of_population() {
        assert!((rate(50, 1000) - 5.0).abs() < 1e-12);
        assert!((rate(0, 1000)).abs() < 1e-12);
    }

    #[test]
    fn per_ten_thousand_rounds() {
        assert_eq!(per_ten_thousand(5.0), 500);
        assert_eq!(per_ten_thousand(0.01234), 1);
        assert_eq!(per_ten_thousand(0.004), 0);
    }

    #[test]
    fn filter_keeps_inclusive_month_bounds() {
        let series = vec![
            rec(2019, 12, 31, 1),
            rec(2020, 1, 1, 2),
            rec(2020, 2, 29, 3),
            rec(2020, 3, 31, 4),
            rec(2020, 4, 1, 5),
        ];
        let out = filter_by_interval(&series, &interval((2020, 1), (2020, 3)));
        let counts: Vec<u64> = out.iter().map(|r| r.new_cases).collect();
        assert_eq!(counts, vec![2, 3, 4]);
    }

    #[test]
    fn filter_is_idempotent() {
        let series = vec![rec(2020, 1, 15, 2), rec(2020, 5, 1, 3), rec(2021, 1, 1, 4)];
        let iv = interval((2020, 2), (2020, 12));
        let once = filter_by_interval(&series, &iv);
        let twice = filter_by_interval(once, &iv);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 1);
    }

    #[test]
    fn filter_outside_data_is_empty() {
        let series = vec![rec(2020, 1, 15, 2)];
        assert!(filter_by_interval(&series, &interval((2021, 1), (2021, 2))).is_empty());
        assert!(filter_by_interval(&[], &interval((2020, 1), (2020, 2))).is_empty());
    }

    #[test]
    fn peak_and_total() {
        let series = vec![rec(2020, 1, 1, 4), rec(2020, 1, 2, 9), rec(2020, 1, 3, 1)];
        assert_eq!(peak(&series), 9);
        assert_eq!(total(&series), 14);
        assert_eq!(peak(&[]), 0);
    }
}
