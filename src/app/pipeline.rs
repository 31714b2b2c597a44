//! Shared "selection -> view" logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! selection -> interval -> filtered series -> trailing sum -> population rate
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::{CaseRecord, DashboardConfig, DateInterval, PopulationRecord, YearMonth, MAX_TRAILING_DAYS};
use crate::error::AppError;
use crate::io::ingest::{load_cases, load_population, CaseTable, PopulationTable};
use crate::metrics;
use crate::term::{current_month, TermSelection};

/// Everything the user picks on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRequest {
    pub prefecture: String,
    pub term: TermSelection,
    pub trailing_days: usize,
}

/// All computed outputs for one selection.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub prefecture: String,
    pub interval: DateInterval,
    /// Records inside `interval`, date order.
    pub records: Vec<CaseRecord>,
    pub trailing_days: usize,
    /// Cases over the last `trailing_days` records of the full series.
    pub trailing_sum: u64,
    pub population: PopulationRecord,
    /// `trailing_sum` as a percentage of `population`.
    pub rate: f64,
    pub per_ten_thousand: u64,
    /// Latest date in the full series (the trailing window ends here).
    pub latest_date: Option<NaiveDate>,
}

impl DashboardView {
    pub fn interval_total(&self) -> u64 {
        metrics::total(&self.records)
    }

    pub fn interval_peak(&self) -> u64 {
        metrics::peak(&self.records)
    }
}

/// The loaded tables plus the month treated as "now".
///
/// Built once at start-up and never mutated.
#[derive(Debug, Clone)]
pub struct DashboardContext {
    cases: CaseTable,
    population: PopulationTable,
    current: YearMonth,
}

impl DashboardContext {
    /// Load and validate both tables.
    pub fn load(config: &DashboardConfig) -> Result<Self, AppError> {
        let cases = load_cases(&config.cases_path, config.encoding)?;
        let population = load_population(
            &config.population_path,
            config.era.as_deref(),
            config.census_year,
            config.encoding,
        )?;
        Ok(Self::from_tables(cases, population, config.today))
    }

    pub fn from_tables(cases: CaseTable, population: PopulationTable, today: NaiveDate) -> Self {
        Self {
            cases,
            population,
            current: current_month(today),
        }
    }

    pub fn current(&self) -> YearMonth {
        self.current
    }

    pub fn cases(&self) -> &CaseTable {
        &self.cases
    }

    pub fn population(&self) -> &PopulationTable {
        &self.population
    }

    /// Prefecture names in data order.
    pub fn prefectures(&self) -> Vec<String> {
        self.cases.prefectures().map(str::to_string).collect()
    }

    /// Compute the view for one selection.
    pub fn compute(&self, request: &ViewRequest) -> Result<DashboardView, AppError> {
        if !(1..=MAX_TRAILING_DAYS).contains(&request.trailing_days) {
            return Err(AppError::input(format!(
                "Trailing days must be between 1 and {MAX_TRAILING_DAYS} (got {}).",
                request.trailing_days
            )));
        }

        let interval = request.term.validate(self.current).map_err(AppError::input)?;

        let series = self.cases.series(&request.prefecture).ok_or_else(|| {
            AppError::input(format!(
                "Unknown prefecture '{}'. Run `covid prefectures` to list the available names.",
                request.prefecture
            ))
        })?;

        let population = self.population.get(&request.prefecture).ok_or_else(|| {
            AppError::data(format!(
                "No population data for prefecture {}.",
                request.prefecture
            ))
        })?;

        let records = metrics::filter_by_interval(&series.records, &interval).to_vec();
        let trailing_sum = metrics::trailing_sum(&series.records, request.trailing_days);
        let rate = metrics::rate(trailing_sum, population.population);

        debug!(
            prefecture = %request.prefecture,
            %interval,
            shown = records.len(),
            trailing_days = request.trailing_days,
            trailing_sum,
            rate,
            "computed view"
        );

        Ok(DashboardView {
            prefecture: request.prefecture.clone(),
            interval,
            records,
            trailing_days: request.trailing_days,
            trailing_sum,
            population: population.clone(),
            rate,
            per_ten_thousand: metrics::per_ten_thousand(rate),
            latest_date: series.last_date(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InputEncoding;
    use crate::io::ingest::{read_cases, read_population};

    const CASES: &str = "\
日付,都道府県名,各地の感染者数_1日ごとの発表数
2019/12/31,東京都,9
2020/1/24,東京都,1
2020/2/15,東京都,2
2020/3/31,東京都,3
2020/4/1,東京都,40
2020/4/2,東京都,50
2020/2/1,北海道,5
";

    const POPULATION: &str = "\
都道府県名,元号,西暦（年）,人口（総数）
東京都,平成,2015,1000
";

    fn context() -> DashboardContext {
        let cases = read_cases(CASES.as_bytes(), InputEncoding::Auto).unwrap();
        let population =
            read_population(POPULATION.as_bytes(), Some("平成"), None, InputEncoding::Auto).unwrap();
        DashboardContext::from_tables(cases, population, NaiveDate::from_ymd_opt(2021, 6, 15).unwrap())
    }

    fn request(prefecture: &str, start: (i32, u32), end: (i32, u32), days: usize) -> ViewRequest {
        ViewRequest {
            prefecture: prefecture.to_string(),
            term: TermSelection {
                start_year: start.0,
                start_month: start.1,
                end_year: end.0,
                end_month: end.1,
            },
            trailing_days: days,
        }
    }

    #[test]
    fn tokyo_first_quarter_of_2020() {
        let view = context().compute(&request("東京都", (2020, 1), (2020, 3), 2)).unwrap();
        let counts: Vec<u64> = view.records.iter().map(|r| r.new_cases).collect();
        assert_eq!(counts, vec![1, 2, 3]);
        assert!(view.records.iter().all(|r| view.interval.contains(r.date)));

        // The trailing window ignores the display interval.
        assert_eq!(view.trailing_sum, 90);
        assert!((view.rate - 9.0).abs() < 1e-12);
        assert_eq!(view.per_ten_thousand, 900);
        assert_eq!(view.latest_date, NaiveDate::from_ymd_opt(2020, 4, 2));
        assert_eq!(view.interval_total(), 6);
        assert_eq!(view.interval_peak(), 3);
    }

    #[test]
    fn missing_population_is_clear_data_error() {
        let err = context()
            .compute(&request("北海道", (2020, 1), (2020, 3), 3))
            .unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_DATA);
        assert_eq!(err.message(), "No population data for prefecture 北海道.");
    }

    #[test]
    fn unknown_prefecture_is_input_error() {
        let err = context()
            .compute(&request("Atlantis", (2020, 1), (2020, 3), 3))
            .unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_INPUT);
    }

    #[test]
    fn invalid_selection_is_rejected() {
        let ctx = context();
        assert!(ctx.compute(&request("東京都", (2021, 7), (2021, 7), 3)).is_err());
        assert!(ctx.compute(&request("東京都", (2020, 5), (2020, 4), 3)).is_err());
        assert!(ctx.compute(&request("東京都", (2020, 1), (2020, 3), 0)).is_err());
        assert!(ctx.compute(&request("東京都", (2020, 1), (2020, 3), 31)).is_err());
    }

    #[test]
    fn prefectures_in_data_order() {
        assert_eq!(context().prefectures(), vec!["東京都".to_string(), "北海道".to_string()]);
    }
}
