//! Command-line parsing for the prefecture case dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the loading/metrics code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::{InputEncoding, YearMonth, DEFAULT_TRAILING_DAYS};

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "covid", version, about = "Japanese prefecture COVID-19 case dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the interactive TUI (default).
    Tui(TuiArgs),
    /// Print the chart summary for one prefecture and date range.
    Report(ReportArgs),
    /// List the prefectures found in the case table.
    Prefectures(DataArgs),
}

/// Where the tables come from and how they are interpreted.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Daily case CSV (falls back to $COVID_CASES_CSV, then the NHK file name).
    #[arg(long, value_name = "CSV")]
    pub cases: Option<PathBuf>,

    /// Census population CSV (falls back to $COVID_POPULATION_CSV, then `population.csv`).
    #[arg(long, value_name = "CSV")]
    pub population: Option<PathBuf>,

    /// Census era to use from the population table.
    #[arg(long, default_value = "平成")]
    pub era: String,

    /// Use census rows from every era.
    #[arg(long)]
    pub all_eras: bool,

    /// Pin the census year instead of using the latest one available.
    #[arg(long)]
    pub census_year: Option<i32>,

    /// Encoding of the CSV files: `auto`, `utf-8`, `cp932`, ...
    #[arg(long, default_value = "auto")]
    pub encoding: InputEncoding,

    /// Treat this date as today when building the selectable months (YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    pub as_of: Option<NaiveDate>,

    /// Append logs to this file.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

/// Options for the interactive dashboard.
#[derive(Debug, Args, Clone)]
pub struct TuiArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Prefecture selected at start-up (defaults to the first one in the data).
    #[arg(short = 'p', long)]
    pub prefecture: Option<String>,

    /// Trailing-day window (1-30).
    #[arg(short = 'd', long, default_value_t = DEFAULT_TRAILING_DAYS)]
    pub days: usize,
}

/// Options for the text report.
#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Prefecture name as written in the case table (e.g. 東京都).
    #[arg(short = 'p', long)]
    pub prefecture: String,

    /// First month shown (YYYY-MM, default 2020-01).
    #[arg(long, value_name = "YYYY-MM")]
    pub start: Option<YearMonth>,

    /// Last month shown (YYYY-MM, default: current month).
    #[arg(long, value_name = "YYYY-MM")]
    pub end: Option<YearMonth>,

    /// Trailing-day window (1-30).
    #[arg(short = 'd', long, default_value_t = DEFAULT_TRAILING_DAYS)]
    pub days: usize,

    /// Render an ASCII bar chart of the shown days.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 15)]
    pub height: usize,

    /// Export the shown days to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_args_parse() {
        let cli = Cli::parse_from([
            "covid", "report", "-p", "東京都", "--start", "2020-01", "--end", "2020-03", "-d", "7",
            "--plot",
        ]);
        let Command::Report(args) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.prefecture, "東京都");
        assert_eq!(args.start, YearMonth::new(2020, 1));
        assert_eq!(args.end, YearMonth::new(2020, 3));
        assert_eq!(args.days, 7);
        assert!(args.plot);
        assert_eq!(args.data.era, "平成");
    }

    #[test]
    fn tui_defaults() {
        let cli = Cli::parse_from(["covid", "tui", "--as-of", "2021-06-15"]);
        let Command::Tui(args) = cli.command else {
            panic!("expected tui");
        };
        assert_eq!(args.days, DEFAULT_TRAILING_DAYS);
        assert!(args.prefecture.is_none());
        assert_eq!(args.data.as_of, NaiveDate::from_ymd_opt(2021, 6, 15));
        assert_eq!(args.data.encoding, InputEncoding::Auto);
    }

    #[test]
    fn encoding_flag() {
        let cli = Cli::parse_from(["covid", "prefectures", "--encoding", "cp932"]);
        let Command::Prefectures(args) = cli.command else {
            panic!("expected prefectures");
        };
        assert_eq!(args.encoding, InputEncoding::Fixed(encoding_rs::SHIFT_JIS));

        let bad = Cli::try_parse_from(["covid", "prefectures", "--encoding", "nope"]);
        assert!(bad.is_err());
    }
}
