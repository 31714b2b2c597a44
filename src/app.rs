//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - resolves table paths and sets up logging
//! - loads the dashboard context once
//! - dispatches to the TUI or the text commands

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::Parser;
use tracing::info;

use crate::app::pipeline::{DashboardContext, ViewRequest};
use crate::cli::{Command, DataArgs, ReportArgs, TuiArgs};
use crate::domain::{DashboardConfig, InputEncoding, YearMonth, DEFAULT_TRAILING_DAYS, EPOCH_YEAR};
use crate::error::AppError;
use crate::logging::LogTarget;
use crate::term::TermSelection;

pub mod pipeline;

pub const CASES_ENV: &str = "COVID_CASES_CSV";
pub const POPULATION_ENV: &str = "COVID_POPULATION_CSV";
pub const DEFAULT_CASES_FILE: &str = "nhk_news_covid19_prefectures_daily_data.csv";
pub const DEFAULT_POPULATION_FILE: &str = "population.csv";

/// Entry point for the `covid` binary.
pub fn run() -> Result<(), AppError> {
    // We want `covid` and `covid -p 東京都` to behave like `covid tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    dotenvy::dotenv().ok();

    match cli.command {
        Command::Tui(args) => handle_tui(args),
        Command::Report(args) => handle_report(args),
        Command::Prefectures(args) => handle_prefectures(args),
    }
}

fn handle_tui(args: TuiArgs) -> Result<(), AppError> {
    crate::logging::init(args.data.log_file.as_deref(), LogTarget::Discard, "info")?;
    let config = dashboard_config(&args.data, args.days)?;
    let ctx = DashboardContext::load(&config)?;
    info!(current = %ctx.current(), "starting tui");
    crate::tui::run(ctx, args.prefecture, config.trailing_days)
}

fn handle_report(args: ReportArgs) -> Result<(), AppError> {
    crate::logging::init(args.data.log_file.as_deref(), LogTarget::Stderr, "warn")?;
    let mut config = dashboard_config(&args.data, args.days)?;
    config.plot_width = args.width;
    config.plot_height = args.height;

    let ctx = DashboardContext::load(&config)?;
    let request = ViewRequest {
        prefecture: args.prefecture.clone(),
        term: report_term(args.start, args.end, ctx.current())?,
        trailing_days: config.trailing_days,
    };
    let view = ctx.compute(&request)?;

    println!("{}", crate::report::format_view(&view));
    if args.plot {
        println!(
            "{}",
            crate::plot::render_ascii_bars(&view.records, config.plot_width, config.plot_height)
        );
    }

    if let Some(path) = &args.export {
        crate::io::export::write_series_csv(path, &view.records)?;
    }

    Ok(())
}

fn handle_prefectures(args: DataArgs) -> Result<(), AppError> {
    crate::logging::init(args.log_file.as_deref(), LogTarget::Stderr, "warn")?;
    let config = dashboard_config(&args, DEFAULT_TRAILING_DAYS)?;
    let ctx = DashboardContext::load(&config)?;
    print!("{}", crate::report::format_prefectures(&ctx));
    Ok(())
}

/// Build the run configuration from flags, environment and defaults.
pub fn dashboard_config(args: &DataArgs, trailing_days: usize) -> Result<DashboardConfig, AppError> {
    let cases_path = resolve_table_path("case", args.cases.as_deref(), CASES_ENV, DEFAULT_CASES_FILE)?;
    let population_path = resolve_table_path(
        "population",
        args.population.as_deref(),
        POPULATION_ENV,
        DEFAULT_POPULATION_FILE,
    )?;

    let era = if args.all_eras { None } else { Some(args.era.clone()) };

    Ok(DashboardConfig {
        cases_path,
        population_path,
        era,
        census_year: args.census_year,
        encoding: args.encoding,
        today: args.as_of.unwrap_or_else(|| Local::now().date_naive()),
        trailing_days,
        plot_width: 80,
        plot_height: 15,
    })
}

/// Flag, then env var, then default name; prompt when that file is missing.
fn resolve_table_path(
    label: &str,
    explicit: Option<&Path>,
    env_key: &str,
    default: &str,
) -> Result<PathBuf, AppError> {
    let candidate = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(env_key).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(default));

    if candidate.exists() || !std::io::stdin().is_terminal() {
        // Loading reports the missing file with a proper error.
        return Ok(candidate);
    }
    crate::cli::picker::prompt_for_csv_path(label, &candidate)
}

/// Default the report range to `EPOCH_YEAR/1 ..= current`.
fn report_term(
    start: Option<YearMonth>,
    end: Option<YearMonth>,
    current: YearMonth,
) -> Result<TermSelection, AppError> {
    let start = match start {
        Some(s) => s,
        None => YearMonth::new(EPOCH_YEAR, 1)
            .ok_or_else(|| AppError::input("Invalid epoch month."))?,
    };
    Ok(TermSelection::from_months(start, end.unwrap_or(current)))
}

/// Rewrite argv so `covid` defaults to `covid tui`.
///
/// Rules:
/// - `covid`                         -> `covid tui`
/// - `covid -p 東京都 ...`            -> `covid tui -p 東京都 ...`
/// - `covid --help/--version/-h`     -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "tui" | "report" | "prefectures");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}
