//! Formatted terminal output for a computed view.
//!
//! We keep formatting code in one place so the TUI and the `report`
//! subcommand print the same wording.

use crate::app::pipeline::{DashboardContext, DashboardView};

/// Chart title, e.g. `東京都: new COVID-19 cases (2020/1 - 2020/3)`.
pub fn format_title(view: &DashboardView) -> String {
    format!("{}: new COVID-19 cases ({})", view.prefecture, view.interval)
}

/// The trailing-window total line.
pub fn format_trailing_line(view: &DashboardView) -> String {
    format!(
        "New cases in {} over the last {} day(s): {}",
        view.prefecture, view.trailing_days, view.trailing_sum
    )
}

/// The population-rate line.
pub fn format_rate_line(view: &DashboardView) -> String {
    format!(
        "{:.3}% of the {} population (about {} per 10,000; census {} {}, n={})",
        view.rate,
        view.prefecture,
        view.per_ten_thousand,
        view.population.era,
        view.population.year,
        view.population.population,
    )
}

/// Full text summary used by `covid report`.
pub fn format_view(view: &DashboardView) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {} ===\n", format_title(view)));
    out.push_str(&format!(
        "Shown: {} day(s) | {}..{} | total={} | peak={}\n",
        view.records.len(),
        view.interval.start_date(),
        view.interval.end_date(),
        view.interval_total(),
        view.interval_peak(),
    ));
    if let Some(latest) = view.latest_date {
        out.push_str(&format!("Latest data: {latest}\n"));
    }
    out.push('\n');
    out.push_str(&format_trailing_line(view));
    out.push('\n');
    out.push_str(&format_rate_line(view));
    out.push('\n');

    out
}

/// Table of selectable prefectures with their population record.
pub fn format_prefectures(ctx: &DashboardContext) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<10} {:>6} {:>12} {:>6}\n", "prefecture", "days", "population", "year"));

    for name in ctx.prefectures() {
        let days = ctx.cases().series(&name).map(|s| s.len()).unwrap_or(0);
        let (population, year) = match ctx.population().get(&name) {
            Some(p) => (p.population.to_string(), p.year.to_string()),
            None => ("-".to_string(), "-".to_string()),
        };
        out.push_str(&format!("{name:<10} {days:>6} {population:>12} {year:>6}\n"));
    }

    out
}
