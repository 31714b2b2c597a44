//! ASCII bar chart for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! One column per day; when there are more days than columns, each column
//! shows the peak of the days it covers.

use crate::domain::CaseRecord;

/// Render the daily counts as vertical `#` bars.
pub fn render_ascii_bars(records: &[CaseRecord], width: usize, height: usize) -> String {
    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return "Plot: no data in range\n".to_string();
    };

    let width = width.max(1);
    let height = height.max(1);

    let columns = bucket_peaks(records, width);
    let y_max = columns.iter().copied().max().unwrap_or(0);

    let bar_heights: Vec<usize> = columns
        .iter()
        .map(|&v| map_height(v, y_max, height))
        .collect();

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {}..{} | days={} | max={y_max}\n",
        first.date,
        last.date,
        records.len()
    ));

    for row in 0..height {
        // Row 0 is the top of the chart.
        let threshold = height - row;
        let line: String = bar_heights
            .iter()
            .map(|&h| if h >= threshold { '#' } else { ' ' })
            .collect();
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out.push_str(&"-".repeat(bar_heights.len()));
    out.push('\n');

    out
}

/// Peak count per column, covering consecutive days.
fn bucket_peaks(records: &[CaseRecord], width: usize) -> Vec<u64> {
    let n = records.len();
    if n <= width {
        return records.iter().map(|r| r.new_cases).collect();
    }

    (0..width)
        .map(|col| {
            let lo = col * n / width;
            let hi = ((col + 1) * n / width).max(lo + 1);
            records[lo..hi].iter().map(|r| r.new_cases).max().unwrap_or(0)
        })
        .collect()
}

fn map_height(value: u64, y_max: u64, height: usize) -> usize {
    if y_max == 0 {
        return 0;
    }
    let u = value as f64 / y_max as f64;
    (u * height as f64).round() as usize
}
