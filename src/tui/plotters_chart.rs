//! Plotters-powered daily case bar chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use chrono::NaiveDate;
use plotters::prelude::*;
// `ratatui::style::Color` below shadows the prelude's trait; `filled` needs it.
use plotters::style::Color as _;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A lightweight, render-only chart description.
///
/// All series and bounds are computed outside the render call.
pub struct CasesBarChart<'a> {
    /// One bar per day: `(index, count)`.
    pub bars: &'a [(f64, f64)],
    /// Date of each bar, used for x tick labels.
    pub dates: &'a [NaiveDate],
    /// Upper y bound (already padded).
    pub y_max: f64,
    pub x_label: &'a str,
    pub y_label: &'a str,
}

impl<'a> Widget for CasesBarChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to build a chart in a tiny area.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let n = self.bars.len();
        if n == 0 || !(self.y_max.is_finite() && self.y_max > 0.0) {
            return;
        }

        let x0 = -0.5_f64;
        let x1 = n as f64 - 0.5;
        let y1 = self.y_max;
        let half = bar_half_width(n, area.width);

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 7)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, 0.0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(self.y_label)
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| fmt_date_tick(self.dates, *v))
                .y_label_formatter(&|v| format!("{v:.0}"))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            chart.draw_series(self.bars.iter().map(|&(x, y)| {
                Rectangle::new([(x - half, 0.0), (x + half, y)], bar_color(y, y1).filled())
            }))?;

            Ok(())
        });

        widget.render(area, buf);
    }
}

/// Half the bar width in x units; bars touch when days outnumber columns.
fn bar_half_width(n: usize, columns: u16) -> f64 {
    if n as f64 >= f64::from(columns) { 0.5 } else { 0.4 }
}

/// Shade from teal (quiet days) to red (peak days).
fn bar_color(value: f64, y_max: f64) -> RGBColor {
    let u = if y_max > 0.0 { (value / y_max).clamp(0.0, 1.0) } else { 0.0 };
    let lerp = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * u).round() as u8;
    RGBColor(lerp(0, 255), lerp(200, 60), lerp(200, 40))
}

fn fmt_date_tick(dates: &[NaiveDate], v: f64) -> String {
    let idx = v.round();
    if idx < 0.0 {
        return String::new();
    }
    dates
        .get(idx as usize)
        .map(|d| d.format("%y/%m/%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_run_from_teal_to_red() {
        assert_eq!(bar_color(0.0, 10.0), RGBColor(0, 200, 200));
        assert_eq!(bar_color(10.0, 10.0), RGBColor(255, 60, 40));
        assert_eq!(bar_color(5.0, 0.0), RGBColor(0, 200, 200));
    }

    #[test]
    fn date_ticks_follow_bar_index() {
        let dates = vec![
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
        ];
        assert_eq!(fmt_date_tick(&dates, 0.9), "20/01/02");
        assert_eq!(fmt_date_tick(&dates, -0.6), "");
        assert_eq!(fmt_date_tick(&dates, 5.0), "");
    }

    #[test]
    fn renders_into_buffer() {
        let bars = [(0.0, 3.0), (1.0, 9.0), (2.0, 5.0)];
        let dates = [
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2020, 1, 3).unwrap(),
        ];
        let chart = CasesBarChart {
            bars: &bars,
            dates: &dates,
            y_max: 10.0,
            x_label: "date",
            y_label: "cases",
        };
        let area = Rect::new(0, 0, 60, 20);
        let mut buf = Buffer::empty(area);
        chart.render(area, &mut buf);
        let drawn = buf.content().iter().filter(|cell| cell.symbol() != " ").count();
        assert!(drawn > 0);
    }

    #[test]
    fn bars_touch_when_crowded() {
        assert_eq!(bar_half_width(500, 80), 0.5);
        assert_eq!(bar_half_width(10, 80), 0.4);
    }
}
