//! Ratatui-based terminal UI.
//!
//! The TUI provides a settings panel for choosing a prefecture, the start and
//! end months and the trailing-day window, then renders the daily case bars
//! and the trailing-window metrics.

use std::io;
use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Terminal,
};
use tracing::{debug, warn};

use crate::app::pipeline::{DashboardContext, DashboardView, ViewRequest};
use crate::domain::MAX_TRAILING_DAYS;
use crate::error::AppError;
use crate::term::{TermField, TermSelection};

mod plotters_chart;

use plotters_chart::CasesBarChart;

/// Directory used by the `x` (export) key.
const EXPORT_DIR: &str = "exports";

/// Start the TUI.
pub fn run(ctx: DashboardContext, prefecture: Option<String>, trailing_days: usize) -> Result<(), AppError> {
    // Resolve start-up choices before touching the terminal so errors print normally.
    let mut app = App::new(ctx, prefecture.as_deref(), trailing_days)?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::runtime(format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::runtime(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::runtime(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Rows of the settings panel, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Setting {
    Prefecture,
    Term(TermField),
    Days,
}

const SETTINGS: [Setting; 6] = [
    Setting::Prefecture,
    Setting::Term(TermField::StartYear),
    Setting::Term(TermField::StartMonth),
    Setting::Term(TermField::EndYear),
    Setting::Term(TermField::EndMonth),
    Setting::Days,
];

struct App {
    ctx: DashboardContext,
    prefectures: Vec<String>,
    prefecture_idx: usize,
    term: TermSelection,
    trailing_days: usize,
    selected_field: usize,
    editing_prefecture: bool,
    prefecture_input: String,
    status: String,
    view: Option<DashboardView>,
}

impl App {
    fn new(ctx: DashboardContext, prefecture: Option<&str>, trailing_days: usize) -> Result<Self, AppError> {
        let prefectures = ctx.prefectures();
        if prefectures.is_empty() {
            return Err(AppError::data("The case table has no prefectures."));
        }

        let prefecture_idx = match prefecture {
            Some(query) => find_prefecture(&prefectures, query)
                .ok_or_else(|| AppError::input(format!("Unknown prefecture '{query}'.")))?,
            None => 0,
        };

        let current = ctx.current();
        let mut app = Self {
            ctx,
            prefectures,
            prefecture_idx,
            term: TermSelection::full_range(current),
            trailing_days: trailing_days.clamp(1, MAX_TRAILING_DAYS),
            selected_field: 0,
            editing_prefecture: false,
            prefecture_input: String::new(),
            status: String::new(),
            view: None,
        };
        app.recompute();
        Ok(app)
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::runtime(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::runtime(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::runtime(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.editing_prefecture {
            self.handle_prefecture_edit(code);
            return false;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                self.selected_field = self.selected_field.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected_field + 1 < SETTINGS.len() {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::PageDown => self.adjust_field(-5),
            KeyCode::PageUp => self.adjust_field(5),
            KeyCode::Enter => {
                if SETTINGS[self.selected_field] == Setting::Prefecture {
                    self.editing_prefecture = true;
                    self.prefecture_input.clear();
                    self.status = "Type a prefecture name. Enter to apply, Esc to cancel.".to_string();
                }
            }
            KeyCode::Char('x') => self.export_view(),
            _ => {}
        }

        false
    }

    fn handle_prefecture_edit(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.editing_prefecture = false;
                self.status = "Prefecture edit canceled.".to_string();
            }
            KeyCode::Enter => {
                self.editing_prefecture = false;
                let query = self.prefecture_input.trim().to_string();
                match find_prefecture(&self.prefectures, &query) {
                    Some(idx) => {
                        self.prefecture_idx = idx;
                        self.recompute();
                    }
                    None => self.status = format!("No prefecture matches '{query}'."),
                }
            }
            KeyCode::Backspace => {
                self.prefecture_input.pop();
            }
            KeyCode::Char(c) => self.prefecture_input.push(c),
            _ => {}
        }
    }

    fn adjust_field(&mut self, delta: i32) {
        let current = self.ctx.current();
        match SETTINGS[self.selected_field] {
            Setting::Prefecture => {
                let n = self.prefectures.len() as i64;
                let next = (self.prefecture_idx as i64 + i64::from(delta)).rem_euclid(n);
                self.prefecture_idx = next as usize;
            }
            Setting::Term(field) => {
                self.term = self.term.step(field, delta, current);
            }
            Setting::Days => {
                let next = self.trailing_days as i64 + i64::from(delta);
                self.trailing_days = next.clamp(1, MAX_TRAILING_DAYS as i64) as usize;
            }
        }
        self.recompute();
    }

    fn recompute(&mut self) {
        let request = ViewRequest {
            prefecture: self.prefectures[self.prefecture_idx].clone(),
            term: self.term.clamp(self.ctx.current()),
            trailing_days: self.trailing_days,
        };
        match self.ctx.compute(&request) {
            Ok(view) => {
                debug!(prefecture = %view.prefecture, shown = view.records.len(), "view updated");
                self.status = format!("{} day(s) shown.", view.records.len());
                self.view = Some(view);
            }
            Err(err) => {
                warn!(prefecture = %request.prefecture, error = %err, "view failed");
                self.status = err.to_string();
                self.view = None;
            }
        }
    }

    fn export_view(&mut self) {
        let Some(view) = &self.view else {
            self.status = "Nothing to export.".to_string();
            return;
        };
        match crate::io::export::write_series_snapshot(
            Path::new(EXPORT_DIR),
            &view.prefecture,
            &view.interval,
            &view.records,
        ) {
            Ok(path) => self.status = format!("Wrote {}", path.display()),
            Err(err) => self.status = format!("Export failed: {err}"),
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();

        let title = match &self.view {
            Some(view) => crate::report::format_title(view),
            None => self.prefectures[self.prefecture_idx].clone(),
        };
        lines.push(Line::from(vec![
            Span::styled("covid", Style::default().fg(Color::Cyan)),
            Span::raw(" | "),
            Span::raw(title),
        ]));

        let range = self
            .ctx
            .cases()
            .date_range()
            .map(|(a, b)| format!("{a}..{b}"))
            .unwrap_or_else(|| "-".to_string());
        lines.push(Line::from(Span::styled(
            format!(
                "data: {range} | prefectures: {} | today: {}",
                self.prefectures.len(),
                self.ctx.current()
            ),
            Style::default().fg(Color::Gray),
        )));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(8)])
            .split(area);

        self.draw_chart(frame, chunks[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[1]);

        self.draw_settings(frame, bottom[0]);
        self.draw_metrics(frame, bottom[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Daily new cases").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(view) = &self.view else {
            let msg = Paragraph::new("No data for this selection.").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        if view.records.is_empty() {
            let msg = Paragraph::new(format!("No reports between {} and {}.", view.interval.start_date(), view.interval.end_date()))
                .style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        }

        let (bars, dates, y_max) = chart_series(view);
        let widget = CasesBarChart {
            bars: &bars,
            dates: &dates,
            y_max,
            x_label: "date",
            y_label: "new cases",
        };
        frame.render_widget(widget, inner);
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = SETTINGS
            .iter()
            .map(|setting| ListItem::new(self.setting_label(*setting)))
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn setting_label(&self, setting: Setting) -> String {
        let term = self.term;
        match setting {
            Setting::Prefecture if self.editing_prefecture => {
                format!("Prefecture: {}_", self.prefecture_input)
            }
            Setting::Prefecture => format!("Prefecture: {}", self.prefectures[self.prefecture_idx]),
            Setting::Term(TermField::StartYear) => format!("Start year: {}", term.start_year),
            Setting::Term(TermField::StartMonth) => format!("Start month: {}", term.start_month),
            Setting::Term(TermField::EndYear) => format!("End year: {}", term.end_year),
            Setting::Term(TermField::EndMonth) => format!("End month: {}", term.end_month),
            Setting::Days => format!("Days: {}", self.trailing_days),
        }
    }

    fn draw_metrics(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Recent cases").borders(Borders::ALL);
        let Some(view) = &self.view else {
            frame.render_widget(Paragraph::new("-").block(block), area);
            return;
        };

        let latest = view
            .latest_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        let lines = vec![
            Line::from(Span::styled(
                crate::report::format_trailing_line(view),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                crate::report::format_rate_line(view),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!(
                    "shown: total={} peak={} | latest report: {latest}",
                    view.interval_total(),
                    view.interval_peak()
                ),
                Style::default().fg(Color::Gray),
            )),
        ];
        let p = Paragraph::new(Text::from(lines))
            .wrap(ratatui::widgets::Wrap { trim: true })
            .block(block);
        frame.render_widget(p, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  PgUp/PgDn ±5  Enter type prefecture  x export  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Exact name first, then prefix, then substring.
fn find_prefecture(prefectures: &[String], query: &str) -> Option<usize> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    prefectures
        .iter()
        .position(|p| p == query)
        .or_else(|| prefectures.iter().position(|p| p.starts_with(query)))
        .or_else(|| prefectures.iter().position(|p| p.contains(query)))
}

/// Build bar series for Plotters: `(index, count)`, dates, padded y bound.
fn chart_series(view: &DashboardView) -> (Vec<(f64, f64)>, Vec<NaiveDate>, f64) {
    let bars: Vec<(f64, f64)> = view
        .records
        .iter()
        .enumerate()
        .map(|(i, r)| (i as f64, r.new_cases as f64))
        .collect();
    let dates = view.records.iter().map(|r| r.date).collect();

    let peak = view.interval_peak() as f64;
    let y_max = if peak > 0.0 { peak * 1.05 } else { 1.0 };

    (bars, dates, y_max)
}
