use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use chrono_tz::Tz;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};

use crate::errors::{Result, ShortsError};
use crate::export::{self, group_digits, truncate_chars};
use crate::normalize::VideoRecord;
use crate::pipeline::{RankBy, RankOptions, Report, rank};

#[derive(Debug, PartialEq)]
enum Mode {
    Normal,
    Filter,
}

struct App {
    report: Report,
    view: RankOptions,
    rows: Vec<VideoRecord>,
    table_state: TableState,
    mode: Mode,
    filter_input: String,
    status: String,
    status_time: Option<Instant>,
    export_dir: PathBuf,
    display_tz: Tz,
    should_quit: bool,
}

impl App {
    fn new(report: Report, mut view: RankOptions, export_dir: PathBuf, display_tz: Tz) -> Self {
        if view.filter.is_none() {
            view.filter = report.hot.first().cloned();
        }
        let filter_input = view.filter.clone().unwrap_or_default();
        let mut app = Self {
            report,
            view,
            rows: Vec::new(),
            table_state: TableState::default(),
            mode: Mode::Normal,
            filter_input,
            status: String::new(),
            status_time: None,
            export_dir,
            display_tz,
            should_quit: false,
        };
        app.apply();
        app
    }

    fn set_status(&mut self, msg: String) {
        self.status = msg;
        self.status_time = Some(Instant::now());
    }

    /// Recomputes the visible rows and clamps the selection.
    fn apply(&mut self) {
        self.rows = rank(&self.report.records, &self.view)
            .into_iter()
            .cloned()
            .collect();
        if self.rows.is_empty() {
            self.table_state.select(None);
        } else {
            let i = self.table_state.selected().unwrap_or(0);
            self.table_state.select(Some(i.min(self.rows.len() - 1)));
        }
    }

    fn replace_report(&mut self, report: Report) {
        self.report = report;
        self.apply();
    }

    fn cycle_sort(&mut self) {
        self.view.rank_by = match self.view.rank_by {
            RankBy::ViewsPerHour => RankBy::Views,
            RankBy::Views => RankBy::Likes,
            RankBy::Likes => RankBy::Comments,
            RankBy::Comments => RankBy::ViewsPerHour,
        };
        self.apply();
        self.set_status(format!("Sorted by {}", self.view.rank_by));
    }

    fn toggle_order(&mut self) {
        self.view.ascending = !self.view.ascending;
        self.apply();
        let order = if self.view.ascending { "ascending" } else { "descending" };
        self.set_status(format!("Order: {order}"));
    }

    fn set_filter(&mut self, text: &str) {
        let text = text.trim();
        self.view.filter = (!text.is_empty()).then(|| text.to_string());
        self.apply();
    }

    fn select_by(&mut self, delta: isize) {
        if self.rows.is_empty() {
            return;
        }
        let current = self.table_state.selected().unwrap_or(0) as isize;
        let new = (current + delta).clamp(0, self.rows.len() as isize - 1) as usize;
        self.table_state.select(Some(new));
    }

    fn select_first(&mut self) {
        if !self.rows.is_empty() {
            self.table_state.select(Some(0));
        }
    }

    fn select_last(&mut self) {
        if !self.rows.is_empty() {
            self.table_state.select(Some(self.rows.len() - 1));
        }
    }

    fn export_rows(&mut self) {
        let path = export::timestamped_path(&self.export_dir, "shorts", Utc::now());
        let rows: Vec<&VideoRecord> = self.rows.iter().collect();
        match export::export_rows(&path, &rows) {
            Ok(p) => self.set_status(format!("Saved {} row(s) to {}", rows.len(), p.display())),
            Err(e) => self.set_status(format!("Export failed: {e}")),
        }
    }

    fn export_keywords(&mut self) {
        let path = export::timestamped_path(&self.export_dir, "keywords", Utc::now());
        match export::export_keywords(&path, &self.report.keywords, &self.report.keyword_stats) {
            Ok(p) => self.set_status(format!("Saved keywords to {}", p.display())),
            Err(e) => self.set_status(format!("Export failed: {e}")),
        }
    }
}

// ── UI rendering ───────────────────────────────────────────────────

fn draw(frame: &mut Frame, app: &mut App) {
    let [title_area, body_area, help_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let quota = &app.report.quota;
    let next_reset = quota.next_reset.with_timezone(&app.display_tz);
    let title = format!(
        " shorts · {} clips · quota {}/{} ({:.1}%) · reset {} ",
        app.report.records.len(),
        group_digits(quota.used),
        group_digits(quota.budget),
        quota.percent_used,
        next_reset.format("%m-%d %H:%M %Z"),
    );
    frame.render_widget(
        Paragraph::new(title).style(Style::new().fg(Color::Black).bg(Color::Cyan)),
        title_area,
    );

    let [table_area, side_area] =
        Layout::horizontal([Constraint::Percentage(72), Constraint::Percentage(28)])
            .areas(body_area);

    let arrow = if app.view.ascending { "▲" } else { "▼" };
    let sort_mark = |col: RankBy| if app.view.rank_by == col { arrow } else { "" };
    let header = Row::new(vec![
        Cell::from("#"),
        Cell::from("published"),
        Cell::from(format!("views{}", sort_mark(RankBy::Views))),
        Cell::from(format!("v/h{}", sort_mark(RankBy::ViewsPerHour))),
        Cell::from(format!("likes{}", sort_mark(RankBy::Likes))),
        Cell::from(format!("cmts{}", sort_mark(RankBy::Comments))),
        Cell::from("len"),
        Cell::from("title"),
        Cell::from("channel"),
    ])
    .style(Style::new().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = app
        .rows
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let rate = r
                .views_per_hour
                .map(|v| group_digits(v.round() as u64))
                .unwrap_or_else(|| "-".to_string());
            Row::new(vec![
                Cell::from((i + 1).to_string()),
                Cell::from(r.published_label()),
                Cell::from(group_digits(r.view_count)),
                Cell::from(rate),
                Cell::from(group_digits(r.like_count)),
                Cell::from(group_digits(r.comment_count)),
                Cell::from(r.length.clone()),
                Cell::from(truncate_chars(&r.title.replace('\n', " "), 60)),
                Cell::from(truncate_chars(&r.channel, 16)),
            ])
        })
        .collect();

    let table_title = match (&app.mode, &app.view.filter) {
        (Mode::Filter, _) => format!("Filter: {}_", app.filter_input),
        (Mode::Normal, Some(f)) => format!("Shorts [filter: {f}]"),
        (Mode::Normal, None) => "Shorts".to_string(),
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Length(19),
            Constraint::Length(11),
            Constraint::Length(9),
            Constraint::Length(8),
            Constraint::Length(7),
            Constraint::Length(5),
            Constraint::Fill(1),
            Constraint::Length(16),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(table_title))
    .row_highlight_style(
        Style::new()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("▸ ");
    frame.render_stateful_widget(table, table_area, &mut app.table_state);

    frame.render_widget(
        Paragraph::new(side_panel(app))
            .block(Block::default().borders(Borders::ALL).title("Keywords"))
            .wrap(Wrap { trim: false }),
        side_area,
    );

    if let Some(t) = app.status_time
        && t.elapsed() > Duration::from_secs(3)
    {
        app.status.clear();
        app.status_time = None;
    }

    let help_text = match app.mode {
        Mode::Normal => {
            if app.status.is_empty() {
                " [q]uit [s]ort [o]rder [/]filter [e]xport csv [x]port keywords [r]escan [j/k]move"
                    .to_string()
            } else {
                format!(" {} ", app.status)
            }
        }
        Mode::Filter => " Type to filter (live) · [Enter] done · [Esc] clear".to_string(),
    };
    frame.render_widget(
        Paragraph::new(help_text).style(Style::new().fg(Color::Black).bg(Color::White)),
        help_area,
    );
}

fn side_panel(app: &App) -> Vec<Line<'static>> {
    let dim = Style::new().fg(Color::DarkGray);
    let hot = Style::new().fg(Color::Red).add_modifier(Modifier::BOLD);
    let mut lines = vec![Line::styled("Top keywords", dim)];
    for (i, entry) in app.report.keywords.iter().enumerate() {
        let style = if app.report.hot.contains(&entry.keyword) {
            hot
        } else {
            Style::new()
        };
        let spread = app
            .report
            .keyword_stats
            .iter()
            .find(|s| s.keyword == entry.keyword)
            .map(|s| format!(" · {}ch", s.channel_overlap))
            .unwrap_or_default();
        lines.push(Line::from(vec![
            Span::styled(format!("{:>2}. ", i + 1), dim),
            Span::styled(entry.keyword.clone(), style),
            Span::styled(format!(" ({}{})", entry.count, spread), dim),
        ]));
    }

    lines.push(Line::raw(""));
    lines.push(Line::styled(
        format!("Trends via {}", app.report.trends.source),
        dim,
    ));
    for (i, word) in app.report.trends.keywords.iter().enumerate() {
        lines.push(Line::raw(format!("{:>2}. {}", i + 1, word)));
    }

    lines.push(Line::raw(""));
    lines.push(Line::styled("Hot", dim));
    if app.report.hot.is_empty() {
        lines.push(Line::raw("—"));
    } else {
        lines.push(Line::styled(app.report.hot.join(", "), hot));
    }
    lines
}

// ── Event handling ─────────────────────────────────────────────────

fn handle_event<F>(app: &mut App, rescan: &mut F) -> std::io::Result<()>
where
    F: FnMut() -> Result<Report>,
{
    if !event::poll(Duration::from_millis(250))? {
        return Ok(());
    }

    let Event::Key(key) = event::read()? else {
        return Ok(());
    };
    if key.kind != KeyEventKind::Press {
        return Ok(());
    }

    match app.mode {
        Mode::Normal => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => app.select_by(1),
            KeyCode::Char('k') | KeyCode::Up => app.select_by(-1),
            KeyCode::PageDown => app.select_by(10),
            KeyCode::PageUp => app.select_by(-10),
            KeyCode::Char('g') | KeyCode::Home => app.select_first(),
            KeyCode::Char('G') | KeyCode::End => app.select_last(),
            KeyCode::Char('s') => app.cycle_sort(),
            KeyCode::Char('o') => app.toggle_order(),
            KeyCode::Char('/') => {
                app.mode = Mode::Filter;
                app.filter_input = app.view.filter.clone().unwrap_or_default();
                app.status.clear();
                app.status_time = None;
            }
            KeyCode::Char('e') => app.export_rows(),
            KeyCode::Char('x') => app.export_keywords(),
            KeyCode::Char('r') => match rescan() {
                Ok(report) => {
                    app.replace_report(report);
                    app.set_status("Rescanned".to_string());
                }
                Err(e) => app.set_status(format!("Rescan failed: {e}")),
            },
            _ => {}
        },
        Mode::Filter => match key.code {
            KeyCode::Esc => {
                app.mode = Mode::Normal;
                app.filter_input.clear();
                app.set_filter("");
            }
            KeyCode::Enter => app.mode = Mode::Normal,
            KeyCode::Backspace => {
                app.filter_input.pop();
                let text = app.filter_input.clone();
                app.set_filter(&text);
            }
            KeyCode::Char(c) => {
                app.filter_input.push(c);
                let text = app.filter_input.clone();
                app.set_filter(&text);
            }
            _ => {}
        },
    }

    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────

/// Interactive table over `report`. `r` calls `rescan` for a fresh one.
pub fn run<F>(
    report: Report,
    view: RankOptions,
    export_dir: &Path,
    display_tz: Tz,
    mut rescan: F,
) -> Result<()>
where
    F: FnMut() -> Result<Report>,
{
    let mut app = App::new(report, view, export_dir.to_path_buf(), display_tz);

    let mut terminal = ratatui::init();

    let result = (|| {
        loop {
            terminal.draw(|frame| draw(frame, &mut app))?;
            handle_event(&mut app, &mut rescan)?;
            if app.should_quit {
                break;
            }
        }
        Ok::<(), std::io::Error>(())
    })();

    ratatui::restore();

    result.map_err(|e| ShortsError::Terminal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::{KeywordEntry, KeywordStats};
    use crate::quota::QuotaLedger;
    use crate::quota::QuotaPolicy;
    use crate::trends::TrendOutcome;
    use crate::pipeline::ScanMode;

    fn record(id: &str, title: &str, views: u64, vph: Option<f64>) -> VideoRecord {
        VideoRecord {
            video_id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            view_count: views,
            like_count: views / 10,
            comment_count: 1_000 / views,
            duration_seconds: 30,
            length: "00:30".to_string(),
            channel: "채널".to_string(),
            channel_id: None,
            url: String::new(),
            published_at: None,
            hours_since_upload: None,
            views_per_hour: vph,
        }
    }

    fn report(hot: &[&str]) -> Report {
        Report {
            generated_at: Utc::now(),
            mode: ScanMode::Trend,
            pages: 1,
            ids_collected: 3,
            listing_error: None,
            records: vec![
                record("a", "예산안 통과", 100, Some(10.0)),
                record("b", "태풍 북상", 300, Some(5.0)),
                record("c", "예산안 지연", 200, Some(50.0)),
            ],
            keywords: vec![KeywordEntry {
                keyword: "예산안".to_string(),
                count: 2,
            }],
            keyword_stats: vec![KeywordStats {
                keyword: "예산안".to_string(),
                videos: 2,
                channel_overlap: 1,
                top_view_count: 200,
                top_channel: "채널".to_string(),
                top_url: String::new(),
            }],
            trends: TrendOutcome {
                keywords: vec!["예산안".to_string()],
                source: "google-daily".to_string(),
                attempts: Vec::new(),
            },
            hot: hot.iter().map(|s| s.to_string()).collect(),
            quota: QuotaLedger::in_memory(QuotaPolicy::default()).snapshot(),
        }
    }

    fn view() -> RankOptions {
        RankOptions {
            top: 20,
            ..Default::default()
        }
    }

    fn ids(app: &App) -> Vec<&str> {
        app.rows.iter().map(|r| r.video_id.as_str()).collect()
    }

    fn app(hot: &[&str]) -> App {
        App::new(report(hot), view(), PathBuf::from("/tmp"), chrono_tz::Asia::Seoul)
    }

    #[test]
    fn test_filter_defaults_to_first_hot_keyword() {
        let app = app(&["예산안"]);
        assert_eq!(app.view.filter.as_deref(), Some("예산안"));
        assert_eq!(ids(&app), vec!["c", "a"]);
        assert_eq!(app.table_state.selected(), Some(0));
    }

    #[test]
    fn test_no_hot_no_filter() {
        let app = app(&[]);
        assert!(app.view.filter.is_none());
        assert_eq!(ids(&app), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_sort_cycle_and_order() {
        let mut app = app(&[]);
        app.cycle_sort();
        assert_eq!(app.view.rank_by, RankBy::Views);
        assert_eq!(ids(&app), vec!["b", "c", "a"]);
        app.toggle_order();
        assert_eq!(ids(&app), vec!["a", "c", "b"]);

        app.cycle_sort();
        assert_eq!(app.view.rank_by, RankBy::Likes);
        assert_eq!(ids(&app), vec!["a", "c", "b"]);
        app.cycle_sort();
        assert_eq!(app.view.rank_by, RankBy::Comments);
        assert_eq!(ids(&app), vec!["b", "c", "a"]);
        app.toggle_order();
        app.cycle_sort();
        assert_eq!(app.view.rank_by, RankBy::ViewsPerHour);
        assert_eq!(ids(&app), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_selection_clamped_when_filter_narrows() {
        let mut app = app(&[]);
        app.select_last();
        assert_eq!(app.table_state.selected(), Some(2));
        app.set_filter("태풍");
        assert_eq!(ids(&app), vec!["b"]);
        assert_eq!(app.table_state.selected(), Some(0));
        app.set_filter("없는말");
        assert_eq!(app.table_state.selected(), None);
        app.set_filter("");
        assert_eq!(app.rows.len(), 3);
    }

    #[test]
    fn test_export_from_app() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = App::new(report(&[]), view(), dir.path().to_path_buf(), chrono_tz::Asia::Seoul);
        app.export_rows();
        app.export_keywords();
        let files = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 2);
        assert!(app.status.starts_with("Saved"));
    }
}
