use std::io;
use std::time::{Duration, Instant};

use chrono::{Datelike, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Points};
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Row, Table, Wrap};
use ratatui::Terminal;

use crate::charts::{BarChart, LineChart, PieChart};
use crate::error::{ReportError, Result};
use crate::latency::LatencyTracker;
use crate::report::{Report, ReportRenderer};
use crate::types::ChangeCategory;
use crate::view::{Field, ViewQuery, Widgets};

const PALETTE: [Color; 4] = [
    Color::Rgb(31, 119, 180),
    Color::Rgb(255, 127, 14),
    Color::Rgb(44, 160, 44),
    Color::Rgb(214, 39, 40),
];
const PIE_RESOLUTION: i32 = 48;

/// Dashboard state. Every input change re-runs the whole pass.
pub struct App {
    renderer: ReportRenderer,
    initial: ViewQuery,
    widgets: Option<Widgets>,
    report: Option<Report>,
    error: Option<String>,
    latency: LatencyTracker,
    passes: u64,
    should_quit: bool,
}

impl App {
    pub fn new(renderer: ReportRenderer, initial: ViewQuery) -> Self {
        Self {
            renderer,
            initial,
            widgets: None,
            report: None,
            error: None,
            latency: LatencyTracker::new(),
            passes: 0,
            should_quit: false,
        }
    }

    pub fn widgets(&self) -> Option<&Widgets> {
        self.widgets.as_ref()
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn latency(&self) -> &LatencyTracker {
        &self.latency
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Full pass: reload the file, re-clamp the widgets, re-render everything.
    pub fn rerun(&mut self) {
        let start = self.latency.start();
        self.passes += 1;
        match self.pass(start) {
            Ok(report) => {
                self.latency.record_pass(start);
                self.report = Some(report);
                self.error = None;
            }
            Err(e) => {
                self.latency.record_failure();
                self.report = None;
                self.error = Some(e.to_string());
            }
        }
    }

    fn pass(&mut self, started: Instant) -> Result<Report> {
        let table = self.renderer.load()?;
        let bounds = table.bounds().ok_or(ReportError::EmptyTable)?;
        let widgets = match self.widgets {
            Some(mut w) => {
                w.rebound(bounds);
                w
            }
            None => Widgets::new(bounds, self.initial.resolve(bounds)),
        };
        self.widgets = Some(widgets);
        self.renderer.render_table_since(&table, &widgets.params, started)
    }

    /// Clear pass counters and timings without touching the view.
    pub fn clear_stats(&mut self) {
        self.latency.reset();
        self.passes = 0;
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('c') => {
                self.clear_stats();
                return;
            }
            KeyCode::Char('r') => {}
            _ => {
                // nothing loaded yet: only quit, clear and reload are live
                let Some(widgets) = self.widgets.as_mut() else {
                    return;
                };
                match code {
                    KeyCode::Tab => {
                        widgets.focus = widgets.focus.next();
                        return;
                    }
                    KeyCode::Left => widgets.adjust(-1),
                    KeyCode::Right => widgets.adjust(1),
                    KeyCode::Down => widgets.adjust(-30),
                    KeyCode::Up => widgets.adjust(30),
                    _ => return,
                }
            }
        }
        self.rerun();
    }
}

pub fn run(renderer: ReportRenderer, initial: ViewQuery) -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, App::new(renderer, initial));

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    app.rerun();

    while !app.should_quit {
        terminal.draw(|f| draw(f, &app))?;

        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }
    }
    Ok(())
}

fn draw(f: &mut ratatui::Frame, app: &App) {
    let size = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),      // header
            Constraint::Length(3),      // widgets
            Constraint::Percentage(50), // price + volume
            Constraint::Min(10),        // moving average + pie
        ])
        .split(size);

    draw_header(f, app, chunks[0]);
    draw_widgets(f, app, chunks[1]);

    let (Some(report), None) = (&app.report, &app.error) else {
        let msg = app.error.as_deref().unwrap_or("Loading...");
        let p = Paragraph::new(msg)
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title(" Error "));
        let area = Rect {
            height: chunks[2].height + chunks[3].height,
            ..chunks[2]
        };
        f.render_widget(p, area);
        return;
    };

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[2]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[3]);

    draw_line_chart(f, &report.price_chart, top[0]);
    draw_volume(f, &report.volume_chart, top[1]);
    draw_line_chart(f, &report.moving_average_chart, bottom[0]);
    draw_pie(f, &report.change_pie, bottom[1]);
}

fn draw_header(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let stats = app.latency.stats();
    let rows = app
        .report
        .as_ref()
        .map(|r| format!("Rows: {}/{}", r.rows_in_view, r.total_rows))
        .unwrap_or_else(|| "Rows: -".to_string());
    let header = vec![
        Span::styled(" price-dashboard ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(" | "),
        Span::styled(rows, Style::default().fg(Color::Green)),
        Span::raw(" | "),
        Span::raw(format!("Passes: {} (failed {})", app.passes, app.latency.failures())),
        Span::raw(" | "),
        Span::styled(format!("p50={}us p99={}us", stats.p50_us, stats.p99_us), Style::default().fg(Color::Yellow)),
        Span::raw(" | "),
        Span::styled("q=quit Tab=focus Left/Right=±1d Up/Down=±30d r=reload c=clear stats", Style::default().fg(Color::DarkGray)),
    ];
    let title = format!(" {} ", app.renderer.settings().data_path.display());
    let p = Paragraph::new(Line::from(header))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_widgets(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let Some(w) = app.widgets else {
        let p = Paragraph::new("no data loaded").block(Block::default().borders(Borders::ALL));
        f.render_widget(p, area);
        return;
    };
    let field = |name: &str, value: String, which: Field| {
        let style = if w.focus == which {
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        vec![
            Span::styled(format!(" {name}: "), Style::default().fg(Color::DarkGray)),
            Span::styled(format!(" {value} "), style),
            Span::raw("  "),
        ]
    };
    let mut spans = Vec::new();
    spans.extend(field("Start Date", w.params.start.to_string(), Field::Start));
    spans.extend(field("End Date", w.params.end.to_string(), Field::End));
    spans.extend(field("Plot Type", w.params.kind.label().to_string(), Field::Kind));
    spans.push(Span::styled(
        format!("range {} .. {}", w.bounds.min, w.bounds.max),
        Style::default().fg(Color::DarkGray),
    ));
    let p = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title(" Financial Data Analysis "));
    f.render_widget(p, area);
}

fn day_number(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}

fn date_labels(first: NaiveDate, last: NaiveDate) -> Vec<String> {
    let mid = first + (last - first) / 2;
    vec![first.to_string(), mid.to_string(), last.to_string()]
}

fn x_bounds(first: NaiveDate, last: NaiveDate) -> [f64; 2] {
    let (a, b) = (day_number(first), day_number(last));
    if b > a { [a, b] } else { [a - 1.0, b + 1.0] }
}

fn y_bounds(lo: f64, hi: f64) -> [f64; 2] {
    let pad = ((hi - lo) * 0.05).max(lo.abs() * 0.01).max(1e-9);
    [lo - pad, hi + pad]
}

fn value_labels(bounds: [f64; 2]) -> Vec<String> {
    let mid = (bounds[0] + bounds[1]) / 2.0;
    [bounds[0], mid, bounds[1]].iter().map(|v| compact(*v)).collect()
}

fn compact(v: f64) -> String {
    let abs = v.abs();
    if abs >= 1e9 {
        format!("{:.1}B", v / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", v / 1e6)
    } else {
        format!("{v:.2}")
    }
}

fn empty_panel(f: &mut ratatui::Frame, title: &str, area: Rect) {
    let p = Paragraph::new("No data in range")
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL).title(format!(" {title} ")));
    f.render_widget(p, area);
}

fn draw_line_chart(f: &mut ratatui::Frame, chart: &LineChart, area: Rect) {
    let (Some((first, last)), Some((lo, hi))) = (chart.date_range(), chart.value_range()) else {
        empty_panel(f, &chart.title, area);
        return;
    };
    let data: Vec<Vec<(f64, f64)>> = chart
        .series
        .iter()
        .map(|s| s.defined().map(|(d, v)| (day_number(d), v)).collect())
        .collect();
    let datasets: Vec<Dataset> = chart
        .series
        .iter()
        .zip(data.iter())
        .enumerate()
        .map(|(i, (s, points))| {
            let marker = if s.markers { Marker::Dot } else { Marker::Braille };
            Dataset::default()
                .name(s.label.clone())
                .marker(marker)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(PALETTE[i % PALETTE.len()]))
                .data(points)
        })
        .collect();

    let yb = y_bounds(lo, hi);
    let widget = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(format!(" {} ", chart.title)))
        .x_axis(
            Axis::default()
                .title(chart.x_label.clone())
                .style(Style::default().fg(Color::Gray))
                .bounds(x_bounds(first, last))
                .labels(date_labels(first, last)),
        )
        .y_axis(
            Axis::default()
                .title(chart.y_label.clone())
                .style(Style::default().fg(Color::Gray))
                .bounds(yb)
                .labels(value_labels(yb)),
        );
    f.render_widget(widget, area);
}

fn draw_volume(f: &mut ratatui::Frame, chart: &BarChart, area: Rect) {
    let (Some((first, last)), Some(max)) = (chart.date_range(), chart.max_value()) else {
        empty_panel(f, &chart.title, area);
        return;
    };
    let points: Vec<(f64, f64)> = chart
        .bars
        .iter()
        .filter(|(_, v)| v.is_finite())
        .map(|(d, v)| (day_number(*d), *v))
        .collect();
    let dataset = Dataset::default()
        .name(chart.label.clone())
        .marker(Marker::HalfBlock)
        .graph_type(GraphType::Bar)
        .style(Style::default().fg(PALETTE[0]))
        .data(&points);
    let yb = [0.0, max.max(1.0)];
    let widget = Chart::new(vec![dataset])
        .block(Block::default().borders(Borders::ALL).title(format!(" {} ", chart.title)))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds(x_bounds(first, last))
                .labels(date_labels(first, last)),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds(yb)
                .labels(value_labels(yb)),
        );
    f.render_widget(widget, area);
}

fn category_color(category: ChangeCategory) -> Color {
    match category {
        ChangeCategory::Negative => Color::Red,
        ChangeCategory::Neutral => Color::Gray,
        ChangeCategory::Positive => Color::Green,
    }
}

/// Disc sample points grouped by the slice they fall into.
fn pie_points(chart: &PieChart) -> Vec<Vec<(f64, f64)>> {
    let mut buckets = vec![Vec::new(); chart.slices.len()];
    let n = f64::from(PIE_RESOLUTION);
    for ix in -PIE_RESOLUTION..=PIE_RESOLUTION {
        for iy in -PIE_RESOLUTION..=PIE_RESOLUTION {
            let (x, y) = (f64::from(ix) / n, f64::from(iy) / n);
            if x * x + y * y > 1.0 {
                continue;
            }
            let angle = y.atan2(x).to_degrees();
            if let Some(i) = chart.slice_at(angle) {
                buckets[i].push((x, y));
            }
        }
    }
    buckets
}

fn draw_pie(f: &mut ratatui::Frame, chart: &PieChart, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(format!(" {} ", chart.title));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(inner);

    if chart.total() == 0 {
        f.render_widget(
            Paragraph::new("No changes in range").style(Style::default().fg(Color::DarkGray)),
            cols[0],
        );
    } else {
        let buckets = pie_points(chart);
        let canvas = Canvas::default()
            .marker(Marker::Braille)
            .x_bounds([-1.1, 1.1])
            .y_bounds([-1.1, 1.1])
            .paint(|ctx| {
                for (slice, coords) in chart.slices.iter().zip(buckets.iter()) {
                    ctx.draw(&Points {
                        coords,
                        color: category_color(slice.category),
                    });
                }
            });
        f.render_widget(canvas, cols[0]);
    }

    let rows: Vec<Row> = chart
        .slices
        .iter()
        .map(|s| {
            let style = Style::default().fg(category_color(s.category));
            Row::new(vec![
                ratatui::widgets::Cell::from(Span::styled(format!("{:<9}", s.label), style)),
                ratatui::widgets::Cell::from(format!("{:>4}", s.count)),
                ratatui::widgets::Cell::from(s.percent_label.clone()),
            ])
        })
        .collect();
    let legend = Table::new(
        rows,
        [Constraint::Length(10), Constraint::Length(5), Constraint::Min(6)],
    );
    f.render_widget(legend, cols[1]);
}
