//! SVG rendering of chart values for the web page and headless output.

use std::fmt::Write;

use chrono::{Datelike, NaiveDate};

use crate::charts::{BarChart, Chart, LineChart, PieChart};

pub const WIDTH: f64 = 960.0;
pub const HEIGHT: f64 = 440.0;
pub const PIE_SIZE: f64 = 480.0;

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 24.0;
const MARGIN_TOP: f64 = 44.0;
const MARGIN_BOTTOM: f64 = 64.0;

// matplotlib's default color cycle
const PALETTE: [&str; 4] = ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728"];

pub fn render(chart: &Chart) -> String {
    match chart {
        Chart::Line(c) => line_chart(c),
        Chart::Bar(c) => bar_chart(c),
        Chart::Pie(c) => pie_chart(c),
    }
}

/// Plot area and the data-to-pixel mapping of one chart.
struct Frame {
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
    days: (f64, f64),
    values: (f64, f64),
}

impl Frame {
    fn new(days: (f64, f64), values: (f64, f64)) -> Self {
        Self {
            x0: MARGIN_LEFT,
            x1: WIDTH - MARGIN_RIGHT,
            y0: MARGIN_TOP,
            y1: HEIGHT - MARGIN_BOTTOM,
            days,
            values,
        }
    }

    fn x(&self, date: NaiveDate) -> f64 {
        let d = day_number(date);
        self.x0 + (d - self.days.0) / (self.days.1 - self.days.0) * (self.x1 - self.x0)
    }

    fn y(&self, v: f64) -> f64 {
        self.y1 - (v - self.values.0) / (self.values.1 - self.values.0) * (self.y1 - self.y0)
    }
}

pub fn line_chart(chart: &LineChart) -> String {
    let mut out = open_svg(WIDTH, HEIGHT, &chart.title);
    let (Some((first, last)), Some((lo, hi))) = (chart.date_range(), chart.value_range()) else {
        no_data(&mut out, WIDTH, HEIGHT);
        return close_svg(out);
    };

    let ticks = nice_ticks(lo, hi, 5);
    let values = (ticks[0], ticks[ticks.len() - 1]);
    let frame = Frame::new(padded_days(first, last), values);

    draw_y_axis(&mut out, &frame, &ticks, chart.grid);
    draw_x_axis(&mut out, &frame, first, last, chart.grid);
    axis_labels(&mut out, &frame, &chart.x_label, &chart.y_label);

    for (i, series) in chart.series.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let mut path = String::new();
        let mut pen_down = false;
        for (date, value) in &series.points {
            match value.filter(|v| v.is_finite()) {
                Some(v) => {
                    let cmd = if pen_down { 'L' } else { 'M' };
                    let _ = write!(path, "{cmd}{:.1},{:.1} ", frame.x(*date), frame.y(v));
                    pen_down = true;
                }
                None => pen_down = false,
            }
        }
        let _ = writeln!(
            out,
            r#"<path d="{}" fill="none" stroke="{color}" stroke-width="1.5"/>"#,
            path.trim_end()
        );
        if series.markers {
            for (date, v) in series.defined() {
                let _ = writeln!(
                    out,
                    r#"<circle cx="{:.1}" cy="{:.1}" r="3" fill="{color}"/>"#,
                    frame.x(date),
                    frame.y(v)
                );
            }
        }
    }

    if chart.legend {
        let labels: Vec<(&str, &str)> = chart
            .series
            .iter()
            .enumerate()
            .map(|(i, s)| (s.label.as_str(), PALETTE[i % PALETTE.len()]))
            .collect();
        legend(&mut out, &frame, &labels);
    }
    close_svg(out)
}

pub fn bar_chart(chart: &BarChart) -> String {
    let mut out = open_svg(WIDTH, HEIGHT, &chart.title);
    let (Some((first, last)), Some(max)) = (chart.date_range(), chart.max_value()) else {
        no_data(&mut out, WIDTH, HEIGHT);
        return close_svg(out);
    };

    let ticks = nice_ticks(0.0, max.max(0.0), 5);
    let frame = Frame::new(padded_days(first, last), (ticks[0], ticks[ticks.len() - 1]));
    draw_y_axis(&mut out, &frame, &ticks, false);
    draw_x_axis(&mut out, &frame, first, last, false);
    axis_labels(&mut out, &frame, "Date", &chart.label);

    let span_days = frame.days.1 - frame.days.0;
    let bar_width = ((frame.x1 - frame.x0) / span_days * 0.8).max(1.0);
    for (date, v) in chart.bars.iter().filter(|(_, v)| v.is_finite()) {
        let top = frame.y(v.max(0.0));
        let _ = writeln!(
            out,
            r#"<rect x="{:.1}" y="{top:.1}" width="{bar_width:.1}" height="{:.1}" fill="{}"/>"#,
            frame.x(*date) - bar_width / 2.0,
            frame.y1 - top,
            PALETTE[0]
        );
    }
    close_svg(out)
}

pub fn pie_chart(chart: &PieChart) -> String {
    let mut out = open_svg(PIE_SIZE, PIE_SIZE, &chart.title);
    let wedges = chart.wedges();
    if wedges.is_empty() {
        no_data(&mut out, PIE_SIZE, PIE_SIZE);
        return close_svg(out);
    }

    let (cx, cy, r) = (PIE_SIZE / 2.0, PIE_SIZE / 2.0 + 16.0, PIE_SIZE * 0.32);
    let point = |deg: f64, radius: f64| {
        let rad = deg.to_radians();
        (cx + radius * rad.cos(), cy - radius * rad.sin())
    };

    for &(i, a0, a1) in &wedges {
        let slice = &chart.slices[i];
        if a1 - a0 >= 359.999 {
            let _ = writeln!(
                out,
                r#"<circle cx="{cx:.1}" cy="{cy:.1}" r="{r:.1}" fill="{}"/>"#,
                slice.color
            );
        } else {
            let (sx, sy) = point(a0, r);
            let (ex, ey) = point(a1, r);
            let large = if a1 - a0 > 180.0 { 1 } else { 0 };
            let _ = writeln!(
                out,
                r#"<path d="M{cx:.1},{cy:.1} L{sx:.1},{sy:.1} A{r:.1},{r:.1} 0 {large} 0 {ex:.1},{ey:.1} Z" fill="{}"/>"#,
                slice.color
            );
        }
        let mid = (a0 + a1) / 2.0;
        let (lx, ly) = point(mid, r * 1.15);
        let (px, py) = point(mid, r * 0.6);
        let anchor = if lx < cx { "end" } else { "start" };
        let _ = writeln!(
            out,
            r#"<text x="{lx:.1}" y="{ly:.1}" text-anchor="{anchor}" font-size="14">{}</text>"#,
            escape(&slice.label)
        );
        let _ = writeln!(
            out,
            r#"<text x="{px:.1}" y="{py:.1}" text-anchor="middle" font-size="13" fill="white">{}</text>"#,
            escape(&slice.percent_label)
        );
    }
    close_svg(out)
}

fn open_svg(width: f64, height: f64, title: &str) -> String {
    let mut out = String::with_capacity(8 * 1024);
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" font-family="sans-serif">"#
    );
    let _ = writeln!(out, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        out,
        r#"<text x="{:.1}" y="26" text-anchor="middle" font-size="18">{}</text>"#,
        width / 2.0,
        escape(title)
    );
    out
}

fn close_svg(mut out: String) -> String {
    out.push_str("</svg>\n");
    out
}

fn no_data(out: &mut String, width: f64, height: f64) {
    let _ = writeln!(
        out,
        r##"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="14" fill="#888">No data in range</text>"##,
        width / 2.0,
        height / 2.0
    );
}

fn draw_y_axis(out: &mut String, frame: &Frame, ticks: &[f64], grid: bool) {
    let step = if ticks.len() > 1 { ticks[1] - ticks[0] } else { 1.0 };
    let _ = writeln!(
        out,
        r#"<line x1="{0:.1}" y1="{1:.1}" x2="{0:.1}" y2="{2:.1}" stroke="black"/>"#,
        frame.x0, frame.y0, frame.y1
    );
    for &t in ticks {
        let y = frame.y(t);
        if grid {
            let _ = writeln!(
                out,
                r##"<line x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="#ddd"/>"##,
                frame.x0, frame.x1
            );
        }
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end" font-size="11">{}</text>"#,
            frame.x0 - 6.0,
            y + 4.0,
            format_tick(t, step)
        );
    }
}

fn draw_x_axis(out: &mut String, frame: &Frame, first: NaiveDate, last: NaiveDate, grid: bool) {
    let _ = writeln!(
        out,
        r#"<line x1="{0:.1}" y1="{1:.1}" x2="{2:.1}" y2="{1:.1}" stroke="black"/>"#,
        frame.x0, frame.y1, frame.x1
    );
    for date in date_ticks(first, last, 6) {
        let x = frame.x(date);
        if grid {
            let _ = writeln!(
                out,
                r##"<line x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{:.1}" stroke="#ddd"/>"##,
                frame.y0, frame.y1
            );
        }
        let _ = writeln!(
            out,
            r#"<text x="{x:.1}" y="{:.1}" text-anchor="middle" font-size="11">{}</text>"#,
            frame.y1 + 18.0,
            date.format("%Y-%m-%d")
        );
    }
}

fn axis_labels(out: &mut String, frame: &Frame, x_label: &str, y_label: &str) {
    let _ = writeln!(
        out,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="13">{}</text>"#,
        (frame.x0 + frame.x1) / 2.0,
        HEIGHT - 16.0,
        escape(x_label)
    );
    let my = (frame.y0 + frame.y1) / 2.0;
    let _ = writeln!(
        out,
        r#"<text x="18" y="{my:.1}" text-anchor="middle" font-size="13" transform="rotate(-90 18 {my:.1})">{}</text>"#,
        escape(y_label)
    );
}

fn legend(out: &mut String, frame: &Frame, labels: &[(&str, &str)]) {
    let x = frame.x1 - 150.0;
    let y = frame.y0 + 8.0;
    let _ = writeln!(
        out,
        r##"<rect x="{x:.1}" y="{y:.1}" width="142" height="{:.1}" fill="white" stroke="#ccc"/>"##,
        labels.len() as f64 * 18.0 + 8.0
    );
    for (i, (label, color)) in labels.iter().enumerate() {
        let ly = y + 16.0 + i as f64 * 18.0;
        let _ = writeln!(
            out,
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{color}" stroke-width="2"/>"#,
            x + 8.0,
            ly - 4.0,
            x + 28.0,
            ly - 4.0
        );
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="{ly:.1}" font-size="12">{}</text>"#,
            x + 34.0,
            escape(label)
        );
    }
}

fn day_number(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}

fn padded_days(first: NaiveDate, last: NaiveDate) -> (f64, f64) {
    let (a, b) = (day_number(first), day_number(last));
    if b > a {
        (a, b)
    } else {
        (a - 1.0, b + 1.0)
    }
}

/// Up to `count` evenly spaced dates from `first` to `last`, both included.
pub fn date_ticks(first: NaiveDate, last: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let span = (last - first).num_days();
    if span <= 0 || count < 2 {
        return vec![first];
    }
    let steps = (count as i64 - 1).min(span);
    let mut out: Vec<NaiveDate> = (0..=steps)
        .filter_map(|i| first.checked_add_signed(chrono::Duration::days(span * i / steps)))
        .collect();
    out.dedup();
    out
}

/// Round tick values covering `[lo, hi]`, always at least two.
pub fn nice_ticks(lo: f64, hi: f64, target: usize) -> Vec<f64> {
    let (lo, hi) = if hi > lo {
        (lo, hi)
    } else {
        let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.05 };
        (lo - pad, hi + pad)
    };
    let step = nice_step((hi - lo) / target.max(1) as f64);
    let start = (lo / step).floor() * step;
    let end = (hi / step).ceil() * step;
    let n = ((end - start) / step).round() as usize;
    (0..=n.max(1)).map(|i| start + i as f64 * step).collect()
}

fn nice_step(raw: f64) -> f64 {
    let exp = raw.log10().floor();
    let base = 10f64.powf(exp);
    let frac = raw / base;
    let nice = if frac <= 1.0 {
        1.0
    } else if frac <= 2.0 {
        2.0
    } else if frac <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * base
}

fn format_tick(v: f64, step: f64) -> String {
    let abs = v.abs();
    if abs >= 1e9 {
        format!("{:.1}B", v / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", v / 1e6)
    } else if step >= 1.0 {
        format!("{v:.0}")
    } else {
        let decimals = (-step.log10().floor()).max(0.0) as usize;
        format!("{v:.decimals$}")
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
