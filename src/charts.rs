//! Chart emitters.
//!
//! Each emitter maps a slice of the table (or a derived series) to a
//! self-contained chart value. Surfaces (web SVG, terminal) draw these values
//! and never look at the table themselves.

use chrono::NaiveDate;
use serde::Serialize;

use crate::types::{ChangeCategory, ChangeDistribution, PlotKind, PriceRow, PriceTable};

pub const PIE_START_ANGLE_DEG: f64 = 140.0;

#[derive(Debug, Clone, Serialize)]
pub struct Series {
    pub label: String,
    pub points: Vec<(NaiveDate, Option<f64>)>,
    pub markers: bool,
}

impl Series {
    fn from_rows(label: &str, rows: &[PriceRow], markers: bool, value: fn(&PriceRow) -> f64) -> Self {
        Self {
            label: label.to_string(),
            points: rows.iter().map(|r| (r.date, Some(value(r)))).collect(),
            markers,
        }
    }

    /// Points with a finite value.
    pub fn defined(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.points
            .iter()
            .filter_map(|(d, v)| v.filter(|v| v.is_finite()).map(|v| (*d, v)))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
    pub legend: bool,
    pub grid: bool,
}

impl LineChart {
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.defined().next().is_none())
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let dates = self.series.iter().flat_map(|s| s.points.iter().map(|(d, _)| *d));
        min_max(dates)
    }

    pub fn value_range(&self) -> Option<(f64, f64)> {
        let values = self.series.iter().flat_map(|s| s.defined().map(|(_, v)| v));
        min_max_f64(values)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BarChart {
    pub title: String,
    pub label: String,
    pub bars: Vec<(NaiveDate, f64)>,
}

impl BarChart {
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        min_max(self.bars.iter().map(|(d, _)| *d))
    }

    pub fn max_value(&self) -> Option<f64> {
        self.bars
            .iter()
            .map(|(_, v)| *v)
            .filter(|v| v.is_finite())
            .reduce(f64::max)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PieSlice {
    pub category: ChangeCategory,
    pub label: String,
    pub count: u64,
    pub color: String,
    /// Share of the total, 0..=100.
    pub percent: f64,
    /// Formatted with one decimal, e.g. `"33.3%"`.
    pub percent_label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PieChart {
    pub title: String,
    /// Counter-clockwise from the positive x-axis.
    pub start_angle_deg: f64,
    pub slices: Vec<PieSlice>,
}

impl PieChart {
    pub fn total(&self) -> u64 {
        self.slices.iter().map(|s| s.count).sum()
    }

    /// Wedges as `(slice index, start°, end°)`, counter-clockwise, skipping
    /// empty slices. Angles are not normalized and may exceed 360.
    pub fn wedges(&self) -> Vec<(usize, f64, f64)> {
        let total = self.total();
        if total == 0 {
            return Vec::new();
        }
        let mut angle = self.start_angle_deg;
        let mut out = Vec::new();
        for (i, slice) in self.slices.iter().enumerate() {
            if slice.count == 0 {
                continue;
            }
            let sweep = slice.count as f64 / total as f64 * 360.0;
            out.push((i, angle, angle + sweep));
            angle += sweep;
        }
        out
    }

    /// Slice covering the direction `angle_deg` (counter-clockwise from +x).
    pub fn slice_at(&self, angle_deg: f64) -> Option<usize> {
        let wedges = self.wedges();
        let rel = (angle_deg - self.start_angle_deg).rem_euclid(360.0);
        wedges
            .iter()
            .find(|(_, start, end)| {
                let a = start - self.start_angle_deg;
                let b = end - self.start_angle_deg;
                rel >= a && rel < b
            })
            .or(wedges.last())
            .map(|(i, _, _)| *i)
    }
}

/// Every chart a render pass emits, in page order.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Chart {
    Line(LineChart),
    Bar(BarChart),
    Pie(PieChart),
}

impl Chart {
    pub fn title(&self) -> &str {
        match self {
            Chart::Line(c) => &c.title,
            Chart::Bar(c) => &c.title,
            Chart::Pie(c) => &c.title,
        }
    }
}

/// Close over the selected range, or the four OHLC lines in candlestick mode.
pub fn price_chart(slice: &[PriceRow], kind: PlotKind) -> LineChart {
    match kind {
        PlotKind::Line => LineChart {
            title: "Closing Price Over Time".into(),
            x_label: "Date".into(),
            y_label: "Price".into(),
            series: vec![Series::from_rows("Closing Price", slice, true, |r| r.close)],
            legend: true,
            grid: false,
        },
        // Four overlaid lines rather than OHLC glyphs.
        PlotKind::Candlestick => LineChart {
            title: "Candlestick Chart".into(),
            x_label: "Date".into(),
            y_label: "Price".into(),
            series: vec![
                Series::from_rows("Closing Price", slice, true, |r| r.close),
                Series::from_rows("Opening Price", slice, true, |r| r.open),
                Series::from_rows("High Price", slice, true, |r| r.high),
                Series::from_rows("Low Price", slice, true, |r| r.low),
            ],
            legend: true,
            grid: true,
        },
    }
}

pub fn volume_bars(table: &PriceTable) -> BarChart {
    BarChart {
        title: "Volume Over Time".into(),
        label: "Volume".into(),
        bars: table.rows().iter().map(|r| (r.date, r.volume)).collect(),
    }
}

pub fn price_with_ma(table: &PriceTable, moving_average: &[Option<f64>], window: usize) -> LineChart {
    let close = Series::from_rows("Close", table.rows(), false, |r| r.close);
    let ma = Series {
        label: format!("{window}-day Moving Avg"),
        points: table
            .rows()
            .iter()
            .zip(moving_average.iter())
            .map(|(r, v)| (r.date, *v))
            .collect(),
        markers: false,
    };
    LineChart {
        title: format!("Closing Price with {window}-day Moving Average"),
        x_label: "Date".into(),
        y_label: "Price".into(),
        series: vec![close, ma],
        legend: true,
        grid: false,
    }
}

pub fn change_pie(distribution: &ChangeDistribution) -> PieChart {
    let total = distribution.total();
    let slices = distribution
        .iter()
        .map(|(category, count)| {
            let percent = if total == 0 {
                0.0
            } else {
                count as f64 / total as f64 * 100.0
            };
            PieSlice {
                category,
                label: category.label().to_string(),
                count,
                color: category.color().to_string(),
                percent,
                percent_label: format!("{percent:.1}%"),
            }
        })
        .collect();
    PieChart {
        title: "Distribution of Closing Price Changes".into(),
        start_angle_deg: PIE_START_ANGLE_DEG,
        slices,
    }
}

fn min_max(dates: impl Iterator<Item = NaiveDate>) -> Option<(NaiveDate, NaiveDate)> {
    dates.fold(None, |acc, d| match acc {
        None => Some((d, d)),
        Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
    })
}

fn min_max_f64(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
