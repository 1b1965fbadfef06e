use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ── Loaded rows ──

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Daily rows ordered by date ascending. Duplicate dates are kept in file order.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    rows: Vec<PriceRow>,
}

impl PriceTable {
    pub fn from_rows(mut rows: Vec<PriceRow>) -> Self {
        // stable: duplicates keep their source order
        rows.sort_by_key(|r| r.date);
        Self { rows }
    }

    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn bounds(&self) -> Option<DateBounds> {
        let first = self.rows.first()?;
        let last = self.rows.last()?;
        Some(DateBounds { min: first.date, max: last.date })
    }

    /// Rows with `start <= date <= end`. Empty when `start > end`.
    pub fn slice(&self, start: NaiveDate, end: NaiveDate) -> &[PriceRow] {
        if start > end {
            return &[];
        }
        let lo = self.rows.partition_point(|r| r.date < start);
        let hi = self.rows.partition_point(|r| r.date <= end);
        &self.rows[lo..hi]
    }

    pub fn closes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.close).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateBounds {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

impl DateBounds {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.min <= date && date <= self.max
    }

    pub fn clamp(&self, date: NaiveDate) -> NaiveDate {
        date.clamp(self.min, self.max)
    }
}

// ── View parameters ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PlotKind {
    #[default]
    Line,
    Candlestick,
}

impl PlotKind {
    pub const ALL: [PlotKind; 2] = [PlotKind::Line, PlotKind::Candlestick];

    pub fn label(&self) -> &'static str {
        match self {
            PlotKind::Line => "line",
            PlotKind::Candlestick => "candlestick",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            PlotKind::Line => PlotKind::Candlestick,
            PlotKind::Candlestick => PlotKind::Line,
        }
    }
}

// ── Derived series ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChangeCategory {
    Negative,
    Neutral,
    Positive,
}

impl ChangeCategory {
    pub const ALL: [ChangeCategory; 3] = [
        ChangeCategory::Negative,
        ChangeCategory::Neutral,
        ChangeCategory::Positive,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ChangeCategory::Negative => "Negative",
            ChangeCategory::Neutral => "Neutral",
            ChangeCategory::Positive => "Positive",
        }
    }

    /// Fixed pie color for the category.
    pub fn color(&self) -> &'static str {
        match self {
            ChangeCategory::Negative => "red",
            ChangeCategory::Neutral => "gray",
            ChangeCategory::Positive => "green",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRecord {
    pub date: NaiveDate,
    pub pct_change: Option<f64>,
    pub category: Option<ChangeCategory>,
}

/// Counts per change category, always reported in `ChangeCategory::ALL` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ChangeDistribution {
    pub negative: u64,
    pub neutral: u64,
    pub positive: u64,
}

impl ChangeDistribution {
    pub fn count(&self, category: ChangeCategory) -> u64 {
        match category {
            ChangeCategory::Negative => self.negative,
            ChangeCategory::Neutral => self.neutral,
            ChangeCategory::Positive => self.positive,
        }
    }

    pub fn record(&mut self, category: ChangeCategory) {
        match category {
            ChangeCategory::Negative => self.negative += 1,
            ChangeCategory::Neutral => self.neutral += 1,
            ChangeCategory::Positive => self.positive += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.negative + self.neutral + self.positive
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChangeCategory, u64)> + '_ {
        ChangeCategory::ALL.into_iter().map(|c| (c, self.count(c)))
    }
}
