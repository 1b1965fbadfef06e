use chrono::NaiveDate;

use crate::config::Thresholds;
use crate::types::{ChangeCategory, ChangeDistribution, ChangeRecord, PriceRow, PriceTable};

/// Trailing mean of Close, aligned to the table.
///
/// The first `window - 1` entries are `None`; a window containing a NaN close
/// yields NaN. A window of 0 or larger than the table yields all `None`.
pub fn moving_average(table: &PriceTable, window: usize) -> Vec<Option<f64>> {
    rolling_mean(&table.closes(), window)
}

pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 || window > values.len() {
        return out;
    }
    let n = window as f64;
    for (i, w) in values.windows(window).enumerate() {
        out[i + window - 1] = Some(w.iter().sum::<f64>() / n);
    }
    out
}

/// Percentage change between consecutive closes.
pub fn pct_change(prev: f64, current: f64) -> f64 {
    (current - prev) / prev * 100.0
}

pub fn classify(pct: f64, thresholds: Thresholds) -> Option<ChangeCategory> {
    if pct.is_nan() {
        None
    } else if pct < thresholds.negative {
        Some(ChangeCategory::Negative)
    } else if pct > thresholds.positive {
        Some(ChangeCategory::Positive)
    } else {
        Some(ChangeCategory::Neutral)
    }
}

/// Per-day change records for `[start, end]`. The first row has no prior close.
pub fn change_records(
    table: &PriceTable,
    start: NaiveDate,
    end: NaiveDate,
    thresholds: Thresholds,
) -> Vec<ChangeRecord> {
    records_for(table.slice(start, end), thresholds)
}

fn records_for(rows: &[PriceRow], thresholds: Thresholds) -> Vec<ChangeRecord> {
    let mut records = Vec::with_capacity(rows.len());
    let mut prev: Option<f64> = None;
    for row in rows {
        let pct = prev.map(|p| pct_change(p, row.close));
        records.push(ChangeRecord {
            date: row.date,
            pct_change: pct,
            category: pct.and_then(|p| classify(p, thresholds)),
        });
        prev = Some(row.close);
    }
    records
}

/// Category counts for `[start, end]`. Undefined and NaN changes are not counted.
pub fn change_distribution(
    table: &PriceTable,
    start: NaiveDate,
    end: NaiveDate,
    thresholds: Thresholds,
) -> ChangeDistribution {
    let mut dist = ChangeDistribution::default();
    for category in change_records(table, start, end, thresholds)
        .iter()
        .filter_map(|r| r.category)
    {
        dist.record(category);
    }
    dist
}
