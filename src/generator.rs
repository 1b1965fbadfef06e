use std::path::Path;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::types::PriceRow;

pub const DEFAULT_START: (i32, u32, u32) = (2021, 11, 1);
const BASE_PRICE: f64 = 80.0;
const BASE_VOLUME: f64 = 12_000_000.0;

/// Synthetic daily bars: a random walk on close with occasional gap days.
pub struct PriceGenerator {
    rng: StdRng,
    close: f64,
    date: NaiveDate,
    /// Probability of a gap day (3-8% move, 2-4x volume).
    pub shock_rate: f64,
}

impl PriceGenerator {
    pub fn new(seed: u64, start: NaiveDate) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            close: BASE_PRICE,
            date: start,
            shock_rate: 0.05,
        }
    }

    pub fn default_start() -> NaiveDate {
        let (y, m, d) = DEFAULT_START;
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
    }

    /// Next business day's bar.
    pub fn next_row(&mut self) -> PriceRow {
        while matches!(self.date.weekday(), Weekday::Sat | Weekday::Sun) {
            self.advance();
        }
        let date = self.date;
        self.advance();

        let shock = self.rng.gen_bool(self.shock_rate.clamp(0.0, 1.0));
        let drift = if shock {
            let size = self.rng.gen_range(0.03..0.08);
            if self.rng.gen_bool(0.5) { size } else { -size }
        } else {
            self.rng.gen_range(-0.02..0.02)
        };

        let open = self.close * (1.0 + self.rng.gen_range(-0.01..0.01));
        let close = (self.close * (1.0 + drift)).max(0.01);
        let high = open.max(close) * (1.0 + self.rng.gen_range(0.0..0.015));
        let low = open.min(close) * (1.0 - self.rng.gen_range(0.0..0.015));
        let mut volume = BASE_VOLUME * self.rng.gen_range(0.5..1.5);
        if shock {
            volume *= self.rng.gen_range(2.0..4.0);
        }
        self.close = close;

        PriceRow {
            date,
            open: round2(open),
            high: round2(high),
            low: round2(low),
            close: round2(close),
            volume: volume.round(),
        }
    }

    pub fn generate(&mut self, days: usize) -> Vec<PriceRow> {
        (0..days).map(|_| self.next_row()).collect()
    }

    fn advance(&mut self) {
        self.date = self.date.checked_add_days(Days::new(1)).unwrap_or(self.date);
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Write rows in the loader's CSV layout.
pub fn write_csv(path: impl AsRef<Path>, rows: &[PriceRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["Date", "Open", "High", "Low", "Close", "Volume"])?;
    for r in rows {
        wtr.write_record([
            r.date.format("%Y-%m-%d").to_string(),
            r.open.to_string(),
            r.high.to_string(),
            r.low.to_string(),
            r.close.to_string(),
            r.volume.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
