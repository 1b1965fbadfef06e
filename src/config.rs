use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Args;

use crate::error::{ReportError, Result};

pub const DEFAULT_MA_WINDOW: usize = 20;
pub const DEFAULT_NEGATIVE_THRESHOLD: f64 = -0.5;
pub const DEFAULT_POSITIVE_THRESHOLD: f64 = 0.5;

/// Inputs shared by every render pass, whichever surface drives it.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Daily price CSV with Date, Open, High, Low, Close, Volume columns
    #[arg(long = "data", default_value = "RBLX.csv")]
    pub data_path: PathBuf,

    /// Trailing moving average window, in rows
    #[arg(long, default_value_t = DEFAULT_MA_WINDOW)]
    pub ma_window: usize,

    /// First day of the change distribution range
    #[arg(long, default_value = "2022-01-01")]
    pub analysis_start: NaiveDate,

    /// Last day of the change distribution range
    #[arg(long, default_value = "2022-01-31")]
    pub analysis_end: NaiveDate,

    /// Changes below this percentage are Negative
    #[arg(long, default_value_t = DEFAULT_NEGATIVE_THRESHOLD, allow_hyphen_values = true)]
    pub negative_threshold: f64,

    /// Changes above this percentage are Positive
    #[arg(long, default_value_t = DEFAULT_POSITIVE_THRESHOLD, allow_hyphen_values = true)]
    pub positive_threshold: f64,
}

impl Settings {
    pub fn with_data(path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: path.into(),
            ..Self::default()
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            negative: self.negative_threshold,
            positive: self.positive_threshold,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ma_window == 0 {
            return Err(ReportError::Config("ma_window must be at least 1".into()));
        }
        let t = self.thresholds();
        if !(t.negative.is_finite() && t.positive.is_finite()) || t.negative > t.positive {
            return Err(ReportError::Config(format!(
                "thresholds must be finite with negative <= positive, got {} and {}",
                t.negative, t.positive
            )));
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("RBLX.csv"),
            ma_window: DEFAULT_MA_WINDOW,
            analysis_start: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or_default(),
            analysis_end: NaiveDate::from_ymd_opt(2022, 1, 31).unwrap_or_default(),
            negative_threshold: DEFAULT_NEGATIVE_THRESHOLD,
            positive_threshold: DEFAULT_POSITIVE_THRESHOLD,
        }
    }
}

/// Percentage-change bucket bounds. Both bounds belong to Neutral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub negative: f64,
    pub positive: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            negative: DEFAULT_NEGATIVE_THRESHOLD,
            positive: DEFAULT_POSITIVE_THRESHOLD,
        }
    }
}
