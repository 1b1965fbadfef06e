use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("data file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required column: {0}")]
    MissingColumn(&'static str),
    #[error("row {row}: unparseable date {value:?}")]
    InvalidDate { row: usize, value: String },
    #[error("row {row}: column {column} has non-numeric value {value:?}")]
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("data file has no rows")]
    EmptyTable,
    #[error("{field} {date} is outside the data range {min}..={max}")]
    OutOfRange {
        field: &'static str,
        date: NaiveDate,
        min: NaiveDate,
        max: NaiveDate,
    },
    #[error("invalid settings: {0}")]
    Config(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FileNotFound,
    Parse,
    Range,
    Config,
    Io,
}

impl ReportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReportError::FileNotFound(_) => ErrorKind::FileNotFound,
            ReportError::Io(_) => ErrorKind::Io,
            ReportError::Csv(e) if e.is_io_error() => ErrorKind::Io,
            ReportError::Csv(_)
            | ReportError::MissingColumn(_)
            | ReportError::InvalidDate { .. }
            | ReportError::InvalidNumber { .. }
            | ReportError::EmptyTable => ErrorKind::Parse,
            ReportError::OutOfRange { .. } => ErrorKind::Range,
            ReportError::Config(_) => ErrorKind::Config,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
