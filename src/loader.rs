use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use crate::error::{ReportError, Result};
use crate::types::{PriceRow, PriceTable};

const REQUIRED_COLUMNS: [&str; 6] = ["Date", "Open", "High", "Low", "Close", "Volume"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Positions of the required columns within a header row.
struct ColumnIndex {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or(ReportError::MissingColumn(name))
        };
        let [date, open, high, low, close, volume] = REQUIRED_COLUMNS;
        Ok(Self {
            date: find(date)?,
            open: find(open)?,
            high: find(high)?,
            low: find(low)?,
            close: find(close)?,
            volume: find(volume)?,
        })
    }
}

/// Read a daily price CSV and return its rows sorted by date.
pub fn load_table(path: impl AsRef<Path>) -> Result<PriceTable> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(ReportError::FileNotFound(path.to_path_buf()));
    }
    let file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ReportError::FileNotFound(path.to_path_buf()),
        _ => ReportError::Io(e),
    })?;
    let table = read_table(file)?;
    debug!(path = %path.display(), rows = table.len(), "loaded price table");
    Ok(table)
}

/// Parse CSV text from any reader. The header row is required.
pub fn read_table<R: Read>(reader: R) -> Result<PriceTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = ColumnIndex::from_headers(rdr.headers()?)?;

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        // 1-based, counting the header line
        let line = i + 2;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        rows.push(parse_row(&record, &columns, line)?);
    }

    if rows.is_empty() {
        return Err(ReportError::EmptyTable);
    }
    Ok(PriceTable::from_rows(rows))
}

fn parse_row(record: &StringRecord, columns: &ColumnIndex, row: usize) -> Result<PriceRow> {
    let raw_date = record.get(columns.date).unwrap_or("");
    let date = parse_date(raw_date).ok_or_else(|| ReportError::InvalidDate {
        row,
        value: raw_date.to_string(),
    })?;
    let number = |idx: usize, column: &'static str| {
        let raw = record.get(idx).unwrap_or("");
        parse_number(raw).ok_or_else(|| ReportError::InvalidNumber {
            row,
            column,
            value: raw.to_string(),
        })
    };
    Ok(PriceRow {
        date,
        open: number(columns.open, "Open")?,
        high: number(columns.high, "High")?,
        low: number(columns.low, "Low")?,
        close: number(columns.close, "Close")?,
        volume: number(columns.volume, "Volume")?,
    })
}

/// Accepts plain dates and datetimes; a datetime keeps only its calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Missing-value markers read as NaN, anything else must be a float.
fn parse_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") || raw.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    raw.parse::<f64>().ok()
}
