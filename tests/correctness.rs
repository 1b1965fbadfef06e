//! Correctness tests for loading, derived series, view selection and the
//! chart emitters.
//!
//! Writes small deterministic CSV files, runs full render passes, and asserts
//! exact values.

use std::io::Write;

use chrono::NaiveDate;
use tempfile::NamedTempFile;

use price_dashboard::analytics;
use price_dashboard::charts;
use price_dashboard::config::{Settings, Thresholds};
use price_dashboard::error::{ErrorKind, ReportError};
use price_dashboard::loader;
use price_dashboard::report::ReportRenderer;
use price_dashboard::types::*;
use price_dashboard::view::{Field, ViewParams, ViewQuery, Widgets};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn csv_file(contents: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f.flush().unwrap();
    f
}

/// `n` consecutive calendar days from 2022-01-01 with close = 100 + i.
fn linear_table(n: usize) -> PriceTable {
    let rows = (0..n)
        .map(|i| {
            let close = 100.0 + i as f64;
            PriceRow {
                date: d(2022, 1, 1) + chrono::Duration::days(i as i64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000.0 + i as f64,
            }
        })
        .collect();
    PriceTable::from_rows(rows)
}

fn table_with_closes(closes: &[f64]) -> PriceTable {
    let rows = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceRow {
            date: d(2022, 1, 3) + chrono::Duration::days(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 10.0,
        })
        .collect();
    PriceTable::from_rows(rows)
}

// ── Test 1: Loader ──
// Header matching ignores case/order/extra columns; rows come back sorted.
#[test]
fn test_load_sorts_and_ignores_extra_columns() {
    let f = csv_file(
        "date,Adj Close,close,open,high,low,volume\n\
         2022-01-05,1,103,100,104,99,3000\n\
         2022-01-03,1,100,99,101,98,1000\n\
         2022-01-04,1,102,100,103,99,2000\n",
    );
    let table = loader::load_table(f.path()).unwrap();

    assert_eq!(table.len(), 3);
    let dates: Vec<_> = table.rows().iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![d(2022, 1, 3), d(2022, 1, 4), d(2022, 1, 5)]);

    let first = &table.rows()[0];
    assert_eq!(first.open, 99.0);
    assert_eq!(first.high, 101.0);
    assert_eq!(first.low, 98.0);
    assert_eq!(first.close, 100.0);
    assert_eq!(first.volume, 1000.0);
}

#[test]
fn test_load_accepts_datetime_and_slash_dates() {
    let f = csv_file(
        "Date,Open,High,Low,Close,Volume\n\
         2022-01-03 00:00:00,1,1,1,1,1\n\
         01/04/2022,2,2,2,2,2\n\
         2022/01/05,3,3,3,3,3\n\
         2022-01-06T00:00:00Z,4,4,4,4,4\n",
    );
    let table = loader::load_table(f.path()).unwrap();
    let dates: Vec<_> = table.rows().iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![d(2022, 1, 3), d(2022, 1, 4), d(2022, 1, 5), d(2022, 1, 6)]);
}

#[test]
fn test_load_keeps_duplicate_dates_in_file_order() {
    let f = csv_file(
        "Date,Open,High,Low,Close,Volume\n\
         2022-01-04,1,1,1,7,1\n\
         2022-01-03,1,1,1,5,1\n\
         2022-01-04,1,1,1,8,1\n",
    );
    let table = loader::load_table(f.path()).unwrap();
    let closes = table.closes();
    assert_eq!(closes, vec![5.0, 7.0, 8.0]);
}

#[test]
fn test_load_null_cells_read_as_nan() {
    let f = csv_file(
        "Date,Open,High,Low,Close,Volume\n\
         2022-01-03,null,1,1,1,\n",
    );
    let table = loader::load_table(f.path()).unwrap();
    assert!(table.rows()[0].open.is_nan());
    assert!(table.rows()[0].volume.is_nan());
}

// ── Test 2: Loader failures ──
// Missing Close column is a parse error, raised before any chart exists.
#[test]
fn test_missing_close_column_is_parse_error() {
    let f = csv_file(
        "Date,Open,High,Low,Volume\n\
         2022-01-03,1,1,1,1\n",
    );
    let err = loader::load_table(f.path()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(matches!(err, ReportError::MissingColumn("Close")), "got {err:?}");

    let renderer = ReportRenderer::new(Settings::with_data(f.path())).unwrap();
    let err = renderer.render_query(&ViewQuery::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn test_bad_date_and_number_are_parse_errors() {
    let f = csv_file(
        "Date,Open,High,Low,Close,Volume\n\
         not-a-date,1,1,1,1,1\n",
    );
    let err = loader::load_table(f.path()).unwrap_err();
    assert!(matches!(err, ReportError::InvalidDate { row: 2, .. }), "got {err:?}");
    assert_eq!(err.kind(), ErrorKind::Parse);

    let f = csv_file(
        "Date,Open,High,Low,Close,Volume\n\
         2022-01-03,1,1,1,abc,1\n",
    );
    let err = loader::load_table(f.path()).unwrap_err();
    assert!(
        matches!(err, ReportError::InvalidNumber { column: "Close", .. }),
        "got {err:?}"
    );
}

#[test]
fn test_missing_file_and_empty_file() {
    let err = loader::load_table("/definitely/not/here/prices.csv").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileNotFound);

    let f = csv_file("Date,Open,High,Low,Close,Volume\n");
    let err = loader::load_table(f.path()).unwrap_err();
    assert!(matches!(err, ReportError::EmptyTable));
    assert_eq!(err.kind(), ErrorKind::Parse);
}

// ── Test 3: Moving average ──
// Length matches, first 19 undefined, entry i = mean(close[i-19..=i]).
#[test]
fn test_moving_average_alignment_and_values() {
    let table = linear_table(30);
    let ma = analytics::moving_average(&table, 20);
    let closes = table.closes();

    assert_eq!(ma.len(), table.len());
    assert!(ma[..19].iter().all(|v| v.is_none()));
    for i in 19..ma.len() {
        let expected = closes[i - 19..=i].iter().sum::<f64>() / 20.0;
        let got = ma[i].expect("defined from index 19");
        assert!((got - expected).abs() < 1e-9, "ma[{i}] = {got}, expected {expected}");
    }
    // close = 100 + i, so the mean of 0..=19 is 109.5
    assert!((ma[19].unwrap() - 109.5).abs() < 1e-9);
}

#[test]
fn test_moving_average_short_table_is_all_undefined() {
    let table = linear_table(10);
    let ma = analytics::moving_average(&table, 20);
    assert_eq!(ma.len(), 10);
    assert!(ma.iter().all(|v| v.is_none()));
}

#[test]
fn test_moving_average_nan_only_poisons_its_windows() {
    let mut closes = vec![1.0; 6];
    closes[1] = f64::NAN;
    let ma = analytics::rolling_mean(&closes, 3);
    assert_eq!(ma[0], None);
    assert_eq!(ma[1], None);
    assert!(ma[2].unwrap().is_nan());
    assert!(ma[3].unwrap().is_nan());
    assert_eq!(ma[4], Some(1.0));
    assert_eq!(ma[5], Some(1.0));
}

// ── Test 4: View selection ──
#[test]
fn test_slice_is_inclusive_and_ordered() {
    let table = linear_table(10);
    let params = ViewParams {
        start: d(2022, 1, 3),
        end: d(2022, 1, 6),
        kind: PlotKind::Line,
    };
    let slice = params.select(&table);
    let dates: Vec<_> = slice.iter().map(|r| r.date).collect();
    assert_eq!(
        dates,
        vec![d(2022, 1, 3), d(2022, 1, 4), d(2022, 1, 5), d(2022, 1, 6)]
    );
}

#[test]
fn test_slice_matches_filter_for_every_pair() {
    let table = linear_table(8);
    let dates: Vec<_> = table.rows().iter().map(|r| r.date).collect();
    for &start in &dates {
        for &end in &dates {
            let got: Vec<_> = table.slice(start, end).iter().map(|r| r.date).collect();
            let expected: Vec<_> = dates
                .iter()
                .copied()
                .filter(|x| start <= *x && *x <= end)
                .collect();
            assert_eq!(got, expected, "slice {start}..={end}");
        }
    }
}

#[test]
fn test_start_after_end_is_empty_not_error() {
    let table = linear_table(10);
    let params = ViewParams {
        start: d(2022, 1, 8),
        end: d(2022, 1, 2),
        kind: PlotKind::Candlestick,
    };
    assert!(params.select(&table).is_empty());

    let renderer = ReportRenderer::new(Settings::default()).unwrap();
    let report = renderer.render_table(&table, &params).unwrap();
    assert_eq!(report.rows_in_view, 0);
    assert!(report.price_chart.is_empty());
    assert_eq!(report.price_chart.series.len(), 4);
}

#[test]
fn test_out_of_bounds_params_are_range_errors() {
    let table = linear_table(10);
    let bounds = table.bounds().unwrap();
    let params = ViewParams {
        start: d(2021, 12, 31),
        end: d(2022, 1, 5),
        kind: PlotKind::Line,
    };
    let err = params.validate(bounds).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);
    assert!(matches!(err, ReportError::OutOfRange { field: "start", .. }));
}

#[test]
fn test_widgets_clamp_to_bounds() {
    let table = linear_table(10);
    let bounds = table.bounds().unwrap();
    let mut w = Widgets::new(bounds, ViewParams::initial(bounds));

    w.adjust(-5);
    assert_eq!(w.params.start, bounds.min);

    w.focus = Field::End;
    w.adjust(30);
    assert_eq!(w.params.end, bounds.max);
    w.adjust(-3);
    assert_eq!(w.params.end, d(2022, 1, 7));

    w.focus = w.focus.next();
    assert_eq!(w.focus, Field::Kind);
    w.adjust(1);
    assert_eq!(w.params.kind, PlotKind::Candlestick);
    assert!(w.params.validate(bounds).is_ok());
}

// ── Test 5: Change distribution ──
// 2022-01-03 close 100 → 2022-01-04 close 102 is +2.0%, Positive.
#[test]
fn test_pct_change_example_is_positive() {
    let table = table_with_closes(&[100.0, 102.0]);
    let records = analytics::change_records(&table, d(2022, 1, 3), d(2022, 1, 4), Thresholds::default());

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].pct_change, None);
    assert_eq!(records[0].category, None);
    assert!((records[1].pct_change.unwrap() - 2.0).abs() < 1e-9);
    assert_eq!(records[1].category, Some(ChangeCategory::Positive));
}

#[test]
fn test_threshold_boundaries_are_neutral() {
    let t = Thresholds::default();
    assert_eq!(analytics::classify(-0.5, t), Some(ChangeCategory::Neutral));
    assert_eq!(analytics::classify(0.5, t), Some(ChangeCategory::Neutral));
    assert_eq!(analytics::classify(-0.5001, t), Some(ChangeCategory::Negative));
    assert_eq!(analytics::classify(0.5001, t), Some(ChangeCategory::Positive));
    assert_eq!(analytics::classify(f64::NAN, t), None);
    assert_eq!(analytics::classify(f64::INFINITY, t), Some(ChangeCategory::Positive));
}

#[test]
fn test_distribution_counts_sum_to_rows_minus_one() {
    // changes: +1%, -0.99%, 0%, +0.4%, -0.398%, +3%
    let closes = [100.0, 101.0, 100.0, 100.0, 100.4, 100.0, 103.0];
    let table = table_with_closes(&closes);
    let (start, end) = (d(2022, 1, 3), d(2022, 1, 9));
    let dist = analytics::change_distribution(&table, start, end, Thresholds::default());

    assert_eq!(dist.total(), table.slice(start, end).len() as u64 - 1);
    assert_eq!(dist.positive, 2);
    assert_eq!(dist.negative, 1);
    assert_eq!(dist.neutral, 3);
}

#[test]
fn test_distribution_respects_range() {
    let table = table_with_closes(&[100.0, 110.0, 121.0, 108.9]);
    // only 01-04..=01-05: one change, +10%
    let dist = analytics::change_distribution(&table, d(2022, 1, 4), d(2022, 1, 5), Thresholds::default());
    assert_eq!(dist, ChangeDistribution { negative: 0, neutral: 0, positive: 1 });

    // range outside the data
    let dist = analytics::change_distribution(&table, d(2023, 1, 1), d(2023, 1, 31), Thresholds::default());
    assert_eq!(dist.total(), 0);
}

// ── Test 6: Chart emitters ──
#[test]
fn test_price_chart_line_and_candlestick() {
    let table = linear_table(5);
    let line = charts::price_chart(table.rows(), PlotKind::Line);
    assert_eq!(line.title, "Closing Price Over Time");
    assert_eq!(line.series.len(), 1);
    assert_eq!(line.series[0].label, "Closing Price");
    assert!(line.series[0].markers);

    let candle = charts::price_chart(table.rows(), PlotKind::Candlestick);
    assert_eq!(candle.title, "Candlestick Chart");
    let labels: Vec<_> = candle.series.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["Closing Price", "Opening Price", "High Price", "Low Price"]);
    assert!(candle.legend && candle.grid);
    assert!(candle.series.iter().all(|s| s.markers && s.points.len() == 5));
    assert_eq!(candle.series[2].points[0].1, Some(table.rows()[0].high));
}

#[test]
fn test_change_pie_colors_labels_and_angle() {
    let dist = ChangeDistribution { negative: 1, neutral: 1, positive: 1 };
    let pie = charts::change_pie(&dist);

    assert_eq!(pie.start_angle_deg, 140.0);
    let colors: Vec<_> = pie.slices.iter().map(|s| (s.label.as_str(), s.color.as_str())).collect();
    assert_eq!(
        colors,
        vec![("Negative", "red"), ("Neutral", "gray"), ("Positive", "green")]
    );
    assert!(pie.slices.iter().all(|s| s.percent_label == "33.3%"));

    let wedges = pie.wedges();
    assert_eq!(wedges.len(), 3);
    assert!((wedges[0].1 - 140.0).abs() < 1e-9);
    assert!((wedges[2].2 - 500.0).abs() < 1e-9);
    assert_eq!(pie.slice_at(150.0), Some(0));
    assert_eq!(pie.slice_at(270.0), Some(1));
    // Neutral wraps past 360°, Positive covers 20°..140°
    assert_eq!(pie.slice_at(0.0), Some(1));
    assert_eq!(pie.slice_at(60.0), Some(2));
}

#[test]
fn test_change_pie_keeps_zero_categories() {
    let dist = ChangeDistribution { negative: 0, neutral: 3, positive: 1 };
    let pie = charts::change_pie(&dist);
    assert_eq!(pie.slices.len(), 3);
    assert_eq!(pie.slices[0].count, 0);
    assert_eq!(pie.slices[0].percent_label, "0.0%");
    assert_eq!(pie.slices[1].percent_label, "75.0%");
    assert_eq!(pie.wedges().len(), 2);
}

// ── Test 7: Full render pass ──
// Reloads from disk, charts come out in page order.
#[test]
fn test_full_pass_from_file() {
    let mut body = String::from("Date,Open,High,Low,Close,Volume\n");
    let table = linear_table(31);
    for r in table.rows() {
        body.push_str(&format!(
            "{},{},{},{},{},{}\n",
            r.date, r.open, r.high, r.low, r.close, r.volume
        ));
    }
    let f = csv_file(&body);
    let renderer = ReportRenderer::new(Settings::with_data(f.path())).unwrap();

    let query = ViewQuery {
        start: Some(d(2022, 1, 10)),
        end: None,
        kind: Some(PlotKind::Candlestick),
    };
    let report = renderer.render_query(&query).unwrap();

    assert_eq!(report.total_rows, 31);
    assert_eq!(report.params.end, d(2022, 1, 31));
    assert_eq!(report.rows_in_view, 22);
    assert_eq!(report.volume_chart.bars.len(), 31);
    assert_eq!(report.moving_average_chart.series[1].label, "20-day Moving Avg");
    // close = 100 + i for 2022-01-01.., so last MA = mean(111..=130)
    assert!((report.latest_moving_average.unwrap() - 120.5).abs() < 1e-9);
    // January 2022 is the whole table: 30 changes, each > +0.5%
    assert_eq!(report.distribution.positive, 30);
    assert_eq!(report.distribution.total(), 30);

    let titles: Vec<String> = report.charts().iter().map(|c| c.title().to_string()).collect();
    assert_eq!(
        titles,
        vec![
            "Candlestick Chart",
            "Volume Over Time",
            "Closing Price with 20-day Moving Average",
            "Distribution of Closing Price Changes",
        ]
    );
}

#[test]
fn test_invalid_settings_rejected() {
    let mut s = Settings::default();
    s.ma_window = 0;
    assert_eq!(ReportRenderer::new(s).unwrap_err().kind(), ErrorKind::Config);

    let mut s = Settings::default();
    s.negative_threshold = 1.0;
    s.positive_threshold = -1.0;
    assert_eq!(ReportRenderer::new(s).unwrap_err().kind(), ErrorKind::Config);
}

// ── Test 8: Pass timing ──
// A pass that began before the load reports time from that start.
#[test]
fn test_elapsed_counts_from_pass_start() {
    let table = linear_table(25);
    let params = ViewParams::initial(table.bounds().unwrap());
    let renderer = ReportRenderer::new(Settings::default()).unwrap();

    let started = std::time::Instant::now()
        .checked_sub(std::time::Duration::from_millis(50))
        .unwrap();
    let report = renderer.render_table_since(&table, &params, started).unwrap();
    assert!(report.elapsed_us >= 50_000, "elapsed {}us", report.elapsed_us);
}
