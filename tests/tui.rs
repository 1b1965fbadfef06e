//! Terminal dashboard state: which keys trigger a full pass, and what a pass
//! does to the widgets, the report and the stats.

use std::path::Path;

use chrono::{Days, NaiveDate};
use crossterm::event::KeyCode;

use price_dashboard::config::Settings;
use price_dashboard::generator;
use price_dashboard::report::ReportRenderer;
use price_dashboard::tui::App;
use price_dashboard::types::{PlotKind, PriceRow};
use price_dashboard::view::{Field, ViewQuery};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// `n` consecutive calendar days from 2022-01-03 with close = 100 + i.
fn write_days(path: &Path, n: u64) {
    let rows: Vec<PriceRow> = (0..n)
        .map(|i| {
            let close = 100.0 + i as f64;
            PriceRow {
                date: d(2022, 1, 3).checked_add_days(Days::new(i)).unwrap(),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000.0,
            }
        })
        .collect();
    generator::write_csv(path, &rows).unwrap();
}

fn app_for(path: &Path) -> App {
    let renderer = ReportRenderer::new(Settings::with_data(path)).unwrap();
    App::new(renderer, ViewQuery::default())
}

// ── Test 1: Reload on input ──
// A widget edit re-reads the file, so edits on disk show up.
#[test]
fn test_keypress_reloads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prices.csv");
    write_days(&path, 30);

    let mut app = app_for(&path);
    app.rerun();
    assert_eq!(app.passes(), 1);
    assert_eq!(app.report().unwrap().total_rows, 30);

    write_days(&path, 40);
    app.handle_key(KeyCode::Right);

    assert_eq!(app.passes(), 2);
    let report = app.report().unwrap();
    assert_eq!(report.total_rows, 40);
    assert_eq!(report.params.start, d(2022, 1, 4));
    assert_eq!(report.bounds.max, d(2022, 2, 11));
}

// ── Test 2: Rebound ──
// When the file's range shrinks, the widgets are clamped into it.
#[test]
fn test_widgets_reclamp_when_range_shrinks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prices.csv");
    write_days(&path, 60);

    let mut app = app_for(&path);
    app.rerun();
    assert_eq!(app.widgets().unwrap().params.end, d(2022, 3, 3));

    write_days(&path, 20);
    app.handle_key(KeyCode::Char('r'));

    let widgets = app.widgets().unwrap();
    assert_eq!(widgets.bounds.max, d(2022, 1, 22));
    assert_eq!(widgets.params.end, d(2022, 1, 22));
    assert!(widgets.params.validate(widgets.bounds).is_ok());
    assert!(app.error().is_none());
    assert_eq!(app.report().unwrap().rows_in_view, 20);
}

// ── Test 3: Failed pass ──
// The error replaces the report; a later good pass restores it.
#[test]
fn test_failed_pass_sets_error_and_clears_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prices.csv");
    write_days(&path, 10);

    let mut app = app_for(&path);
    app.rerun();
    assert!(app.report().is_some());

    std::fs::remove_file(&path).unwrap();
    app.handle_key(KeyCode::Char('r'));
    assert!(app.report().is_none());
    assert!(app.error().unwrap().contains("not found"), "{:?}", app.error());
    assert_eq!(app.latency().failures(), 1);

    write_days(&path, 10);
    app.handle_key(KeyCode::Char('r'));
    assert!(app.error().is_none());
    assert_eq!(app.report().unwrap().total_rows, 10);
}

// ── Test 4: Keys without a pass ──
#[test]
fn test_focus_and_quit_do_not_rerun() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prices.csv");
    write_days(&path, 10);

    let mut app = app_for(&path);
    app.rerun();

    app.handle_key(KeyCode::Tab);
    app.handle_key(KeyCode::Tab);
    assert_eq!(app.passes(), 1);
    assert_eq!(app.widgets().unwrap().focus, Field::Kind);

    app.handle_key(KeyCode::Char('x'));
    assert_eq!(app.passes(), 1);

    // toggling the kind is an input change
    app.handle_key(KeyCode::Left);
    assert_eq!(app.passes(), 2);
    assert_eq!(app.report().unwrap().params.kind, PlotKind::Candlestick);

    app.handle_key(KeyCode::Char('q'));
    assert!(app.should_quit());
    assert_eq!(app.passes(), 2);
}

#[test]
fn test_widget_keys_ignored_before_first_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.csv");

    let mut app = app_for(&path);
    app.handle_key(KeyCode::Right);
    app.handle_key(KeyCode::Tab);
    assert_eq!(app.passes(), 0);

    app.handle_key(KeyCode::Char('r'));
    assert_eq!(app.passes(), 1);
    assert!(app.widgets().is_none());
    assert!(app.error().is_some());
}

// ── Test 5: Clearing stats ──
#[test]
fn test_clear_stats_keeps_view() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prices.csv");
    write_days(&path, 10);

    let mut app = app_for(&path);
    app.rerun();
    app.handle_key(KeyCode::Right);
    assert_eq!(app.latency().stats().count, 2);

    app.handle_key(KeyCode::Char('c'));
    assert_eq!(app.passes(), 0);
    assert_eq!(app.latency().stats().count, 0);
    assert_eq!(app.latency().failures(), 0);
    assert_eq!(app.report().unwrap().params.start, d(2022, 1, 4));
}
