use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use price_dashboard::analytics;
use price_dashboard::config::{Settings, Thresholds};
use price_dashboard::generator::{self, PriceGenerator};
use price_dashboard::loader;
use price_dashboard::report::ReportRenderer;
use price_dashboard::svg;
use price_dashboard::types::{PlotKind, PriceTable};
use price_dashboard::view::ViewParams;

const SIZES: [usize; 4] = [250, 1000, 5000, 20000];

fn table(days: usize) -> PriceTable {
    let mut gen = PriceGenerator::new(42, PriceGenerator::default_start());
    PriceTable::from_rows(gen.generate(days))
}

fn derived_series(c: &mut Criterion) {
    let mut group = c.benchmark_group("derived_series");
    for size in SIZES {
        let table = table(size);
        let bounds = table.bounds().unwrap();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("moving_average", size), &table, |b, t| {
            b.iter(|| analytics::moving_average(t, 20));
        });
        group.bench_with_input(BenchmarkId::new("change_distribution", size), &table, |b, t| {
            b.iter(|| analytics::change_distribution(t, bounds.min, bounds.max, Thresholds::default()));
        });
    }
    group.finish();
}

fn render_pass(c: &mut Criterion) {
    let renderer = ReportRenderer::new(Settings::default()).unwrap();

    let mut group = c.benchmark_group("render_pass");
    for size in SIZES {
        let table = table(size);
        let bounds = table.bounds().unwrap();
        let params = ViewParams { start: bounds.min, end: bounds.max, kind: PlotKind::Candlestick };
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &table, |b, t| {
            b.iter(|| {
                let report = renderer.render_table(t, &params).unwrap();
                for chart in report.charts().iter() {
                    std::hint::black_box(svg::render(chart));
                }
            });
        });
    }
    group.finish();
}

fn load_csv(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.csv");
    let mut gen = PriceGenerator::new(42, PriceGenerator::default_start());
    generator::write_csv(&path, &gen.generate(5000)).unwrap();

    c.bench_function("load_csv_5000", |b| {
        b.iter(|| loader::load_table(&path).unwrap());
    });
}

criterion_group!(benches, derived_series, render_pass, load_csv);
criterion_main!(benches);
