use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use price_dashboard::config::Settings;
use price_dashboard::generator::{self, PriceGenerator};
use price_dashboard::latency::LatencyTracker;
use price_dashboard::report::{Report, ReportRenderer};
use price_dashboard::svg;
use price_dashboard::tui;
use price_dashboard::types::PlotKind;
use price_dashboard::view::ViewQuery;
use price_dashboard::web;

#[derive(Parser)]
#[command(name = "price-dashboard", about = "Daily price charts: range view, volume, moving average, change mix")]
struct Cli {
    /// Run mode: tui, web, headless, or generate
    #[arg(long, default_value = "tui")]
    mode: String,

    #[command(flatten)]
    settings: Settings,

    /// Web server port (web mode only)
    #[arg(long, default_value = "3000")]
    port: u16,

    /// Initial start date (defaults to the first date in the file)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Initial end date (defaults to the last date in the file)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Initial plot type
    #[arg(long, value_enum)]
    kind: Option<PlotKind>,

    /// Output directory for SVG charts (headless mode only)
    #[arg(long, default_value = "charts")]
    out: PathBuf,

    /// Business days of sample data to write (generate mode only)
    #[arg(long, default_value = "300")]
    days: usize,

    /// RNG seed for sample data (generate mode only)
    #[arg(long, default_value = "42")]
    seed: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.mode);

    let query = ViewQuery {
        start: cli.start,
        end: cli.end,
        kind: cli.kind,
    };

    match cli.mode.as_str() {
        "tui" => tui::run(ReportRenderer::new(cli.settings)?, query)?,
        "web" => web::run(cli.port, ReportRenderer::new(cli.settings)?).await?,
        "headless" => run_headless(ReportRenderer::new(cli.settings)?, &query, &cli.out)?,
        "generate" => run_generate(&cli.settings.data_path, cli.days, cli.seed)?,
        other => eprintln!("Unknown mode: {other}. Use --mode tui|web|headless|generate"),
    }

    Ok(())
}

fn init_tracing(mode: &str) {
    // The TUI owns the terminal; stay quiet there unless RUST_LOG asks otherwise.
    let default = if mode == "tui" { "off" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_headless(
    renderer: ReportRenderer,
    query: &ViewQuery,
    out: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== price-dashboard (headless) ===");
    println!("Data: {}", renderer.settings().data_path.display());
    println!();

    let mut latency = LatencyTracker::new();
    let start = latency.start();
    let report = renderer.render_query(query)?;
    latency.record_pass(start);

    std::fs::create_dir_all(out)?;
    let names = ["price_chart.svg", "volume.svg", "price_moving_average.svg", "change_pie.svg"];
    for (name, chart) in names.iter().zip(report.charts().iter()) {
        let path = out.join(name);
        std::fs::write(&path, svg::render(chart))?;
        info!(path = %path.display(), "chart written");
        println!("  wrote {:<28} {}", name, chart.title());
    }
    let json_path = out.join("report.json");
    std::fs::write(&json_path, serde_json::to_string_pretty(&report)?)?;
    info!(path = %json_path.display(), "report written");

    print_summary(&report, renderer.settings());
    let pass = latency.stats();
    println!("  Render pass:        {}us", pass.max_us);
    Ok(())
}

fn print_summary(report: &Report, settings: &Settings) {
    println!();
    println!("=== Results ===");
    println!("  Data range:         {} .. {}", report.bounds.min, report.bounds.max);
    println!(
        "  View:               {} .. {} ({})",
        report.params.start,
        report.params.end,
        report.params.kind.label()
    );
    println!("  Rows in view:       {} of {}", report.rows_in_view, report.total_rows);
    match report.latest_moving_average {
        Some(ma) => println!("  Latest {}-day MA:   {:.2}", settings.ma_window, ma),
        None => println!("  Latest {}-day MA:   n/a", settings.ma_window),
    }
    println!();
    println!(
        "  Change mix {} .. {}:",
        settings.analysis_start, settings.analysis_end
    );
    for slice in &report.change_pie.slices {
        println!("    {:<10} {:>4}  {}", slice.label, slice.count, slice.percent_label);
    }
    println!();
}

fn run_generate(path: &Path, days: usize, seed: u64) -> Result<(), Box<dyn std::error::Error>> {
    let mut gen = PriceGenerator::new(seed, PriceGenerator::default_start());
    let rows = gen.generate(days);
    generator::write_csv(path, &rows)?;
    info!(path = %path.display(), rows = rows.len(), "sample data written");
    println!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}
