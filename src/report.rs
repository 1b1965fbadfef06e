use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::analytics;
use crate::charts::{self, BarChart, Chart, LineChart, PieChart};
use crate::config::Settings;
use crate::error::{ReportError, Result};
use crate::loader;
use crate::types::{ChangeDistribution, DateBounds, PriceTable};
use crate::view::{ViewParams, ViewQuery};

/// Everything one render pass produces, charts in page order.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub bounds: DateBounds,
    pub params: ViewParams,
    pub total_rows: usize,
    pub rows_in_view: usize,
    pub latest_moving_average: Option<f64>,
    pub distribution: ChangeDistribution,
    pub price_chart: LineChart,
    pub volume_chart: BarChart,
    pub moving_average_chart: LineChart,
    pub change_pie: PieChart,
    /// Duration of the pass, including the file load when the renderer did it.
    pub elapsed_us: u64,
}

impl Report {
    pub fn charts(&self) -> [Chart; 4] {
        [
            Chart::Line(self.price_chart.clone()),
            Chart::Bar(self.volume_chart.clone()),
            Chart::Line(self.moving_average_chart.clone()),
            Chart::Pie(self.change_pie.clone()),
        ]
    }
}

/// Runs the full pass: load, derive, select, emit. Holds no state between
/// passes besides the settings.
#[derive(Debug, Clone)]
pub struct ReportRenderer {
    settings: Settings,
}

impl ReportRenderer {
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn load(&self) -> Result<PriceTable> {
        loader::load_table(&self.settings.data_path)
    }

    /// Reload the file and render with partially specified parameters.
    pub fn render_query(&self, query: &ViewQuery) -> Result<Report> {
        let started = Instant::now();
        let table = self.load()?;
        let bounds = bounds_of(&table)?;
        self.render_table_since(&table, &query.resolve(bounds), started)
    }

    /// Reload the file and render with the given parameters.
    pub fn render(&self, params: &ViewParams) -> Result<Report> {
        let started = Instant::now();
        let table = self.load()?;
        self.render_table_since(&table, params, started)
    }

    /// Render an already loaded table. `elapsed_us` covers this call only.
    pub fn render_table(&self, table: &PriceTable, params: &ViewParams) -> Result<Report> {
        self.render_table_since(table, params, Instant::now())
    }

    /// Render a table loaded as part of a pass that began at `started`, so
    /// `elapsed_us` includes the load.
    pub fn render_table_since(
        &self,
        table: &PriceTable,
        params: &ViewParams,
        started: Instant,
    ) -> Result<Report> {
        let bounds = bounds_of(table)?;
        params.validate(bounds)?;

        let s = &self.settings;
        let moving_average = analytics::moving_average(table, s.ma_window);
        let distribution =
            analytics::change_distribution(table, s.analysis_start, s.analysis_end, s.thresholds());

        let slice = params.select(table);

        let report = Report {
            bounds,
            params: *params,
            total_rows: table.len(),
            rows_in_view: slice.len(),
            latest_moving_average: moving_average.last().copied().flatten(),
            distribution,
            price_chart: charts::price_chart(slice, params.kind),
            volume_chart: charts::volume_bars(table),
            moving_average_chart: charts::price_with_ma(table, &moving_average, s.ma_window),
            change_pie: charts::change_pie(&distribution),
            elapsed_us: started.elapsed().as_micros() as u64,
        };
        debug!(
            rows = report.total_rows,
            in_view = report.rows_in_view,
            kind = params.kind.label(),
            elapsed_us = report.elapsed_us,
            "render pass complete"
        );
        Ok(report)
    }
}

fn bounds_of(table: &PriceTable) -> Result<DateBounds> {
    table.bounds().ok_or(ReportError::EmptyTable)
}
