use std::fmt::Write;
use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::{ErrorKind, ReportError};
use crate::report::{Report, ReportRenderer};
use crate::svg;
use crate::types::PlotKind;
use crate::view::ViewQuery;

struct AppState {
    renderer: ReportRenderer,
}

pub async fn run(port: u16, renderer: ReportRenderer) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(renderer);

    let addr = format!("0.0.0.0:{port}");
    info!(%addr, "dashboard listening");
    println!("Dashboard at http://localhost:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(renderer: ReportRenderer) -> Router {
    let state = Arc::new(AppState { renderer });
    Router::new()
        .route("/", get(dashboard))
        .route("/api/report", get(report_json))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A failed render pass. Every error is fatal to the pass and shown as a page.
#[derive(Debug)]
pub enum WebError {
    Report(ReportError),
    BadQuery(String),
    Internal(String),
}

impl From<ReportError> for WebError {
    fn from(err: ReportError) -> Self {
        WebError::Report(err)
    }
}

impl From<QueryRejection> for WebError {
    fn from(rejection: QueryRejection) -> Self {
        WebError::BadQuery(rejection.body_text())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            WebError::Report(err) => {
                let status = match err.kind() {
                    ErrorKind::FileNotFound => StatusCode::NOT_FOUND,
                    ErrorKind::Range => StatusCode::BAD_REQUEST,
                    ErrorKind::Parse => StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorKind::Config | ErrorKind::Io => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
            WebError::BadQuery(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            WebError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };
        warn!(status = status.as_u16(), %message, "render pass failed");
        (status, Html(error_page(&message))).into_response()
    }
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ViewQuery>, QueryRejection>,
) -> Result<Html<String>, WebError> {
    let Query(query) = query?;
    let report = render_blocking(state, query).await?;
    Ok(Html(render_page(&report)))
}

async fn report_json(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ViewQuery>, QueryRejection>,
) -> Result<Json<Report>, WebError> {
    let Query(query) = query?;
    Ok(Json(render_blocking(state, query).await?))
}

/// Each request is a full pass: the file is reloaded, nothing is cached.
async fn render_blocking(state: Arc<AppState>, query: ViewQuery) -> Result<Report, WebError> {
    tokio::task::spawn_blocking(move || state.renderer.render_query(&query))
        .await
        .map_err(|e| WebError::Internal(format!("render task failed: {e}")))?
        .map_err(WebError::from)
}

/// The dashboard page: widgets, then the four charts in fixed order.
pub fn render_page(report: &Report) -> String {
    let mut html = String::with_capacity(64 * 1024);
    let p = &report.params;
    let b = &report.bounds;

    html.push_str(PAGE_HEAD);
    html.push_str("<h1>Financial Data Analysis</h1>\n");
    let _ = writeln!(html, r#"<form method="get" action="/">"#);
    let _ = writeln!(
        html,
        r#"<label>Start Date <input type="date" name="start" min="{min}" max="{max}" value="{}"></label>"#,
        p.start,
        min = b.min,
        max = b.max
    );
    let _ = writeln!(
        html,
        r#"<label>End Date <input type="date" name="end" min="{min}" max="{max}" value="{}"></label>"#,
        p.end,
        min = b.min,
        max = b.max
    );
    html.push_str(r#"<label>Plot Type <select name="kind" onchange="this.form.submit()">"#);
    for kind in PlotKind::ALL {
        let selected = if kind == p.kind { " selected" } else { "" };
        let _ = write!(html, r#"<option value="{0}"{selected}>{0}</option>"#, kind.label());
    }
    html.push_str("</select></label>\n<button type=\"submit\">Update</button>\n</form>\n");
    let _ = writeln!(
        html,
        r#"<p class="meta">{} of {} rows selected ({} to {})</p>"#,
        report.rows_in_view, report.total_rows, p.start, p.end
    );

    for chart in report.charts() {
        let _ = writeln!(
            html,
            r#"<section class="chart" data-title="{}">"#,
            svg::escape(chart.title())
        );
        html.push_str(&svg::render(&chart));
        html.push_str("</section>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn error_page(message: &str) -> String {
    format!(
        "{PAGE_HEAD}<h1>Financial Data Analysis</h1>\n<pre class=\"error\">{}</pre>\n</body>\n</html>\n",
        svg::escape(message)
    )
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Financial Data Analysis</title>
<style>
body { font-family: sans-serif; margin: 2rem auto; max-width: 1000px; color: #222; }
form { display: flex; gap: 1rem; align-items: center; flex-wrap: wrap; }
section.chart { margin: 1.5rem 0; }
section.chart svg { max-width: 100%; height: auto; }
.meta { color: #666; }
.error { color: #b00; background: #fee; padding: 1rem; white-space: pre-wrap; }
</style>
</head>
<body>
"#;
