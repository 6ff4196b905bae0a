//! HTTP request handlers: scrape endpoint, landing page and health check.

use std::time::Instant;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use tracing::{debug, error};

use crate::state::AppState;

// ============================================================
// Metrics
// ============================================================

/// Runs one collection cycle and returns the text exposition.
///
/// The cycle blocks on subprocesses and on the collection lock, so it runs
/// on the blocking pool instead of a runtime worker.
pub(crate) async fn handle_metrics(State(state): State<AppState>) -> Response {
    let _in_flight = state.exporter.begin_request();
    let exporter = state.exporter.clone();
    let t0 = Instant::now();
    let result = tokio::task::spawn_blocking(move || {
        let body = exporter.scrape();
        (body, exporter.content_type())
    })
    .await;

    let response = match result {
        Ok((Ok(body), content_type)) => {
            debug!(
                duration_ms = t0.elapsed().as_millis() as u64,
                bytes = body.len(),
                "scrape served"
            );
            ([(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Ok((Err(e), _)) => {
            error!(error = %e, "failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}\n")).into_response()
        }
        Err(e) => {
            error!(error = %e, "scrape panicked in spawn_blocking");
            (StatusCode::INTERNAL_SERVER_ERROR, "scrape failed\n").into_response()
        }
    };
    state.exporter.record_response(response.status().as_u16());
    response
}

// ============================================================
// Landing page
// ============================================================

pub(crate) async fn handle_root(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<html>
<head><title>Ethtool Exporter</title></head>
<body>
<h1>Ethtool Exporter</h1>
<p><a href=\"{}\">Metrics</a></p>
</body>
</html>
",
        state.telemetry_path
    ))
}

// ============================================================
// Health
// ============================================================

pub(crate) async fn handle_health() -> &'static str {
    "ok"
}
