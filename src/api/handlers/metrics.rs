use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;

use crate::AppState;

/// GET /metrics — Prometheus text exposition of the marketplace counters
pub async fn scrape(State(state): State<AppState>) -> impl IntoResponse {
    let payload = state.metrics_handle.render();
    ([(CONTENT_TYPE, "text/plain; version=0.0.4")], payload)
}
