//! Route handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use tracing::trace;

use crate::ApiState;

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let body = state.registry.render();
    trace!(bytes = body.len(), "metrics scraped");
    (
        StatusCode::OK,
        [(CONTENT_TYPE, maintenance_metrics::CONTENT_TYPE)],
        body,
    )
}

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
