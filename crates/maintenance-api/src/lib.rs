//! maintenance-api — HTTP surface of the maintenance exporter.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/metrics` | Prometheus exposition of the registry |
//! | GET | `/healthz` | Liveness check, always `ok` |
//!
//! Neither route depends on the collector having succeeded: `/metrics`
//! serves whatever the registry holds, stale or not.

pub mod handlers;

use axum::Router;
use axum::routing::get;
use maintenance_metrics::Registry;

/// Shared state for handlers.
#[derive(Clone)]
pub struct ApiState {
    pub registry: Registry,
}

/// Build the exporter router.
pub fn build_router(registry: Registry) -> Router {
    let state = ApiState { registry };

    Router::new()
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}
