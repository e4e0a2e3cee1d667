use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::app_state::AppState;

pub mod health;
pub mod metrics;
pub mod songs;

/// API routes plus the Prometheus scrape endpoint.
pub fn router(state: AppState, prometheus: Arc<PrometheusHandle>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/api/v1/songs",
            post(songs::create_song).get(songs::list_songs),
        )
        .route("/api/v1/songs/{job_id}", get(songs::get_song))
        .route(
            "/api/v1/songs/{job_id}/check-status",
            post(songs::check_song_status),
        )
        .with_state(state)
        .route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(prometheus),
        )
}
