//! Health, readiness and metrics endpoints.

use super::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use campus_runtime::HealthReport;
use campus_web::handlers::readiness_response;

pub use campus_web::handlers::health_check;

/// Readiness check endpoint.
///
/// Reports the store and the event log. A log with failed appends is
/// degraded, which still answers 200; a stopped store answers 503.
///
/// ```bash
/// curl http://localhost:8080/ready
/// # {"status":"healthy","checks":[...]}
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    readiness_response(state.service.health().await)
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> (StatusCode, String) {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".to_string()),
    }
}
