//! Health check endpoints.
//!
//! `/health` is a liveness probe; `/ready` aggregates component checks.

use axum::{Json, extract::State, http::StatusCode};
use campus_core::reducer::Reducer;
use campus_runtime::{HealthCheck, HealthReport, HealthStatus, Store};
use std::sync::Arc;

/// Liveness probe.
///
/// Returns 200 OK whenever the process can serve HTTP. Dependencies are not
/// consulted.
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Map an aggregated report to a response.
///
/// - 200 OK: Healthy or Degraded
/// - 503 Service Unavailable: Unhealthy
#[must_use]
pub fn readiness_response(checks: Vec<HealthCheck>) -> (StatusCode, Json<HealthReport>) {
    let report = HealthReport::new(checks);

    let status = match report.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(report))
}

/// Readiness probe for a bare store.
pub async fn health_check_with_store<S, A, E, R>(
    State(store): State<Arc<Store<S, A, E, R>>>,
) -> (StatusCode, Json<HealthReport>)
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    S: Send + Sync + 'static,
    A: Send + 'static,
    E: Send + Sync + 'static,
{
    readiness_response(vec![store.health()])
}
