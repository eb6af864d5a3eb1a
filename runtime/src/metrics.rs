//! Prometheus metrics for observability and monitoring.
//!
//! Metric families:
//! - Store: commands, reducer latency, effects, shutdown
//! - Event log: appends, loads, persistence failures
//! - Portal: registration, attendance and OD request outcomes
//!
//! # Example
//!
//! ```rust,no_run
//! use campus_runtime::metrics::install_recorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = install_recorder()?;
//!
//! // Serve `handle.render()` from a `/metrics` route.
//! println!("{}", handle.render());
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Build the Prometheus recorder without installing it globally.
///
/// Tests use this with `metrics::with_local_recorder`.
///
/// # Errors
///
/// Returns [`MetricsError::Build`] if the histogram buckets are rejected.
pub fn build_recorder() -> Result<metrics_exporter_prometheus::PrometheusRecorder, MetricsError> {
    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[
                0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
            ],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?;

    Ok(builder.build_recorder())
}

/// Register metric descriptions and install the global Prometheus recorder.
///
/// Call once at startup; the returned handle renders the scrape body.
///
/// # Errors
///
/// Returns [`MetricsError::Install`] if a global recorder is already set.
pub fn install_recorder() -> Result<PrometheusHandle, MetricsError> {
    let recorder = build_recorder()?;
    let handle = recorder.handle();

    metrics::set_global_recorder(recorder).map_err(|e| MetricsError::Install(e.to_string()))?;
    register_metrics();

    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!("store.commands.total", "Actions sent to the store");
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time spent inside the reducer per action"
    );
    describe_counter!("store.effects.executed", "Effects executed, by type");
    describe_counter!(
        "store.shutdown.rejected_actions",
        "Actions refused because shutdown had begun"
    );

    describe_counter!(
        "event_log_events_appended_total",
        "Events appended to the event log"
    );
    describe_counter!(
        "event_log_events_loaded_total",
        "Events loaded from the event log"
    );
    describe_counter!(
        "event_log_append_failures_total",
        "Appends that failed and left the log behind the in-memory state"
    );
    describe_histogram!(
        "event_log_append_duration_seconds",
        "Time taken to append events"
    );

    describe_counter!(
        "portal_registrations_total",
        "Registration attempts, by outcome"
    );
    describe_counter!(
        "portal_attendance_marked_total",
        "Attendance records created, by status"
    );
    describe_counter!("portal_od_requests_total", "OD request decisions, by outcome");
}

/// Event log metrics recorder.
pub struct EventLogMetrics;

impl EventLogMetrics {
    /// Record an event append operation.
    pub fn record_append(count: usize, duration: Duration) {
        counter!("event_log_events_appended_total").increment(count as u64);
        histogram!("event_log_append_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record an event load operation.
    pub fn record_load(count: usize) {
        counter!("event_log_events_loaded_total").increment(count as u64);
    }

    /// Record a failed append.
    pub fn record_append_failure() {
        counter!("event_log_append_failures_total").increment(1);
    }
}

/// Portal domain metrics recorder.
pub struct PortalMetrics;

impl PortalMetrics {
    /// Record the outcome of a registration attempt (`created`, `rejected`, ...).
    pub fn record_registration(outcome: &'static str) {
        counter!("portal_registrations_total", "outcome" => outcome).increment(1);
    }

    /// Record a new attendance record (`present` or `late`).
    pub fn record_attendance(status: &'static str, count: u64) {
        counter!("portal_attendance_marked_total", "status" => status).increment(count);
    }

    /// Record an OD request decision (`submitted`, `approved`, `rejected`, `withdrawn`).
    pub fn record_od_request(outcome: &'static str) {
        counter!("portal_od_requests_total", "outcome" => outcome).increment(1);
    }
}
