//! Application state for the portal HTTP server.

use crate::app::PortalService;
use metrics_exporter_prometheus::PrometheusHandle;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; the service shares its store behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Commands and queries against the portal store
    pub service: PortalService,

    /// Renders `/metrics`; absent when no recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub const fn new(service: PortalService, metrics: Option<PrometheusHandle>) -> Self {
        Self { service, metrics }
    }
}
