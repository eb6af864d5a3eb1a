//! Report endpoints (faculty, admin).
//!
//! - POST /api/reports/export - Attendance across events as CSV

use super::attendance::csv_download;
use crate::app::Caller;
use crate::export::ReportFilter;
use crate::server::state::AppState;
use axum::{extract::State, response::IntoResponse};
use campus_web::{ApiJson, WebResult};

/// Download recorded attendance across events.
///
/// Every filter is optional; an empty body exports everything.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/reports/export \
///   -H "X-User-Id: fac-01" -H "X-User-Role: faculty" \
///   -H "Content-Type: application/json" \
///   -d '{"category": "hackathon", "start_date": "2025-03-01", "end_date": "2025-03-31"}'
/// ```
pub async fn export(
    State(state): State<AppState>,
    caller: Caller,
    filter: Option<ApiJson<ReportFilter>>,
) -> WebResult<impl IntoResponse> {
    let filter = filter.map(|ApiJson(filter)| filter).unwrap_or_default();
    let export = state.service.attendance_report(&caller, filter).await?;
    Ok(csv_download(export))
}
