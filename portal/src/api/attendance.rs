//! Attendance endpoints (faculty, admin, or sub-users with the matching
//! permission).
//!
//! - POST /api/events/:id/attendance - Mark one student
//! - GET /api/events/:id/attendance - Roster with search and status filters
//! - POST /api/events/:id/attendance/mark-all - Mark every unmarked student present
//! - POST /api/events/:id/attendance/bulk-csv - Record a CSV upload (`text/csv` body)
//! - GET /api/events/:id/attendance/export - Roster as CSV
//! - DELETE /api/events/:id/attendance/:aid - Remove a record
//! - POST /api/events/:id/attendance/:aid/od - Grant OD
//! - GET /api/students/:roll/attendance - A student's attendance

use crate::app::queries::{AttendanceExport, RosterEntry, RosterQuery};
use crate::app::{Caller, MarkAttendanceRequest};
use crate::dashboard::StudentAttendance;
use crate::server::state::AppState;
use crate::types::{
    AttendanceId, AttendanceRecord, EventId, ImportSummary, MarkAllSummary, RollNumber,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use campus_web::{ApiJson, WebResult};

/// Mark a registered student present or late.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events/<id>/attendance \
///   -H "X-User-Id: fac-01" -H "X-User-Role: faculty" \
///   -H "Content-Type: application/json" \
///   -d '{"roll_number": "A2305", "status": "present"}'
/// ```
pub async fn mark(
    State(state): State<AppState>,
    caller: Caller,
    Path(event_id): Path<EventId>,
    ApiJson(request): ApiJson<MarkAttendanceRequest>,
) -> WebResult<(StatusCode, Json<AttendanceRecord>)> {
    let record = state
        .service
        .mark_attendance(&caller, event_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Roster of approved registrations with their attendance.
pub async fn roster(
    State(state): State<AppState>,
    caller: Caller,
    Path(event_id): Path<EventId>,
    Query(query): Query<RosterQuery>,
) -> WebResult<Json<Vec<RosterEntry>>> {
    Ok(Json(state.service.roster(&caller, event_id, query).await?))
}

/// Mark every approved, unmarked student present.
pub async fn mark_all(
    State(state): State<AppState>,
    caller: Caller,
    Path(event_id): Path<EventId>,
) -> WebResult<Json<MarkAllSummary>> {
    let summary = state.service.mark_all_present(&caller, event_id).await?;
    tracing::info!(%event_id, marked = summary.marked, "Marked all present");
    Ok(Json(summary))
}

/// Record a CSV upload.
///
/// The body is the CSV text; rows that fail their checks are listed in the
/// response and do not fail the upload.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events/<id>/attendance/bulk-csv \
///   -H "X-User-Id: fac-01" -H "X-User-Role: faculty" \
///   -H "Content-Type: text/csv" --data-binary @attendance.csv
/// ```
pub async fn bulk_csv(
    State(state): State<AppState>,
    caller: Caller,
    Path(event_id): Path<EventId>,
    body: String,
) -> WebResult<Json<ImportSummary>> {
    let summary = state
        .service
        .import_attendance(&caller, event_id, &body)
        .await?;
    tracing::info!(
        %event_id,
        imported = summary.imported,
        rejected = summary.rejected.len(),
        "Attendance upload recorded"
    );
    Ok(Json(summary))
}

/// A CSV file as an attachment.
pub(crate) fn csv_download(export: AttendanceExport) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export.filename),
            ),
        ],
        export.csv,
    )
}

/// Download the roster as CSV.
pub async fn export(
    State(state): State<AppState>,
    caller: Caller,
    Path(event_id): Path<EventId>,
) -> WebResult<impl IntoResponse> {
    let export = state.service.attendance_export(&caller, event_id).await?;
    Ok(csv_download(export))
}

/// Remove an attendance record.
pub async fn remove(
    State(state): State<AppState>,
    caller: Caller,
    Path((event_id, attendance_id)): Path<(EventId, AttendanceId)>,
) -> WebResult<StatusCode> {
    state
        .service
        .remove_attendance(&caller, event_id, attendance_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Grant OD on an attendance record.
pub async fn grant_od(
    State(state): State<AppState>,
    caller: Caller,
    Path((event_id, attendance_id)): Path<(EventId, AttendanceId)>,
) -> WebResult<Json<AttendanceRecord>> {
    Ok(Json(
        state
            .service
            .grant_od(&caller, event_id, attendance_id)
            .await?,
    ))
}

/// Attendance of a student across events.
pub async fn student_attendance(
    State(state): State<AppState>,
    _caller: Caller,
    Path(roll): Path<RollNumber>,
) -> Json<Vec<StudentAttendance>> {
    Json(state.service.student_attendance(roll).await)
}
