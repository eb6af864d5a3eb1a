//! Dashboard endpoints.
//!
//! - GET /api/dashboard/admin - Portal-wide counts (admin)
//! - GET /api/dashboard/coordinator - Events the caller created (faculty, admin)
//! - GET /api/dashboard/faculty?school= - One school's events (faculty, admin)
//! - GET /api/dashboard/student/:roll - A student's summary

use crate::app::Caller;
use crate::app::queries::SchoolQuery;
use crate::dashboard::{AdminDashboard, CoordinatorDashboard, FacultyDashboard, StudentDashboard};
use crate::server::state::AppState;
use crate::types::RollNumber;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use campus_web::WebResult;

/// Admin dashboard.
pub async fn admin(
    State(state): State<AppState>,
    caller: Caller,
) -> WebResult<Json<AdminDashboard>> {
    Ok(Json(state.service.admin_dashboard(&caller).await?))
}

/// Coordinator dashboard.
pub async fn coordinator(
    State(state): State<AppState>,
    caller: Caller,
) -> WebResult<Json<CoordinatorDashboard>> {
    Ok(Json(state.service.coordinator_dashboard(&caller).await?))
}

/// Faculty dashboard for a school.
pub async fn faculty(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<SchoolQuery>,
) -> WebResult<Json<FacultyDashboard>> {
    Ok(Json(
        state
            .service
            .faculty_dashboard(&caller, query.school)
            .await?,
    ))
}

/// Student dashboard.
pub async fn student(
    State(state): State<AppState>,
    _caller: Caller,
    Path(roll): Path<RollNumber>,
) -> Json<StudentDashboard> {
    Json(state.service.student_dashboard(roll).await)
}
