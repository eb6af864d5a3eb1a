//! Registration endpoints.
//!
//! - POST /api/events/:id/registrations - Register the calling student
//! - GET /api/events/:id/registrations - List, optionally by status (faculty, admin)
//! - POST /api/events/:id/registrations/:rid/approve - Approve (faculty, admin)
//! - POST /api/events/:id/registrations/:rid/reject - Reject (faculty, admin)
//! - DELETE /api/events/:id/registrations/:rid - Delete (admin)
//! - GET /api/students/:roll/registrations - A student's registrations

use crate::app::queries::RegistrationQuery;
use crate::app::{Caller, RegistrationRequest};
use crate::dashboard::StudentRegistration;
use crate::server::state::AppState;
use crate::types::{EventId, Registration, RegistrationId, RollNumber};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use campus_web::{ApiJson, WebResult};

/// Register for an event.
///
/// The registration starts as pending; a faculty member approves it.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events/<id>/registrations \
///   -H "X-User-Id: A2305" -H "X-User-Role: student" \
///   -H "Content-Type: application/json" \
///   -d '{"student": {"roll_number": "A2305", "name": "Asha Rao"}}'
/// ```
pub async fn register(
    State(state): State<AppState>,
    caller: Caller,
    Path(event_id): Path<EventId>,
    ApiJson(request): ApiJson<RegistrationRequest>,
) -> WebResult<(StatusCode, Json<Registration>)> {
    let registration = state.service.register(&caller, event_id, request).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

/// Registrations of an event.
pub async fn list_registrations(
    State(state): State<AppState>,
    caller: Caller,
    Path(event_id): Path<EventId>,
    Query(query): Query<RegistrationQuery>,
) -> WebResult<Json<Vec<Registration>>> {
    Ok(Json(
        state
            .service
            .registrations(&caller, event_id, query)
            .await?,
    ))
}

/// Approve a pending registration.
pub async fn approve(
    State(state): State<AppState>,
    caller: Caller,
    Path((event_id, registration_id)): Path<(EventId, RegistrationId)>,
) -> WebResult<Json<Registration>> {
    Ok(Json(
        state
            .service
            .approve_registration(&caller, event_id, registration_id)
            .await?,
    ))
}

/// Reject a pending registration.
pub async fn reject(
    State(state): State<AppState>,
    caller: Caller,
    Path((event_id, registration_id)): Path<(EventId, RegistrationId)>,
) -> WebResult<Json<Registration>> {
    Ok(Json(
        state
            .service
            .reject_registration(&caller, event_id, registration_id)
            .await?,
    ))
}

/// Delete a registration and the student's attendance.
pub async fn delete_registration(
    State(state): State<AppState>,
    caller: Caller,
    Path((event_id, registration_id)): Path<(EventId, RegistrationId)>,
) -> WebResult<StatusCode> {
    state
        .service
        .delete_registration(&caller, event_id, registration_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Registrations of a student across events.
pub async fn student_registrations(
    State(state): State<AppState>,
    _caller: Caller,
    Path(roll): Path<RollNumber>,
) -> Json<Vec<StudentRegistration>> {
    Json(state.service.student_registrations(roll).await)
}
