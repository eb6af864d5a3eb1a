//! Event sub-user endpoints (faculty, admin).
//!
//! - POST /api/events/:id/subusers - Assign a helper with permissions
//! - GET /api/events/:id/subusers - Helpers of an event
//! - PUT /api/events/:id/subusers/:user_id - Replace a helper's permissions
//! - DELETE /api/events/:id/subusers/:user_id - Take a helper off the event
//! - GET /api/subusers/:user_id/events - Events a user helps run (staff or the user)

use crate::aggregates::event::SubUserAssignment;
use crate::app::Caller;
use crate::app::queries::SubUserEvent;
use crate::server::state::AppState;
use crate::types::{EventId, SubUser, SubUserPermissions};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use campus_web::{ApiJson, WebResult};
use serde::Deserialize;

/// Body of a permission update.
#[derive(Debug, Deserialize)]
pub struct PermissionsRequest {
    /// The full new permission set
    pub permissions: SubUserPermissions,
}

/// Assign a sub-user to an event.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events/<id>/subusers \
///   -H "X-User-Id: fac-01" -H "X-User-Role: faculty" \
///   -H "Content-Type: application/json" \
///   -d '{"user_id": "A2305", "name": "Asha", "role": "volunteer",
///        "permissions": {"mark_attendance": true}}'
/// ```
pub async fn assign(
    State(state): State<AppState>,
    caller: Caller,
    Path(event_id): Path<EventId>,
    ApiJson(assignment): ApiJson<SubUserAssignment>,
) -> WebResult<(StatusCode, Json<SubUser>)> {
    let sub_user = state
        .service
        .assign_sub_user(&caller, event_id, assignment)
        .await?;
    Ok((StatusCode::CREATED, Json(sub_user)))
}

/// Sub-users of an event.
pub async fn list(
    State(state): State<AppState>,
    caller: Caller,
    Path(event_id): Path<EventId>,
) -> WebResult<Json<Vec<SubUser>>> {
    Ok(Json(state.service.sub_users(&caller, event_id).await?))
}

/// Replace a sub-user's permissions.
pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path((event_id, user_id)): Path<(EventId, String)>,
    ApiJson(request): ApiJson<PermissionsRequest>,
) -> WebResult<Json<SubUser>> {
    Ok(Json(
        state
            .service
            .update_sub_user(&caller, event_id, user_id, request.permissions)
            .await?,
    ))
}

/// Remove a sub-user from an event.
pub async fn remove(
    State(state): State<AppState>,
    caller: Caller,
    Path((event_id, user_id)): Path<(EventId, String)>,
) -> WebResult<StatusCode> {
    state
        .service
        .remove_sub_user(&caller, event_id, user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Events a user helps run.
pub async fn events_of(
    State(state): State<AppState>,
    caller: Caller,
    Path(user_id): Path<String>,
) -> WebResult<Json<Vec<SubUserEvent>>> {
    Ok(Json(state.service.sub_user_events(&caller, user_id).await?))
}
