//! Event management endpoints.
//!
//! - POST /api/events - Create a draft event (faculty, admin)
//! - GET /api/events - List events with filters
//! - GET /api/events/:id - Event details
//! - PUT /api/events/:id - Partial update (faculty, admin)
//! - DELETE /api/events/:id - Delete with registrations and attendance (faculty, admin)
//! - POST /api/events/:id/status - Lifecycle transition (faculty, admin)
//! - GET /api/events/:id/stats - Event statistics
//! - GET /api/events/:id/checkin - Check-in URL
//! - GET /api/schools, GET /api/categories - Reference lists

use crate::app::Caller;
use crate::app::queries::{self, CategoryInfo, CheckIn, EventQuery};
use crate::server::state::AppState;
use crate::stats::{EventStats, EventSummary};
use crate::types::{Event, EventDetails, EventId, EventStatus, EventUpdate};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use campus_web::{ApiJson, WebResult};
use serde::Deserialize;

/// Body of a status change.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    /// Target status
    pub status: EventStatus,
}

/// Create a new event.
///
/// The caller becomes its creator; the event starts as a draft.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events \
///   -H "X-User-Id: fac-01" -H "X-User-Role: faculty" \
///   -H "Content-Type: application/json" \
///   -d '{"title": "Rust Workshop", "category": "workshop", ...}'
/// ```
pub async fn create_event(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(details): ApiJson<EventDetails>,
) -> WebResult<(StatusCode, Json<Event>)> {
    let event = state.service.create_event(&caller, details).await?;
    tracing::info!(event_id = %event.id, created_by = %caller.user_id, "Event created");
    Ok((StatusCode::CREATED, Json(event)))
}

/// List events, by date then time.
///
/// ```bash
/// curl "http://localhost:8080/api/events?category=hackathon&status=active&limit=20"
/// ```
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Json<Vec<EventSummary>> {
    Json(state.service.list_events(query).await)
}

/// Event details with registrations and attendance.
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> WebResult<Json<Event>> {
    Ok(Json(state.service.event(id).await?))
}

/// Update some fields of an event.
pub async fn update_event(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<EventId>,
    ApiJson(update): ApiJson<EventUpdate>,
) -> WebResult<Json<Event>> {
    Ok(Json(state.service.update_event(&caller, id, update).await?))
}

/// Delete an event.
pub async fn delete_event(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<EventId>,
) -> WebResult<StatusCode> {
    state.service.delete_event(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Move an event through its lifecycle.
pub async fn change_status(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<EventId>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> WebResult<Json<Event>> {
    Ok(Json(
        state
            .service
            .change_status(&caller, id, request.status)
            .await?,
    ))
}

/// Registration and attendance statistics.
pub async fn event_stats(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> WebResult<Json<EventStats>> {
    Ok(Json(state.service.event_stats(id).await?))
}

/// Check-in URL of an event.
pub async fn checkin(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> WebResult<Json<CheckIn>> {
    Ok(Json(state.service.checkin(id).await?))
}

/// The schools events can belong to.
#[allow(clippy::unused_async)]
pub async fn list_schools() -> Json<Vec<&'static str>> {
    Json(queries::schools())
}

/// Event categories and their points.
#[allow(clippy::unused_async)]
pub async fn list_categories() -> Json<Vec<CategoryInfo>> {
    Json(queries::categories())
}
