//! OD request endpoints.
//!
//! - POST /api/od-requests - Submit (student)
//! - GET /api/od-requests - List, newest first
//! - POST /api/od-requests/:id/approve - Approve (faculty, admin)
//! - POST /api/od-requests/:id/reject - Reject with remarks (faculty, admin)
//! - DELETE /api/od-requests/:id - Withdraw a pending request (owner)

use crate::aggregates::OdSubmission;
use crate::app::Caller;
use crate::app::queries::OdQuery;
use crate::server::state::AppState;
use crate::types::{OdRequest, OdRequestId};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use campus_web::{ApiJson, WebResult};
use serde::Deserialize;

/// Body of an approval or rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewRequest {
    /// Reviewer remarks; required when rejecting
    #[serde(default)]
    pub remarks: Option<String>,
}

/// Submit an OD request.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/od-requests \
///   -H "X-User-Id: A2305" -H "X-User-Role: student" \
///   -H "Content-Type: application/json" \
///   -d '{"roll_number": "A2305", "student_name": "Asha Rao", "event_name": "Inter-college Hackathon", ...}'
/// ```
pub async fn submit(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(submission): ApiJson<OdSubmission>,
) -> WebResult<(StatusCode, Json<OdRequest>)> {
    let request = state.service.submit_od_request(&caller, submission).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// List OD requests.
pub async fn list(
    State(state): State<AppState>,
    _caller: Caller,
    Query(query): Query<OdQuery>,
) -> Json<Vec<OdRequest>> {
    Json(state.service.od_requests(query).await)
}

/// Approve a pending request. The body is optional.
pub async fn approve(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<OdRequestId>,
    review: Option<ApiJson<ReviewRequest>>,
) -> WebResult<Json<OdRequest>> {
    let remarks = review.and_then(|ApiJson(review)| review.remarks);
    Ok(Json(
        state
            .service
            .approve_od_request(&caller, id, remarks)
            .await?,
    ))
}

/// Reject a pending request.
pub async fn reject(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<OdRequestId>,
    ApiJson(review): ApiJson<ReviewRequest>,
) -> WebResult<Json<OdRequest>> {
    Ok(Json(
        state
            .service
            .reject_od_request(&caller, id, review.remarks.unwrap_or_default())
            .await?,
    ))
}

/// Withdraw a pending request.
pub async fn withdraw(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<OdRequestId>,
) -> WebResult<StatusCode> {
    state.service.withdraw_od_request(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
