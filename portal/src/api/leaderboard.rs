//! Leaderboard endpoints. Points are derived from attendance on every call.

use crate::app::queries::{LeaderboardQuery, StudentPoints};
use crate::leaderboard::{LeaderboardEntry, LeaderboardStats};
use crate::server::state::AppState;
use crate::types::RollNumber;
use axum::{
    Json,
    extract::{Path, Query, State},
};

/// Top students by points.
///
/// ```bash
/// curl "http://localhost:8080/api/leaderboard?limit=20"
/// ```
pub async fn top(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Json<Vec<LeaderboardEntry>> {
    Json(state.service.leaderboard(query).await)
}

/// Aggregate statistics.
pub async fn stats(State(state): State<AppState>) -> Json<LeaderboardStats> {
    Json(state.service.leaderboard_stats().await)
}

/// Points, rank and badges of one student.
pub async fn student_points(
    State(state): State<AppState>,
    Path(roll): Path<RollNumber>,
) -> Json<StudentPoints> {
    Json(state.service.student_points(roll).await)
}
