//! Router configuration for the portal.

use super::health::{health_check, metrics, readiness_check};
use super::state::AppState;
use crate::api::{
    attendance, dashboard, events, leaderboard, od_requests, registrations, reports, sub_users,
};
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use campus_web::correlation_id_layer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the complete Axum router.
///
/// Everything except health, readiness and metrics lives under `/api`.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Reference data
        .route("/schools", get(events::list_schools))
        .route("/categories", get(events::list_categories))
        // Event management
        .route(
            "/events",
            post(events::create_event).get(events::list_events),
        )
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/:id/status", post(events::change_status))
        .route("/events/:id/stats", get(events::event_stats))
        .route("/events/:id/checkin", get(events::checkin))
        // Registrations
        .route(
            "/events/:id/registrations",
            post(registrations::register).get(registrations::list_registrations),
        )
        .route(
            "/events/:id/registrations/:rid",
            delete(registrations::delete_registration),
        )
        .route(
            "/events/:id/registrations/:rid/approve",
            post(registrations::approve),
        )
        .route(
            "/events/:id/registrations/:rid/reject",
            post(registrations::reject),
        )
        // Attendance
        .route(
            "/events/:id/attendance",
            post(attendance::mark).get(attendance::roster),
        )
        .route("/events/:id/attendance/mark-all", post(attendance::mark_all))
        .route("/events/:id/attendance/bulk-csv", post(attendance::bulk_csv))
        .route("/events/:id/attendance/export", get(attendance::export))
        .route("/events/:id/attendance/:aid", delete(attendance::remove))
        .route("/events/:id/attendance/:aid/od", post(attendance::grant_od))
        // Sub-users
        .route(
            "/events/:id/subusers",
            post(sub_users::assign).get(sub_users::list),
        )
        .route(
            "/events/:id/subusers/:user_id",
            put(sub_users::update).delete(sub_users::remove),
        )
        .route("/subusers/:user_id/events", get(sub_users::events_of))
        // Reports
        .route("/reports/export", post(reports::export))
        // Students
        .route(
            "/students/:roll/registrations",
            get(registrations::student_registrations),
        )
        .route(
            "/students/:roll/attendance",
            get(attendance::student_attendance),
        )
        .route("/students/:roll/points", get(leaderboard::student_points))
        // OD requests
        .route(
            "/od-requests",
            post(od_requests::submit).get(od_requests::list),
        )
        .route("/od-requests/:id", delete(od_requests::withdraw))
        .route("/od-requests/:id/approve", post(od_requests::approve))
        .route("/od-requests/:id/reject", post(od_requests::reject))
        // Leaderboard
        .route("/leaderboard", get(leaderboard::top))
        .route("/leaderboard/stats", get(leaderboard::stats))
        // Dashboards
        .route("/dashboard/admin", get(dashboard::admin))
        .route("/dashboard/coordinator", get(dashboard::coordinator))
        .route("/dashboard/faculty", get(dashboard::faculty))
        .route("/dashboard/student/:roll", get(dashboard::student));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(correlation_id_layer())
        .with_state(state)
}
