//! Fixtures shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use campus_core::environment::Clock;
use campus_portal::aggregates::PortalEnvironment;
use campus_portal::app::{Caller, PortalService, RegistrationRequest};
use campus_portal::types::{
    EventCategory, EventDetails, EventId, EventStatus, PortalState, Role, School, StudentProfile,
};
use campus_portal::{AppState, Config, build_router};
use campus_testing::{FixedClock, InMemoryEventStore};
use campus_web::Identity;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

/// "Now" for every integration test.
pub fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-03-01T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub fn clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::new(now()))
}

pub fn service() -> PortalService {
    let env = PortalEnvironment::new(clock(), Arc::new(InMemoryEventStore::new()));
    PortalService::with_state(PortalState::new(), env, Config::default().portal)
}

pub fn router(service: PortalService) -> Router {
    build_router(AppState::new(service, None))
}

pub fn caller(user_id: &str, role: Role) -> Caller {
    Identity {
        user_id: user_id.to_string(),
        role,
    }
}

pub fn faculty() -> Caller {
    caller("fac-01", Role::Faculty)
}

pub fn details(max_participants: u32) -> EventDetails {
    EventDetails {
        title: "Inter-college Hackathon".to_string(),
        description: "24 hours of building".to_string(),
        category: EventCategory::Hackathon,
        school: School::parse("Amity School of Engineering & Technology").unwrap(),
        venue: "Main Auditorium".to_string(),
        date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
        time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        organizer: "ACM Chapter".to_string(),
        max_participants,
        max_team_size: 4,
        min_team_size: 1,
        registration_deadline: now() + chrono::Duration::days(5),
    }
}

pub fn details_json(max_participants: u32) -> Value {
    serde_json::to_value(details(max_participants)).unwrap()
}

pub fn student(roll: &str) -> StudentProfile {
    StudentProfile {
        roll_number: roll.parse().unwrap(),
        name: format!("Student {roll}"),
        email: format!("{}@campus.edu", roll.to_lowercase()),
        department: "CSE".to_string(),
        year: 3,
    }
}

pub fn registration(roll: &str) -> RegistrationRequest {
    RegistrationRequest {
        student: student(roll),
        team: None,
        od: None,
    }
}

pub fn registration_json(roll: &str) -> Value {
    json!({ "student": serde_json::to_value(student(roll)).unwrap() })
}

/// Create an event and open it for registration.
pub async fn active_event(service: &PortalService, capacity: u32) -> EventId {
    let event = service
        .create_event(&faculty(), details(capacity))
        .await
        .unwrap();
    service
        .change_status(&faculty(), event.id, EventStatus::Active)
        .await
        .unwrap();
    event.id
}

/// Register and approve each roll number for `event_id`.
pub async fn approved(service: &PortalService, event_id: EventId, rolls: &[&str]) {
    for roll in rolls {
        let registration = service
            .register(&caller(roll, Role::Student), event_id, registration(roll))
            .await
            .unwrap();
        service
            .approve_registration(&faculty(), event_id, registration.id)
            .await
            .unwrap();
    }
}

/// Build a request, optionally with identity headers and a JSON body.
pub fn request(method: &str, uri: &str, identity: Option<(&str, &str)>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((user_id, role)) = identity {
        builder = builder.header("X-User-Id", user_id).header("X-User-Role", role);
    }
    match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Build a request carrying a CSV body.
pub fn csv_request(uri: &str, identity: Option<(&str, &str)>, csv: &str) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some((user_id, role)) = identity {
        builder = builder.header("X-User-Id", user_id).header("X-User-Role", role);
    }
    builder
        .header("Content-Type", "text/csv")
        .body(Body::from(csv.to_string()))
        .unwrap()
}

/// Send a request and return the status with the raw body.
pub async fn send_raw(router: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Send a request and parse the JSON body (`null` when empty).
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send_raw(router, request).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&body).unwrap()
    };
    (status, value)
}
