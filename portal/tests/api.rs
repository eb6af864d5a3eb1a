//! HTTP-level tests: routing, identity headers, status codes and bodies.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use axum::http::{StatusCode, header};
use campus_portal::app::MarkAttendanceRequest;
use campus_portal::types::{AttendanceStatus, EventCategory, EventStatus};
use common::{
    active_event, approved, csv_request, details, details_json, faculty, registration,
    registration_json, request, router, send, send_raw, service,
};
use serde_json::json;

const FACULTY: Option<(&str, &str)> = Some(("fac-01", "faculty"));
const ADMIN: Option<(&str, &str)> = Some(("admin-01", "admin"));

#[tokio::test]
async fn health_and_reference_routes_need_no_identity() {
    let app = router(service());

    let (status, _, body) = send_raw(&app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    let (status, report) = send(&app, request("GET", "/ready", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "healthy");

    let (status, schools) = send(&app, request("GET", "/api/schools", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(schools.as_array().unwrap().len(), 12);

    let (status, categories) = send(&app, request("GET", "/api/categories", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        categories
            .as_array()
            .unwrap()
            .iter()
            .any(|c| c["category"] == "hackathon" && c["points"] == 20)
    );
}

#[tokio::test]
async fn metrics_without_recorder_is_not_found() {
    let app = router(service());
    let (status, _, _) = send_raw(&app, request("GET", "/metrics", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn creating_events_checks_identity_and_role() {
    let app = router(service());

    let (status, body) = send(
        &app,
        request("POST", "/api/events", None, Some(details_json(10))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/events",
            Some(("fac-01", "dean")),
            Some(details_json(10)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/events",
            Some(("A001", "student")),
            Some(details_json(10)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, event) = send(
        &app,
        request("POST", "/api/events", FACULTY, Some(details_json(10))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(event["status"], "draft");
    assert_eq!(event["created_by"], "fac-01");
    assert_eq!(event["title"], "Inter-college Hackathon");
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let app = router(service());

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/events",
            FACULTY,
            Some(json!({"title": "Missing everything else"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_BODY");
}

#[tokio::test]
async fn unknown_event_is_not_found() {
    let app = router(service());
    let uri = format!("/api/events/{}", uuid::Uuid::new_v4());

    let (status, body) = send(&app, request("GET", &uri, None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "EVENT_NOT_FOUND");
}

#[tokio::test]
async fn empty_update_is_unprocessable() {
    let service = service();
    let event_id = active_event(&service, 10).await;
    let app = router(service);

    let (status, body) = send(
        &app,
        request(
            "PUT",
            &format!("/api/events/{event_id}"),
            FACULTY,
            Some(json!({})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, event) = send(
        &app,
        request(
            "PUT",
            &format!("/api/events/{event_id}"),
            FACULTY,
            Some(json!({"venue": "Block C Seminar Hall"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(event["venue"], "Block C Seminar Hall");
}

#[tokio::test]
async fn registration_to_leaderboard() {
    let service = service();
    let event_id = active_event(&service, 10).await;
    let app = router(service);
    let student = Some(("a2305", "student"));

    let (status, registration) = send(
        &app,
        request(
            "POST",
            &format!("/api/events/{event_id}/registrations"),
            student,
            Some(registration_json("A2305")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(registration["status"], "pending");
    let registration_id = registration["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        request(
            "POST",
            &format!("/api/events/{event_id}/registrations"),
            student,
            Some(registration_json("A2305")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_REGISTERED");

    let (status, approved) = send(
        &app,
        request(
            "POST",
            &format!("/api/events/{event_id}/registrations/{registration_id}/approve"),
            FACULTY,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");

    let mark = json!({"roll_number": "A2305", "status": "present"});
    let (status, record) = send(
        &app,
        request(
            "POST",
            &format!("/api/events/{event_id}/attendance"),
            FACULTY,
            Some(mark.clone()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["status"], "present");

    let (status, body) = send(
        &app,
        request(
            "POST",
            &format!("/api/events/{event_id}/attendance"),
            FACULTY,
            Some(mark),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_MARKED");

    let (status, stats) = send(
        &app,
        request("GET", &format!("/api/events/{event_id}/stats"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["approved"], 1);
    assert_eq!(stats["present"], 1);
    assert_eq!(stats["attendance_rate"], 100);

    let (status, board) = send(&app, request("GET", "/api/leaderboard", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board[0]["roll_number"], "A2305");
    assert_eq!(board[0]["points"], 20);
    assert_eq!(board[0]["rank"], 1);

    let (status, points) = send(
        &app,
        request("GET", "/api/students/a2305/points", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(points["points"], 20);

    let (status, history) = send(
        &app,
        request("GET", "/api/students/A2305/attendance", FACULTY, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn student_reads_need_identity() {
    let app = router(service());

    let (status, _) = send(
        &app,
        request("GET", "/api/students/A2305/registrations", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        request("GET", "/api/dashboard/student/A2305", Some(("A2305", "student")), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn attendance_export_is_csv() {
    let service = service();
    let event_id = active_event(&service, 10).await;
    let registration = service
        .register(
            &common::caller("A2305", campus_portal::types::Role::Student),
            event_id,
            registration("A2305"),
        )
        .await
        .unwrap();
    service
        .approve_registration(&faculty(), event_id, registration.id)
        .await
        .unwrap();
    let app = router(service);

    let (status, _, _) = send_raw(
        &app,
        request(
            "GET",
            &format!("/api/events/{event_id}/attendance/export"),
            Some(("A2305", "student")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, headers, body) = send_raw(
        &app,
        request(
            "GET",
            &format!("/api/events/{event_id}/attendance/export"),
            FACULTY,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    assert!(
        headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("attendance-2025-03-15")
    );
    assert!(body.starts_with("Roll Number,Name,Department,Year,Status,Marked At,Marked By\r\n"));
    assert!(body.contains("A2305,Student A2305,CSE,3,pending,N/A,N/A"));
}

#[tokio::test]
async fn sub_user_permissions_gate_event_routes() {
    let service = service();
    let event_id = active_event(&service, 10).await;
    approved(&service, event_id, &["A2305", "A2306"]).await;
    let app = router(service);
    let volunteer = Some(("A2399", "student"));
    let subusers = format!("/api/events/{event_id}/subusers");
    let attendance = format!("/api/events/{event_id}/attendance");

    let assignment = json!({
        "user_id": "A2399",
        "name": "Asha",
        "role": "volunteer",
        "permissions": {"mark_attendance": true}
    });
    let (status, sub_user) = send(
        &app,
        request("POST", &subusers, volunteer, Some(assignment.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(sub_user["code"], "FORBIDDEN");

    let (status, sub_user) = send(
        &app,
        request("POST", &subusers, FACULTY, Some(assignment.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sub_user["permissions"]["mark_attendance"], true);
    assert_eq!(sub_user["permissions"]["view_attendees"], false);
    assert_eq!(sub_user["assigned_by"], "fac-01");

    let (status, body) = send(&app, request("POST", &subusers, FACULTY, Some(assignment))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "SUB_USER_EXISTS");

    let (status, record) = send(
        &app,
        request(
            "POST",
            &attendance,
            volunteer,
            Some(json!({"roll_number": "A2305", "status": "present"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["marked_by"], "A2399");

    let (status, _) = send(&app, request("GET", &attendance, volunteer, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        request(
            "POST",
            &attendance,
            Some(("A2306", "student")),
            Some(json!({"roll_number": "A2306", "status": "present"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, events) = send(
        &app,
        request("GET", "/api/subusers/A2399/events", volunteer, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(events[0]["event_id"], event_id.to_string());
    assert_eq!(events[0]["role"], "volunteer");

    let (status, _) = send(
        &app,
        request("GET", "/api/subusers/A2399/events", Some(("A2306", "student")), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, sub_user) = send(
        &app,
        request(
            "PUT",
            &format!("{subusers}/A2399"),
            FACULTY,
            Some(json!({"permissions": {"view_attendees": true}})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sub_user["permissions"]["mark_attendance"], false);
    assert_eq!(sub_user["permissions"]["view_attendees"], true);

    let (status, roster) = send(&app, request("GET", &attendance, volunteer, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(roster.as_array().unwrap().len(), 2);

    let (status, _) = send(
        &app,
        request(
            "POST",
            &attendance,
            volunteer,
            Some(json!({"roll_number": "A2306", "status": "present"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = send_raw(
        &app,
        request("DELETE", &format!("{subusers}/A2399"), FACULTY, None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        request("DELETE", &format!("{subusers}/A2399"), FACULTY, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SUB_USER_NOT_FOUND");

    let (status, list) = send(&app, request("GET", &subusers, FACULTY, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn bulk_csv_upload_reports_rejected_rows() {
    let service = service();
    let event_id = active_event(&service, 10).await;
    approved(&service, event_id, &["A2305", "A2306"]).await;
    let app = router(service);
    let uri = format!("/api/events/{event_id}/attendance/bulk-csv");
    let upload = "Roll Number,Name,Status\n\
                  A2305,Jane,present\n\
                  a2306,Raj,late\n\
                  A2307,Pat,present\n\
                  A2305,Jane,present\n\
                  A2308,Sam,absent\n";

    let (status, _) = send(&app, csv_request(&uri, Some(("A2305", "student")), upload)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, summary) = send(&app, csv_request(&uri, FACULTY, upload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["imported"], 2);
    let rejected = summary["rejected"].as_array().unwrap();
    let lines: Vec<u64> = rejected.iter().map(|r| r["line"].as_u64().unwrap()).collect();
    assert_eq!(lines, vec![4, 5, 6]);
    assert_eq!(rejected[0]["roll_number"], "A2307");
    assert_eq!(rejected[2]["roll_number"], "A2308");

    let (status, roster) = send(
        &app,
        request("GET", &format!("/api/events/{event_id}/attendance"), FACULTY, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        roster
            .as_array()
            .unwrap()
            .iter()
            .any(|entry| entry["roll_number"] == "A2306" && entry["status"] == "late")
    );

    let (status, summary) = send(&app, csv_request(&uri, FACULTY, upload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["imported"], 0);
    assert_eq!(summary["rejected"].as_array().unwrap().len(), 5);

    let (status, body) = send(&app, csv_request(&uri, FACULTY, "name,status\nJane,present\n")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn report_export_filters_across_events() {
    let service = service();
    let hackathon = active_event(&service, 10).await;
    approved(&service, hackathon, &["A2305"]).await;

    let mut workshop_details = details(10);
    workshop_details.title = "Intro to Rust".to_string();
    workshop_details.category = EventCategory::Workshop;
    workshop_details.date += chrono::Duration::days(7);
    let workshop = service
        .create_event(&faculty(), workshop_details)
        .await
        .unwrap()
        .id;
    service
        .change_status(&faculty(), workshop, EventStatus::Active)
        .await
        .unwrap();
    approved(&service, workshop, &["A2306"]).await;

    for (event_id, roll) in [(hackathon, "A2305"), (workshop, "A2306")] {
        service
            .mark_attendance(
                &faculty(),
                event_id,
                MarkAttendanceRequest {
                    roll_number: roll.parse().unwrap(),
                    status: AttendanceStatus::Present,
                    notes: None,
                },
            )
            .await
            .unwrap();
    }
    let app = router(service);

    let (status, _, _) = send_raw(
        &app,
        request("POST", "/api/reports/export", Some(("A2305", "student")), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, headers, body) =
        send_raw(&app, request("POST", "/api/reports/export", FACULTY, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("attendance_report.csv")
    );
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(
        lines[0],
        "Event,Event Date,School,Category,Roll Number,Name,Status,Marked At,Marked By,OD Granted"
    );
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("Inter-college Hackathon,2025-03-15,"));
    assert!(lines[2].starts_with("Intro to Rust,2025-03-22,"));

    let (status, _, body) = send_raw(
        &app,
        request(
            "POST",
            "/api/reports/export",
            FACULTY,
            Some(json!({"category": "workshop", "start_date": "2025-03-01"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.lines().count(), 2);
    assert!(body.contains("A2306,Student A2306,present"));

    let (status, _, body) = send_raw(
        &app,
        request(
            "POST",
            "/api/reports/export",
            FACULTY,
            Some(json!({"start_date": "2025-03-02"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.lines().count(), 1);

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/reports/export",
            FACULTY,
            Some(json!({"start_date": "2025-03-10", "end_date": "2025-03-01"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn od_request_review() {
    let app = router(service());
    let student = Some(("A2305", "student"));
    let submission = json!({
        "roll_number": "A2305",
        "student_name": "Asha Rao",
        "event_name": "Inter-college Hackathon",
        "date_from": "2025-03-15",
        "date_to": "2025-03-16",
        "purpose": "Representing the university at the hackathon"
    });

    let (status, body) = send(
        &app,
        request("POST", "/api/od-requests", FACULTY, Some(submission.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, od) = send(
        &app,
        request("POST", "/api/od-requests", student, Some(submission)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(od["status"], "pending");
    let id = od["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        request(
            "POST",
            &format!("/api/od-requests/{id}/reject"),
            FACULTY,
            Some(json!({})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, approved) = send(
        &app,
        request("POST", &format!("/api/od-requests/{id}/approve"), ADMIN, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");

    let (status, body) = send(
        &app,
        request("DELETE", &format!("/api/od-requests/{id}"), student, None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_REVIEWED");

    let (status, list) = send(
        &app,
        request("GET", "/api/od-requests?status=approved", student, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn dashboards_are_role_gated() {
    let service = service();
    active_event(&service, 10).await;
    let app = router(service);

    let (status, _) = send(&app, request("GET", "/api/dashboard/admin", FACULTY, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, dashboard) = send(&app, request("GET", "/api/dashboard/admin", ADMIN, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["active_events"], 1);

    let (status, dashboard) =
        send(&app, request("GET", "/api/dashboard/coordinator", FACULTY, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["total_events"], 1);

    let (status, _) = send(
        &app,
        request(
            "GET",
            "/api/dashboard/faculty?school=Amity%20School%20of%20Engineering%20%26%20Technology",
            Some(("A001", "student")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
