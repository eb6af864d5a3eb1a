//! Property tests: random command sequences never break the portal invariants.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use campus_portal::app::{MarkAttendanceRequest, PortalService};
use campus_portal::types::{AttendanceStatus, EventId, RegistrationStatus, Role};
use common::{active_event, caller, faculty, registration, service};
use proptest::prelude::*;
use std::collections::HashSet;

const CAPACITY: u32 = 3;
const STUDENTS: usize = 6;

#[derive(Clone, Debug)]
enum Op {
    Register(usize),
    Approve(usize),
    Reject(usize),
    Mark(usize, bool),
    MarkAll,
    Delete(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..STUDENTS).prop_map(Op::Register),
        (0..STUDENTS).prop_map(Op::Approve),
        (0..STUDENTS).prop_map(Op::Reject),
        ((0..STUDENTS), any::<bool>()).prop_map(|(i, late)| Op::Mark(i, late)),
        Just(Op::MarkAll),
        (0..STUDENTS).prop_map(Op::Delete),
    ]
}

fn roll(i: usize) -> String {
    format!("S{i:02}")
}

async fn apply(service: &PortalService, event_id: EventId, op: Op) {
    let admin = caller("admin-01", Role::Admin);
    let registration_id = |i: usize| {
        let service = service.clone();
        async move {
            service
                .event(event_id)
                .await
                .unwrap()
                .registration_of(&roll(i).parse().unwrap())
                .map(|r| r.id)
        }
    };

    // Refusals are expected; only the resulting state is checked.
    match op {
        Op::Register(i) => {
            let _ = service
                .register(&caller(&roll(i), Role::Student), event_id, registration(&roll(i)))
                .await;
        },
        Op::Approve(i) => {
            if let Some(id) = registration_id(i).await {
                let _ = service.approve_registration(&faculty(), event_id, id).await;
            }
        },
        Op::Reject(i) => {
            if let Some(id) = registration_id(i).await {
                let _ = service.reject_registration(&faculty(), event_id, id).await;
            }
        },
        Op::Mark(i, late) => {
            let request = MarkAttendanceRequest {
                roll_number: roll(i).parse().unwrap(),
                status: if late {
                    AttendanceStatus::Late
                } else {
                    AttendanceStatus::Present
                },
                notes: None,
            };
            let _ = service.mark_attendance(&faculty(), event_id, request).await;
        },
        Op::MarkAll => {
            let _ = service.mark_all_present(&faculty(), event_id).await;
        },
        Op::Delete(i) => {
            if let Some(id) = registration_id(i).await {
                let _ = service.delete_registration(&admin, event_id, id).await;
            }
        },
    }
}

proptest! {
    #[test]
    fn prop_portal_invariants_hold(ops in prop::collection::vec(op(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let (event, total_points) = runtime.block_on(async {
            let service = service();
            let event_id = active_event(&service, CAPACITY).await;
            for op in ops {
                apply(&service, event_id, op).await;
            }
            let event = service.event(event_id).await.unwrap();
            let stats = service.leaderboard_stats().await;
            (event, stats.total_points)
        });

        // Capacity
        prop_assert!(event.approved_count() <= CAPACITY as usize);

        // One registration per student
        let rolls: HashSet<_> = event.registrations.iter().map(|r| &r.student.roll_number).collect();
        prop_assert_eq!(rolls.len(), event.registrations.len());

        // One attendance record per student, each backed by an approved registration
        let marked: HashSet<_> = event.attendance.iter().map(|a| &a.roll_number).collect();
        prop_assert_eq!(marked.len(), event.attendance.len());
        for record in &event.attendance {
            let registration = event.registration_of(&record.roll_number);
            prop_assert!(registration.is_some_and(|r| r.status == RegistrationStatus::Approved));
        }

        // Hackathon attendance is worth 20 points each
        prop_assert_eq!(total_points, 20 * event.attendance.len() as u64);
    }
}
