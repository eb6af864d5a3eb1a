//! Role dashboards.
//!
//! Each dashboard is a read-only projection of [`PortalState`], computed on
//! demand from the same data the reducers maintain.

use crate::leaderboard::{BadgeProgress, Leaderboard};
use crate::stats::{EventStats, EventSummary};
use crate::types::{
    AttendanceRecord, AttendanceStatus, EventCategory, EventId, EventStatus, OdStatus,
    PortalState, Registration, RollNumber, School,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Number of events in the coordinator's "recent" list.
pub const RECENT_EVENTS: usize = 5;

/// Campus-wide figures for administrators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AdminDashboard {
    /// Every event
    pub total_events: usize,
    /// Events open for registration and attendance
    pub active_events: usize,
    /// Completed events
    pub completed_events: usize,
    /// Events still in draft
    pub draft_events: usize,
    /// Cancelled events
    pub cancelled_events: usize,
    /// Registrations across events
    pub total_registrations: usize,
    /// Registrations awaiting review
    pub pending_approvals: usize,
    /// Attendance records across events
    pub total_attendance: usize,
    /// Mean of the per-event attendance rates
    pub average_attendance_rate: u32,
    /// OD requests awaiting review
    pub pending_od_requests: usize,
}

impl AdminDashboard {
    /// Aggregate the whole portal.
    ///
    /// Events with no approved registration count as a 0% rate.
    #[must_use]
    pub fn compute(state: &PortalState, now: DateTime<Utc>) -> Self {
        let mut dashboard = Self {
            total_events: state.events.len(),
            ..Self::default()
        };
        let mut rate_sum: u64 = 0;

        for event in state.events.values() {
            match event.status {
                EventStatus::Draft => dashboard.draft_events += 1,
                EventStatus::Active => dashboard.active_events += 1,
                EventStatus::Completed => dashboard.completed_events += 1,
                EventStatus::Cancelled => dashboard.cancelled_events += 1,
            }

            let stats = EventStats::compute(event, now);
            dashboard.total_registrations += stats.registered;
            dashboard.pending_approvals += stats.pending;
            dashboard.total_attendance += stats.present + stats.late;
            rate_sum += u64::from(stats.attendance_rate);
        }

        dashboard.average_attendance_rate = mean_rate(rate_sum, dashboard.total_events);
        dashboard.pending_od_requests = state
            .od_requests
            .values()
            .filter(|r| r.status == OdStatus::Pending)
            .count();

        dashboard
    }
}

#[allow(clippy::cast_possible_truncation)]
fn mean_rate(sum: u64, count: usize) -> u32 {
    if count == 0 {
        return 0;
    }
    let count = count as u64;
    ((sum + count / 2) / count) as u32
}

/// Events created by one coordinator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CoordinatorDashboard {
    /// Events created by the caller
    pub total_events: usize,
    /// Events on or after today
    pub upcoming_events: usize,
    /// Events before today
    pub past_events: usize,
    /// Count per category
    pub by_category: BTreeMap<EventCategory, usize>,
    /// Count per school
    pub by_school: BTreeMap<String, usize>,
    /// Most recently created, newest first
    pub recent_events: Vec<EventSummary>,
}

impl CoordinatorDashboard {
    /// Dashboard of the events `created_by` owns, as seen on `today`.
    #[must_use]
    pub fn compute(state: &PortalState, created_by: &str, today: NaiveDate) -> Self {
        let mut owned: Vec<_> = state
            .events
            .values()
            .filter(|e| e.created_by == created_by)
            .collect();

        let mut by_category = BTreeMap::new();
        let mut by_school = BTreeMap::new();
        let mut upcoming_events = 0;

        for event in &owned {
            *by_category.entry(event.details.category).or_insert(0) += 1;
            *by_school
                .entry(event.details.school.as_str().to_string())
                .or_insert(0) += 1;
            if event.details.date >= today {
                upcoming_events += 1;
            }
        }

        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        Self {
            total_events: owned.len(),
            upcoming_events,
            past_events: owned.len() - upcoming_events,
            by_category,
            by_school,
            recent_events: owned
                .into_iter()
                .take(RECENT_EVENTS)
                .map(EventSummary::from)
                .collect(),
        }
    }
}

/// Events hosted by one school.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FacultyDashboard {
    /// The school
    pub school: School,
    /// Its events, by date
    pub events: Vec<EventSummary>,
    /// Attendance records across those events
    pub total_attendance: usize,
    /// Records with OD granted
    pub od_granted: usize,
}

impl FacultyDashboard {
    /// Dashboard for `school`.
    #[must_use]
    pub fn compute(state: &PortalState, school: &School) -> Self {
        let mut hosted: Vec<_> = state
            .events
            .values()
            .filter(|e| &e.details.school == school)
            .collect();
        hosted.sort_by_key(|e| (e.details.date, e.details.time));

        let records = hosted.iter().flat_map(|e| e.attendance.iter());
        let (total_attendance, od_granted) = records.fold((0, 0), |(total, od), record| {
            (total + 1, od + usize::from(record.od_granted()))
        });

        Self {
            school: school.clone(),
            events: hosted.into_iter().map(EventSummary::from).collect(),
            total_attendance,
            od_granted,
        }
    }
}

/// One of a student's registrations, with the event it belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StudentRegistration {
    /// Event
    pub event_id: EventId,
    /// Event title
    pub event_title: String,
    /// Day of the event
    pub event_date: NaiveDate,
    /// Event lifecycle state
    pub event_status: EventStatus,
    /// The registration itself
    pub registration: Registration,
    /// Attendance outcome, once marked
    pub attendance: Option<AttendanceStatus>,
}

/// One of a student's attendance records, with the points it earned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StudentAttendance {
    /// Event
    pub event_id: EventId,
    /// Event title
    pub event_title: String,
    /// Event category
    pub category: EventCategory,
    /// Points earned
    pub points: u32,
    /// The record
    pub record: AttendanceRecord,
}

/// Every registration of `roll`, ordered by event date.
#[must_use]
pub fn registrations_of(state: &PortalState, roll: &RollNumber) -> Vec<StudentRegistration> {
    let mut found: Vec<StudentRegistration> = state
        .events
        .values()
        .filter_map(|event| {
            event.registration_of(roll).map(|registration| StudentRegistration {
                event_id: event.id,
                event_title: event.details.title.clone(),
                event_date: event.details.date,
                event_status: event.status,
                registration: registration.clone(),
                attendance: event.attendance_of(roll).map(|r| r.status),
            })
        })
        .collect();
    found.sort_by_key(|r| r.event_date);
    found
}

/// Every attendance record of `roll`, most recent first.
#[must_use]
pub fn attendance_of(state: &PortalState, roll: &RollNumber) -> Vec<StudentAttendance> {
    let mut found: Vec<StudentAttendance> = state
        .events
        .values()
        .filter_map(|event| {
            event.attendance_of(roll).map(|record| StudentAttendance {
                event_id: event.id,
                event_title: event.details.title.clone(),
                category: event.details.category,
                points: event.details.category.points(),
                record: record.clone(),
            })
        })
        .collect();
    found.sort_by(|a, b| b.record.marked_at.cmp(&a.record.marked_at));
    found
}

/// A student's own overview.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StudentDashboard {
    /// Student
    pub roll_number: RollNumber,
    /// Registrations, by event date
    pub registrations: Vec<StudentRegistration>,
    /// Events with an attendance record
    pub events_attended: usize,
    /// On-time records
    pub present: usize,
    /// Late records
    pub late: usize,
    /// Records with OD granted
    pub od_granted: usize,
    /// Total points
    pub points: u32,
    /// Leaderboard rank; `None` without attendance
    pub rank: Option<usize>,
    /// Badge ladder
    pub badges: BadgeProgress,
}

impl StudentDashboard {
    /// Dashboard for `roll`.
    #[must_use]
    pub fn compute(state: &PortalState, roll: &RollNumber) -> Self {
        let attendance = attendance_of(state, roll);
        let leaderboard = Leaderboard::from_state(state);
        let points = leaderboard.points_of(roll);

        let count = |status: AttendanceStatus| attendance.iter().filter(|a| a.record.status == status).count();

        Self {
            roll_number: roll.clone(),
            registrations: registrations_of(state, roll),
            events_attended: attendance.len(),
            present: count(AttendanceStatus::Present),
            late: count(AttendanceStatus::Late),
            od_granted: attendance.iter().filter(|a| a.record.od_granted()).count(),
            points,
            rank: leaderboard.rank_of(roll),
            badges: BadgeProgress::for_points(points),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{
        AttendanceId, Event, EventDetails, OdRequest, OdRequestId, RegistrationId,
        RegistrationStatus, StudentProfile,
    };
    use chrono::{Duration, NaiveTime};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-10T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn event(
        title: &str,
        category: EventCategory,
        school: &str,
        date: NaiveDate,
        created_by: &str,
        created_at: DateTime<Utc>,
    ) -> Event {
        let details = EventDetails {
            title: title.to_string(),
            description: String::new(),
            category,
            school: School::parse(school).unwrap(),
            venue: "Main Hall".to_string(),
            date,
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            organizer: "Student Council".to_string(),
            max_participants: 50,
            max_team_size: 1,
            min_team_size: 1,
            registration_deadline: now() + Duration::days(1),
        };
        let mut event = Event::new(EventId::new(), details, created_by.to_string(), created_at);
        event.status = EventStatus::Active;
        event
    }

    fn register(event: &mut Event, roll: &str, status: RegistrationStatus) {
        event.registrations.push(Registration {
            id: RegistrationId::new(),
            event_id: event.id,
            student: StudentProfile {
                roll_number: roll.parse().unwrap(),
                name: format!("Student {roll}"),
                email: String::new(),
                department: "CSE".to_string(),
                year: 2,
            },
            team: None,
            od: None,
            status,
            registered_at: now(),
            reviewed_by: None,
            reviewed_at: None,
        });
    }

    fn attend(event: &mut Event, roll: &str, status: AttendanceStatus, od: bool) {
        event.attendance.push(AttendanceRecord {
            id: AttendanceId::new(),
            event_id: event.id,
            roll_number: roll.parse().unwrap(),
            student_name: format!("Student {roll}"),
            status,
            marked_at: now(),
            marked_by: "fac-01".to_string(),
            notes: None,
            od_granted_by: od.then(|| "fac-01".to_string()),
            od_granted_at: od.then(now),
        });
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn sample() -> PortalState {
        let cs = "Amity School of Computer Science";
        let law = "Amity School of Law";

        let mut hack = event("Hack", EventCategory::Hackathon, cs, day(5), "fac-01", now());
        register(&mut hack, "A001", RegistrationStatus::Approved);
        register(&mut hack, "A002", RegistrationStatus::Approved);
        register(&mut hack, "A003", RegistrationStatus::Pending);
        attend(&mut hack, "A001", AttendanceStatus::Present, true);

        let later = now() + Duration::hours(1);
        let mut talk = event("Talk", EventCategory::TechTalk, cs, day(20), "fac-01", later);
        register(&mut talk, "A001", RegistrationStatus::Approved);
        attend(&mut talk, "A001", AttendanceStatus::Late, false);

        let mut moot = event("Moot", EventCategory::Competition, law, day(12), "fac-02", now());
        moot.status = EventStatus::Draft;

        let mut state = PortalState::new();
        for e in [hack, talk, moot] {
            state.events.insert(e.id, e);
        }
        state
    }

    #[test]
    fn admin_overview() {
        let mut state = sample();
        let request = OdRequest {
            id: OdRequestId::new(),
            roll_number: "A001".parse().unwrap(),
            student_name: "Student A001".to_string(),
            email: String::new(),
            department: String::new(),
            year: 2,
            section: String::new(),
            event_id: None,
            event_name: "Hack".to_string(),
            date_from: day(5),
            date_to: day(5),
            time_from: None,
            time_to: None,
            faculty_name: String::new(),
            faculty_code: String::new(),
            subjects: Vec::new(),
            course: String::new(),
            program: String::new(),
            semester: String::new(),
            same_class_students: Vec::new(),
            team_members: Vec::new(),
            purpose: "Representing the university".to_string(),
            status: OdStatus::Pending,
            requested_at: now(),
            reviewed_at: None,
            reviewed_by: None,
            remarks: None,
        };
        state.od_requests.insert(request.id, request);

        let dashboard = AdminDashboard::compute(&state, now());
        assert_eq!(dashboard.total_events, 3);
        assert_eq!(dashboard.active_events, 2);
        assert_eq!(dashboard.draft_events, 1);
        assert_eq!(dashboard.total_registrations, 4);
        assert_eq!(dashboard.pending_approvals, 1);
        assert_eq!(dashboard.total_attendance, 2);
        // (50 + 100 + 0) / 3
        assert_eq!(dashboard.average_attendance_rate, 50);
        assert_eq!(dashboard.pending_od_requests, 1);
    }

    #[test]
    fn admin_overview_of_empty_portal() {
        assert_eq!(
            AdminDashboard::compute(&PortalState::new(), now()),
            AdminDashboard::default()
        );
    }

    #[test]
    fn coordinator_sees_own_events() {
        let dashboard = CoordinatorDashboard::compute(&sample(), "fac-01", day(10));
        assert_eq!(dashboard.total_events, 2);
        assert_eq!(dashboard.upcoming_events, 1);
        assert_eq!(dashboard.past_events, 1);
        assert_eq!(dashboard.by_category.get(&EventCategory::Hackathon), Some(&1));
        assert_eq!(
            dashboard.by_school.get("Amity School of Computer Science"),
            Some(&2)
        );
        assert_eq!(dashboard.recent_events[0].title, "Talk");

        let stranger = CoordinatorDashboard::compute(&sample(), "nobody", day(10));
        assert_eq!(stranger.total_events, 0);
        assert!(stranger.recent_events.is_empty());
    }

    #[test]
    fn faculty_dashboard_per_school() {
        let cs = School::parse("Amity School of Computer Science").unwrap();
        let dashboard = FacultyDashboard::compute(&sample(), &cs);
        let titles: Vec<&str> = dashboard.events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Hack", "Talk"]);
        assert_eq!(dashboard.total_attendance, 2);
        assert_eq!(dashboard.od_granted, 1);
    }

    #[test]
    fn student_dashboard() {
        let state = sample();
        let roll: RollNumber = "A001".parse().unwrap();
        let dashboard = StudentDashboard::compute(&state, &roll);

        assert_eq!(dashboard.registrations.len(), 2);
        assert_eq!(dashboard.registrations[0].event_title, "Hack");
        assert_eq!(
            dashboard.registrations[0].attendance,
            Some(AttendanceStatus::Present)
        );
        assert_eq!(dashboard.events_attended, 2);
        assert_eq!(dashboard.present, 1);
        assert_eq!(dashboard.late, 1);
        assert_eq!(dashboard.od_granted, 1);
        // hackathon 20 + tech talk 12
        assert_eq!(dashboard.points, 32);
        assert_eq!(dashboard.rank, Some(1));
        assert_eq!(dashboard.badges.points_needed, 18);

        let newcomer = StudentDashboard::compute(&state, &"Z999".parse().unwrap());
        assert_eq!(newcomer.points, 0);
        assert_eq!(newcomer.rank, None);
        assert!(newcomer.registrations.is_empty());
    }
}
