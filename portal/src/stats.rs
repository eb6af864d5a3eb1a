//! Per-event statistics.
//!
//! Pure aggregation over an event's registrations and attendance. Nothing is
//! cached: the numbers are recomputed on every read, and the same event and
//! instant always yield the same output.

use crate::types::{
    AttendanceStatus, Event, EventCategory, EventId, EventStatus, RegistrationStatus, School,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

/// Counts and rates for one event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EventStats {
    /// All registrations
    pub registered: usize,
    /// Approved registrations
    pub approved: usize,
    /// Pending registrations
    pub pending: usize,
    /// Rejected registrations
    pub rejected: usize,
    /// Present records
    pub present: usize,
    /// Late records
    pub late: usize,
    /// Approved students without a record
    pub absent: usize,
    /// Rounded percentage of approved students that attended
    pub attendance_rate: u32,
    /// Places left before capacity
    pub spots_remaining: usize,
    /// Rounded percentage of capacity taken by approved registrations
    pub fill_rate: u32,
    /// Active and before the deadline
    pub registration_open: bool,
}

impl EventStats {
    /// Compute the statistics of `event` as seen at `now`.
    #[must_use]
    pub fn compute(event: &Event, now: DateTime<Utc>) -> Self {
        let mut stats = Self {
            registered: event.registrations.len(),
            ..Self::default()
        };

        for registration in &event.registrations {
            match registration.status {
                RegistrationStatus::Approved => stats.approved += 1,
                RegistrationStatus::Pending => stats.pending += 1,
                RegistrationStatus::Rejected => stats.rejected += 1,
            }
        }

        for record in &event.attendance {
            match record.status {
                AttendanceStatus::Present => stats.present += 1,
                AttendanceStatus::Late => stats.late += 1,
            }
        }

        let attended = stats.present + stats.late;
        let capacity = event.details.max_participants as usize;

        stats.absent = stats.approved.saturating_sub(attended);
        stats.attendance_rate = percent(attended, stats.approved);
        stats.spots_remaining = capacity.saturating_sub(stats.approved);
        stats.fill_rate = percent(stats.approved, capacity);
        stats.registration_open =
            event.status == EventStatus::Active && now < event.details.registration_deadline;

        stats
    }
}

/// An event as listed: its details without the nested collections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    /// Identifier
    pub id: EventId,
    /// Title
    pub title: String,
    /// Category
    pub category: EventCategory,
    /// Hosting school
    pub school: School,
    /// Venue
    pub venue: String,
    /// Day of the event
    pub date: NaiveDate,
    /// Start time
    pub time: NaiveTime,
    /// Lifecycle state
    pub status: EventStatus,
    /// Capacity
    pub max_participants: u32,
    /// All registrations
    pub registered: usize,
    /// Approved registrations
    pub approved: usize,
    /// Attendance records
    pub attended: usize,
    /// Creator
    pub created_by: String,
    /// Creation instant
    pub created_at: DateTime<Utc>,
}

impl From<&Event> for EventSummary {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            title: event.details.title.clone(),
            category: event.details.category,
            school: event.details.school.clone(),
            venue: event.details.venue.clone(),
            date: event.details.date,
            time: event.details.time,
            status: event.status,
            max_participants: event.details.max_participants,
            registered: event.registrations.len(),
            approved: event.approved_count(),
            attended: event.attendance.len(),
            created_by: event.created_by.clone(),
            created_at: event.created_at,
        }
    }
}

/// `round(part / whole * 100)`, 0 when `whole` is 0.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
#[must_use]
pub fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{
        AttendanceId, AttendanceRecord, EventCategory, EventDetails, EventId, Registration,
        RegistrationId, School, StudentProfile,
    };
    use chrono::{Duration, NaiveDate, NaiveTime};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn event(max_participants: u32) -> Event {
        let details = EventDetails {
            title: "Hack Night".to_string(),
            description: String::new(),
            category: EventCategory::Hackathon,
            school: School::parse("Amity School of Computer Science").unwrap(),
            venue: "Block C".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 20).unwrap(),
            time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            organizer: "ACM".to_string(),
            max_participants,
            max_team_size: 4,
            min_team_size: 1,
            registration_deadline: now() + Duration::days(2),
        };
        let mut event = Event::new(EventId::new(), details, "fac-01".to_string(), now());
        event.status = EventStatus::Active;
        event
    }

    fn add(
        event: &mut Event,
        roll: &str,
        status: RegistrationStatus,
        mark: Option<AttendanceStatus>,
    ) {
        let roll_number: crate::types::RollNumber = roll.parse().unwrap();
        event.registrations.push(Registration {
            id: RegistrationId::new(),
            event_id: event.id,
            student: StudentProfile {
                roll_number: roll_number.clone(),
                name: roll.to_string(),
                email: String::new(),
                department: String::new(),
                year: 1,
            },
            team: None,
            od: None,
            status,
            registered_at: now(),
            reviewed_by: None,
            reviewed_at: None,
        });
        if let Some(status) = mark {
            event.attendance.push(AttendanceRecord {
                id: AttendanceId::new(),
                event_id: event.id,
                roll_number,
                student_name: roll.to_string(),
                status,
                marked_at: now(),
                marked_by: "fac-01".to_string(),
                notes: None,
                od_granted_by: None,
                od_granted_at: None,
            });
        }
    }

    #[test]
    fn empty_event() {
        let stats = EventStats::compute(&event(10), now());
        assert_eq!(stats.registered, 0);
        assert_eq!(stats.attendance_rate, 0);
        assert_eq!(stats.spots_remaining, 10);
        assert_eq!(stats.fill_rate, 0);
        assert!(stats.registration_open);
    }

    #[test]
    fn counts_and_rates() {
        let mut e = event(4);
        add(&mut e, "A1", RegistrationStatus::Approved, Some(AttendanceStatus::Present));
        add(&mut e, "A2", RegistrationStatus::Approved, Some(AttendanceStatus::Late));
        add(&mut e, "A3", RegistrationStatus::Approved, None);
        add(&mut e, "A4", RegistrationStatus::Pending, None);
        add(&mut e, "A5", RegistrationStatus::Rejected, None);

        let stats = EventStats::compute(&e, now());
        assert_eq!(stats.registered, 5);
        assert_eq!(stats.approved, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.present, 1);
        assert_eq!(stats.late, 1);
        assert_eq!(stats.absent, 1);
        // 2 / 3 = 66.67
        assert_eq!(stats.attendance_rate, 67);
        assert_eq!(stats.spots_remaining, 1);
        assert_eq!(stats.fill_rate, 75);
    }

    #[test]
    fn registration_closes_at_deadline() {
        let e = event(4);
        let deadline = e.details.registration_deadline;
        assert!(EventStats::compute(&e, deadline - Duration::seconds(1)).registration_open);
        assert!(!EventStats::compute(&e, deadline).registration_open);

        let mut draft = e;
        draft.status = EventStatus::Draft;
        assert!(!EventStats::compute(&draft, now()).registration_open);
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(5, 5), 100);
    }

    proptest! {
        #[test]
        fn stats_are_consistent(
            marks in proptest::collection::vec(0u8..5, 0..40),
            capacity in 1u32..50,
        ) {
            let mut e = event(capacity);
            for (i, m) in marks.iter().enumerate() {
                let roll = format!("R{i:03}");
                match m {
                    0 => add(&mut e, &roll, RegistrationStatus::Pending, None),
                    1 => add(&mut e, &roll, RegistrationStatus::Rejected, None),
                    2 => add(&mut e, &roll, RegistrationStatus::Approved, None),
                    3 => add(&mut e, &roll, RegistrationStatus::Approved, Some(AttendanceStatus::Present)),
                    _ => add(&mut e, &roll, RegistrationStatus::Approved, Some(AttendanceStatus::Late)),
                }
            }

            let first = EventStats::compute(&e, now());
            let second = EventStats::compute(&e, now());
            prop_assert_eq!(first, second);

            prop_assert_eq!(first.registered, first.approved + first.pending + first.rejected);
            prop_assert_eq!(first.approved, first.present + first.late + first.absent);
            prop_assert!(first.attendance_rate <= 100);
        }
    }
}
