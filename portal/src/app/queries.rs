//! Read side of the portal.
//!
//! Queries run under the store's read lock and never touch the event log.

use super::services::{
    Caller, PortalService, require_admin, require_event_permission, require_staff,
};
use crate::dashboard::{
    AdminDashboard, CoordinatorDashboard, FacultyDashboard, StudentAttendance, StudentDashboard,
    StudentRegistration, attendance_of, registrations_of,
};
use crate::error::PortalError;
use crate::export::{REPORT_FILENAME, ReportFilter, attendance_csv, attendance_report_csv};
use crate::leaderboard::{BadgeProgress, Leaderboard, LeaderboardEntry, LeaderboardStats};
use crate::stats::{EventStats, EventSummary};
use crate::types::{
    AttendanceRecord, AttendanceStatus, Event, EventCategory, EventId, EventStatus, OdRequest,
    OdStatus, Permission, Registration, RegistrationId, RegistrationStatus, RollNumber, SCHOOLS,
    School, SubUser, SubUserPermissions, SubUserRole,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default number of OD requests returned.
pub const OD_DEFAULT_LIMIT: usize = 100;

/// Filters for the event list.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EventQuery {
    /// Hosting school
    pub school: Option<School>,
    /// Category
    pub category: Option<EventCategory>,
    /// Lifecycle state
    pub status: Option<EventStatus>,
    /// Events on or after this day
    pub from: Option<NaiveDate>,
    /// Events on or before this day
    pub to: Option<NaiveDate>,
    /// Page size; capped by configuration
    pub limit: Option<usize>,
}

/// Filter for an event's registrations.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct RegistrationQuery {
    /// Only registrations in this state
    pub status: Option<RegistrationStatus>,
}

/// Attendance state of a roster line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RosterStatus {
    /// Marked present
    Present,
    /// Marked late
    Late,
    /// Not marked yet
    Pending,
}

impl From<Option<&AttendanceRecord>> for RosterStatus {
    fn from(record: Option<&AttendanceRecord>) -> Self {
        match record.map(|r| r.status) {
            Some(AttendanceStatus::Present) => Self::Present,
            Some(AttendanceStatus::Late) => Self::Late,
            None => Self::Pending,
        }
    }
}

/// Filters for the attendance roster.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RosterQuery {
    /// Case-insensitive match on roll number or name
    pub search: Option<String>,
    /// Only lines in this state
    pub status: Option<RosterStatus>,
}

/// One approved student on the attendance roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    /// Registration
    pub registration_id: RegistrationId,
    /// Student
    pub roll_number: RollNumber,
    /// Name
    pub name: String,
    /// Department
    pub department: String,
    /// Year of study
    pub year: u8,
    /// Attendance state
    pub status: RosterStatus,
    /// The record, once marked
    pub attendance: Option<AttendanceRecord>,
}

/// Filters for OD requests.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct OdQuery {
    /// Only requests in this state
    pub status: Option<OdStatus>,
    /// Only requests of this student
    pub roll: Option<RollNumber>,
    /// Page size
    pub limit: Option<usize>,
}

/// Page size of the leaderboard.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    /// Number of entries
    pub limit: Option<usize>,
}

/// School filter of the faculty dashboard.
#[derive(Clone, Debug, Deserialize)]
pub struct SchoolQuery {
    /// The school
    pub school: School,
}

/// Where students check in for an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckIn {
    /// Event
    pub event_id: EventId,
    /// Event title
    pub title: String,
    /// URL to encode in the check-in code
    pub url: String,
}

/// A category with the points it is worth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryInfo {
    /// Category
    pub category: EventCategory,
    /// Points per attendance
    pub points: u32,
}

/// A student's points and badge ladder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StudentPoints {
    /// Student
    pub roll_number: RollNumber,
    /// Total points
    pub points: u32,
    /// Leaderboard rank; `None` without attendance
    pub rank: Option<usize>,
    /// Attended events
    pub events_attended: usize,
    /// Badges
    pub badges: BadgeProgress,
}

/// An event a user helps run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubUserEvent {
    /// Event
    pub event_id: EventId,
    /// Event title
    pub title: String,
    /// Event day
    pub date: NaiveDate,
    /// Lifecycle state
    pub status: EventStatus,
    /// Helper role on the event
    pub role: SubUserRole,
    /// Permissions on the event
    pub permissions: SubUserPermissions,
}

/// An attendance sheet ready to download.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttendanceExport {
    /// Suggested file name
    pub filename: String,
    /// CSV body
    pub csv: String,
}

/// Every school, in display order.
#[must_use]
pub fn schools() -> Vec<&'static str> {
    SCHOOLS.to_vec()
}

/// Every category with its points.
#[must_use]
pub fn categories() -> Vec<CategoryInfo> {
    EventCategory::ALL
        .into_iter()
        .map(|category| CategoryInfo {
            category,
            points: category.points(),
        })
        .collect()
}

fn event_or_not_found(
    state: &crate::types::PortalState,
    id: EventId,
) -> Result<&Event, PortalError> {
    state.event(&id).ok_or(PortalError::EventNotFound(id))
}

impl PortalService {
    /// Events matching `query`, by date then time.
    pub async fn list_events(&self, query: EventQuery) -> Vec<EventSummary> {
        let config = self.config();
        let limit = query
            .limit
            .unwrap_or(config.events_default_limit)
            .min(config.events_max_limit);

        self.read(move |state| {
            let mut events: Vec<&Event> = state
                .events
                .values()
                .filter(|e| query.school.as_ref().is_none_or(|s| &e.details.school == s))
                .filter(|e| query.category.is_none_or(|c| e.details.category == c))
                .filter(|e| query.status.is_none_or(|s| e.status == s))
                .filter(|e| query.from.is_none_or(|d| e.details.date >= d))
                .filter(|e| query.to.is_none_or(|d| e.details.date <= d))
                .collect();
            events.sort_by_key(|e| (e.details.date, e.details.time, e.id));
            events
                .into_iter()
                .take(limit)
                .map(EventSummary::from)
                .collect()
        })
        .await
    }

    /// One event with its registrations and attendance.
    ///
    /// # Errors
    ///
    /// [`PortalError::EventNotFound`].
    pub async fn event(&self, id: EventId) -> Result<Event, PortalError> {
        self.read(move |state| event_or_not_found(state, id).cloned())
            .await
    }

    /// Statistics of an event as of now.
    ///
    /// # Errors
    ///
    /// [`PortalError::EventNotFound`].
    pub async fn event_stats(&self, id: EventId) -> Result<EventStats, PortalError> {
        let now = self.clock().now();
        self.read(move |state| event_or_not_found(state, id).map(|e| EventStats::compute(e, now)))
            .await
    }

    /// Check-in URL of an event.
    ///
    /// # Errors
    ///
    /// [`PortalError::EventNotFound`].
    pub async fn checkin(&self, id: EventId) -> Result<CheckIn, PortalError> {
        let base = self.config().checkin_base_url.clone();
        self.read(move |state| {
            event_or_not_found(state, id).map(|event| CheckIn {
                event_id: id,
                title: event.details.title.clone(),
                url: format!("{base}/{id}"),
            })
        })
        .await
    }

    /// Registrations of an event.
    ///
    /// # Errors
    ///
    /// Forbidden for students without the `view_attendees` permission;
    /// [`PortalError::EventNotFound`].
    pub async fn registrations(
        &self,
        caller: &Caller,
        id: EventId,
        query: RegistrationQuery,
    ) -> Result<Vec<Registration>, PortalError> {
        self.read(move |state| {
            require_event_permission(state, caller, id, Permission::ViewAttendees)?;
            event_or_not_found(state, id).map(|event| {
                event
                    .registrations
                    .iter()
                    .filter(|r| query.status.is_none_or(|s| r.status == s))
                    .cloned()
                    .collect()
            })
        })
        .await
    }

    /// Approved students with their attendance state.
    ///
    /// # Errors
    ///
    /// Forbidden for students without the `view_attendees` permission;
    /// [`PortalError::EventNotFound`].
    pub async fn roster(
        &self,
        caller: &Caller,
        id: EventId,
        query: RosterQuery,
    ) -> Result<Vec<RosterEntry>, PortalError> {
        let needle = query
            .search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        self.read(move |state| -> Result<Vec<RosterEntry>, PortalError> {
            require_event_permission(state, caller, id, Permission::ViewAttendees)?;
            let event = event_or_not_found(state, id)?;
            Ok(event
                .registrations
                .iter()
                .filter(|r| r.status == RegistrationStatus::Approved)
                .filter(|r| {
                    needle.as_ref().is_none_or(|n| {
                        r.student.roll_number.as_str().to_lowercase().contains(n)
                            || r.student.name.to_lowercase().contains(n)
                    })
                })
                .map(|r| {
                    let record = event.attendance_of(&r.student.roll_number);
                    RosterEntry {
                        registration_id: r.id,
                        roll_number: r.student.roll_number.clone(),
                        name: r.student.name.clone(),
                        department: r.student.department.clone(),
                        year: r.student.year,
                        status: RosterStatus::from(record),
                        attendance: record.cloned(),
                    }
                })
                .filter(|entry| query.status.is_none_or(|s| entry.status == s))
                .collect())
        })
        .await
    }

    /// The attendance sheet of an event as CSV.
    ///
    /// # Errors
    ///
    /// Forbidden for students without the `view_attendees` permission;
    /// [`PortalError::EventNotFound`].
    pub async fn attendance_export(
        &self,
        caller: &Caller,
        id: EventId,
    ) -> Result<AttendanceExport, PortalError> {
        self.read(move |state| {
            require_event_permission(state, caller, id, Permission::ViewAttendees)?;
            event_or_not_found(state, id).map(|event| AttendanceExport {
                filename: format!("attendance-{}-{}.csv", event.details.date, id),
                csv: attendance_csv(event),
            })
        })
        .await
    }

    /// Recorded attendance across events as one CSV.
    ///
    /// # Errors
    ///
    /// Forbidden for students; an inverted date range.
    pub async fn attendance_report(
        &self,
        caller: &Caller,
        filter: ReportFilter,
    ) -> Result<AttendanceExport, PortalError> {
        require_staff(caller)?;
        filter.validate()?;
        let csv = self
            .read(move |state| attendance_report_csv(state, &filter))
            .await;
        Ok(AttendanceExport {
            filename: REPORT_FILENAME.to_string(),
            csv,
        })
    }

    /// Sub-users of an event.
    ///
    /// # Errors
    ///
    /// Forbidden for students; [`PortalError::EventNotFound`].
    pub async fn sub_users(
        &self,
        caller: &Caller,
        id: EventId,
    ) -> Result<Vec<SubUser>, PortalError> {
        require_staff(caller)?;
        self.read(move |state| {
            event_or_not_found(state, id).map(|event| event.sub_users.clone())
        })
        .await
    }

    /// Events a user helps run, by date.
    ///
    /// # Errors
    ///
    /// Forbidden unless the caller is staff or the user themselves.
    pub async fn sub_user_events(
        &self,
        caller: &Caller,
        user_id: String,
    ) -> Result<Vec<SubUserEvent>, PortalError> {
        if !caller.role.is_staff() && caller.user_id != user_id {
            return Err(PortalError::Forbidden(
                "Users can only list their own assignments".to_string(),
            ));
        }

        Ok(self
            .read(move |state| {
                let mut events: Vec<SubUserEvent> = state
                    .events
                    .values()
                    .filter_map(|event| {
                        event.sub_user(&user_id).map(|sub_user| SubUserEvent {
                            event_id: event.id,
                            title: event.details.title.clone(),
                            date: event.details.date,
                            status: event.status,
                            role: sub_user.role,
                            permissions: sub_user.permissions,
                        })
                    })
                    .collect();
                events.sort_by(|a, b| (a.date, &a.title).cmp(&(b.date, &b.title)));
                events
            })
            .await)
    }

    /// Every registration of a student.
    pub async fn student_registrations(&self, roll: RollNumber) -> Vec<StudentRegistration> {
        self.read(move |state| registrations_of(state, &roll)).await
    }

    /// Every attendance record of a student.
    pub async fn student_attendance(&self, roll: RollNumber) -> Vec<StudentAttendance> {
        self.read(move |state| attendance_of(state, &roll)).await
    }

    /// OD requests, newest first.
    pub async fn od_requests(&self, query: OdQuery) -> Vec<OdRequest> {
        let limit = query
            .limit
            .unwrap_or(OD_DEFAULT_LIMIT)
            .min(self.config().od_max_limit);
        self.read(move |state| {
            let mut requests: Vec<&OdRequest> = state
                .od_requests
                .values()
                .filter(|r| query.status.is_none_or(|s| r.status == s))
                .filter(|r| query.roll.as_ref().is_none_or(|roll| &r.roll_number == roll))
                .collect();
            requests.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
            requests.into_iter().take(limit).cloned().collect()
        })
        .await
    }

    /// Top of the leaderboard.
    pub async fn leaderboard(&self, query: LeaderboardQuery) -> Vec<LeaderboardEntry> {
        let limit = query
            .limit
            .unwrap_or(self.config().leaderboard_default_limit);
        self.read(move |state| Leaderboard::from_state(state).top(limit).to_vec())
            .await
    }

    /// Leaderboard aggregates.
    pub async fn leaderboard_stats(&self) -> LeaderboardStats {
        self.read(|state| Leaderboard::from_state(state).statistics())
            .await
    }

    /// Points, rank and badges of a student.
    pub async fn student_points(&self, roll: RollNumber) -> StudentPoints {
        self.read(move |state| {
            let board = Leaderboard::from_state(state);
            let entry = board.entry(&roll);
            let points = entry.map_or(0, |e| e.points);
            StudentPoints {
                points,
                rank: entry.map(|e| e.rank),
                events_attended: entry.map_or(0, |e| e.events_attended),
                badges: BadgeProgress::for_points(points),
                roll_number: roll,
            }
        })
        .await
    }

    /// Campus-wide dashboard.
    ///
    /// # Errors
    ///
    /// Forbidden for non-admins.
    pub async fn admin_dashboard(&self, caller: &Caller) -> Result<AdminDashboard, PortalError> {
        require_admin(caller)?;
        let now = self.clock().now();
        Ok(self.read(move |state| AdminDashboard::compute(state, now)).await)
    }

    /// Dashboard of the events the caller created.
    ///
    /// # Errors
    ///
    /// Forbidden for students.
    pub async fn coordinator_dashboard(
        &self,
        caller: &Caller,
    ) -> Result<CoordinatorDashboard, PortalError> {
        require_staff(caller)?;
        let today = self.clock().now().date_naive();
        let created_by = caller.user_id.clone();
        Ok(self
            .read(move |state| CoordinatorDashboard::compute(state, &created_by, today))
            .await)
    }

    /// Dashboard of one school.
    ///
    /// # Errors
    ///
    /// Forbidden for students.
    pub async fn faculty_dashboard(
        &self,
        caller: &Caller,
        school: School,
    ) -> Result<FacultyDashboard, PortalError> {
        require_staff(caller)?;
        Ok(self
            .read(move |state| FacultyDashboard::compute(state, &school))
            .await)
    }

    /// A student's dashboard.
    pub async fn student_dashboard(&self, roll: RollNumber) -> StudentDashboard {
        self.read(move |state| StudentDashboard::compute(state, &roll))
            .await
    }
}
