//! Domain types for the campus events portal.
//!
//! Identifiers, closed vocabularies (roles, statuses, categories, schools),
//! the event/registration/attendance/OD entities, and the root
//! [`PortalState`] the reducers operate on.

use crate::error::PortalError;
use campus_core::stream::Version;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// The inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an event
    EventId
);
uuid_id!(
    /// Unique identifier for a registration
    RegistrationId
);
uuid_id!(
    /// Unique identifier for an attendance record
    AttendanceId
);
uuid_id!(
    /// Unique identifier for an OD request
    OdRequestId
);

/// A student's university roll number.
///
/// Stored trimmed and upper-cased so that `a001 ` and `A001` are the same
/// student everywhere (duplicate checks, attendance, leaderboard).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RollNumber(String);

impl RollNumber {
    /// Normalise and validate a roll number.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Validation`] for blank input.
    pub fn parse(raw: &str) -> Result<Self, PortalError> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(PortalError::Validation(
                "roll number cannot be empty".to_string(),
            ));
        }
        Ok(Self(normalized))
    }

    /// The normalised roll number
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RollNumber {
    type Error = PortalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RollNumber> for String {
    fn from(value: RollNumber) -> Self {
        value.0
    }
}

impl FromStr for RollNumber {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RollNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Closed vocabularies
// ============================================================================

/// Portal role asserted by the `X-User-Role` header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Registers for events, files OD requests
    Student,
    /// Creates events, marks attendance, reviews OD requests
    Faculty,
    /// Everything faculty can do plus deletions and the admin dashboard
    Admin,
}

impl Role {
    /// Faculty and admins manage events.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Faculty | Self::Admin)
    }

    /// Lower-case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Faculty => "faculty",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "faculty" => Ok(Self::Faculty),
            "admin" => Ok(Self::Admin),
            other => Err(PortalError::Validation(format!("unknown role '{other}'"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event lifecycle.
///
/// ```text
/// draft ──► active ──► completed
///   │         │
///   └────────►└──────► cancelled
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Being prepared; not open for registration
    Draft,
    /// Published; registration and attendance allowed
    Active,
    /// Took place; attendance may still be corrected
    Completed,
    /// Called off
    Cancelled,
}

impl EventStatus {
    /// Whether the lifecycle allows moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Active | Self::Cancelled)
                | (Self::Active, Self::Completed | Self::Cancelled)
        )
    }

    /// Completed and cancelled events never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Lower-case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registration review state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    /// Awaiting faculty review
    Pending,
    /// Counts toward capacity; may be marked present
    Approved,
    /// Declined
    Rejected,
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        })
    }
}

/// Stored attendance status. Absence is inferred, never recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    /// Arrived on time
    Present,
    /// Arrived late
    Late,
}

impl AttendanceStatus {
    /// Lower-case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Late => "late",
        }
    }
}

/// OD request review state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OdStatus {
    /// Awaiting faculty review
    Pending,
    /// Granted
    Approved,
    /// Declined, with remarks
    Rejected,
}

impl fmt::Display for OdStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        })
    }
}

/// Event category; drives leaderboard points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// General technical event
    Technical,
    /// Hands-on workshop
    Workshop,
    /// Hackathon
    Hackathon,
    /// Seminar
    Seminar,
    /// Conference
    Conference,
    /// Competition
    Competition,
    /// Cultural event
    Cultural,
    /// Sports event
    Sports,
    /// Tech talk
    TechTalk,
    /// Online webinar
    Webinar,
    /// Orientation session
    Orientation,
    /// Networking event
    Networking,
    /// Career guidance
    Career,
    /// Awareness drive
    Awareness,
    /// Anything else
    Other,
}

impl EventCategory {
    /// Every category, in display order.
    pub const ALL: [Self; 15] = [
        Self::Technical,
        Self::Workshop,
        Self::Hackathon,
        Self::Seminar,
        Self::Conference,
        Self::Competition,
        Self::Cultural,
        Self::Sports,
        Self::TechTalk,
        Self::Webinar,
        Self::Orientation,
        Self::Networking,
        Self::Career,
        Self::Awareness,
        Self::Other,
    ];

    /// Points earned for attending an event of this category.
    #[must_use]
    pub const fn points(self) -> u32 {
        match self {
            Self::Workshop | Self::Sports | Self::Networking => 10,
            Self::Hackathon => 20,
            Self::Conference => 15,
            Self::Competition => 25,
            Self::Cultural => 8,
            Self::TechTalk => 12,
            Self::Webinar => 7,
            Self::Seminar
            | Self::Orientation
            | Self::Technical
            | Self::Career
            | Self::Awareness
            | Self::Other => 5,
        }
    }

    /// Snake-case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Workshop => "workshop",
            Self::Hackathon => "hackathon",
            Self::Seminar => "seminar",
            Self::Conference => "conference",
            Self::Competition => "competition",
            Self::Cultural => "cultural",
            Self::Sports => "sports",
            Self::TechTalk => "tech_talk",
            Self::Webinar => "webinar",
            Self::Orientation => "orientation",
            Self::Networking => "networking",
            Self::Career => "career",
            Self::Awareness => "awareness",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schools of the university.
pub const SCHOOLS: [&str; 12] = [
    "Amity School of Engineering & Technology",
    "Amity School of Business",
    "Amity School of Communication",
    "Amity School of Computer Science",
    "Amity School of Architecture & Planning",
    "Amity School of Fine Arts",
    "Amity School of Law",
    "Amity School of Applied Sciences",
    "Amity School of Biotechnology",
    "Amity School of Hospitality",
    "Amity School of Liberal Arts",
    "Amity School of Design",
];

/// One of [`SCHOOLS`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct School(String);

impl School {
    /// Validate a school name (exact match).
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Validation`] for names outside [`SCHOOLS`].
    pub fn parse(name: &str) -> Result<Self, PortalError> {
        let name = name.trim();
        if SCHOOLS.contains(&name) {
            Ok(Self(name.to_string()))
        } else {
            Err(PortalError::Validation(format!("unknown school '{name}'")))
        }
    }

    /// The school name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for School {
    type Error = PortalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<School> for String {
    fn from(value: School) -> Self {
        value.0
    }
}

impl fmt::Display for School {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Events
// ============================================================================

const fn default_min_team_size() -> u32 {
    1
}

const fn default_max_team_size() -> u32 {
    5
}

/// Organiser-editable description of an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetails {
    /// Title (at least 3 characters)
    pub title: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Category
    pub category: EventCategory,
    /// Hosting school
    pub school: School,
    /// Venue
    pub venue: String,
    /// Calendar date
    pub date: NaiveDate,
    /// Start time
    pub time: NaiveTime,
    /// Organising body or person
    pub organizer: String,
    /// Capacity (approved registrations)
    pub max_participants: u32,
    /// Largest allowed team, lead included
    #[serde(default = "default_max_team_size")]
    pub max_team_size: u32,
    /// Smallest allowed team, lead included
    #[serde(default = "default_min_team_size")]
    pub min_team_size: u32,
    /// Registrations are accepted strictly before this instant
    pub registration_deadline: DateTime<Utc>,
}

/// Partial update of [`EventDetails`]; `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventUpdate {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New category
    pub category: Option<EventCategory>,
    /// New school
    pub school: Option<School>,
    /// New venue
    pub venue: Option<String>,
    /// New date
    pub date: Option<NaiveDate>,
    /// New start time
    pub time: Option<NaiveTime>,
    /// New organiser
    pub organizer: Option<String>,
    /// New capacity
    pub max_participants: Option<u32>,
    /// New largest team
    pub max_team_size: Option<u32>,
    /// New smallest team
    pub min_team_size: Option<u32>,
    /// New deadline
    pub registration_deadline: Option<DateTime<Utc>>,
}

impl EventUpdate {
    /// True when no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.school.is_none()
            && self.venue.is_none()
            && self.date.is_none()
            && self.time.is_none()
            && self.organizer.is_none()
            && self.max_participants.is_none()
            && self.max_team_size.is_none()
            && self.min_team_size.is_none()
            && self.registration_deadline.is_none()
    }

    /// The details that result from applying this update.
    #[must_use]
    pub fn applied_to(&self, details: &EventDetails) -> EventDetails {
        let mut next = details.clone();
        if let Some(title) = &self.title {
            next.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            next.description.clone_from(description);
        }
        if let Some(category) = self.category {
            next.category = category;
        }
        if let Some(school) = &self.school {
            next.school = school.clone();
        }
        if let Some(venue) = &self.venue {
            next.venue.clone_from(venue);
        }
        if let Some(date) = self.date {
            next.date = date;
        }
        if let Some(time) = self.time {
            next.time = time;
        }
        if let Some(organizer) = &self.organizer {
            next.organizer.clone_from(organizer);
        }
        if let Some(max) = self.max_participants {
            next.max_participants = max;
        }
        if let Some(max) = self.max_team_size {
            next.max_team_size = max;
        }
        if let Some(min) = self.min_team_size {
            next.min_team_size = min;
        }
        if let Some(deadline) = self.registration_deadline {
            next.registration_deadline = deadline;
        }
        next
    }
}

/// A campus event with its registrations and attendance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Identifier
    pub id: EventId,
    /// Editable details
    #[serde(flatten)]
    pub details: EventDetails,
    /// Lifecycle state
    pub status: EventStatus,
    /// User ID of the creator
    pub created_by: String,
    /// Creation instant
    pub created_at: DateTime<Utc>,
    /// Registrations, in submission order
    pub registrations: Vec<Registration>,
    /// Attendance records, in marking order
    pub attendance: Vec<AttendanceRecord>,
    /// Helpers assigned to run the event
    #[serde(default)]
    pub sub_users: Vec<SubUser>,
}

impl Event {
    /// A new draft event with no registrations.
    #[must_use]
    pub const fn new(
        id: EventId,
        details: EventDetails,
        created_by: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            details,
            status: EventStatus::Draft,
            created_by,
            created_at,
            registrations: Vec::new(),
            attendance: Vec::new(),
            sub_users: Vec::new(),
        }
    }

    /// Sub-user assignment of a user, if any.
    #[must_use]
    pub fn sub_user(&self, user_id: &str) -> Option<&SubUser> {
        self.sub_users.iter().find(|s| s.user_id == user_id)
    }

    /// Registration of a student, if any.
    #[must_use]
    pub fn registration_of(&self, roll: &RollNumber) -> Option<&Registration> {
        self.registrations
            .iter()
            .find(|r| &r.student.roll_number == roll)
    }

    /// Registration by id.
    #[must_use]
    pub fn registration(&self, id: RegistrationId) -> Option<&Registration> {
        self.registrations.iter().find(|r| r.id == id)
    }

    /// Attendance record of a student, if any.
    #[must_use]
    pub fn attendance_of(&self, roll: &RollNumber) -> Option<&AttendanceRecord> {
        self.attendance.iter().find(|a| &a.roll_number == roll)
    }

    /// Attendance record by id.
    #[must_use]
    pub fn attendance_record(&self, id: AttendanceId) -> Option<&AttendanceRecord> {
        self.attendance.iter().find(|a| a.id == id)
    }

    /// Number of approved registrations.
    #[must_use]
    pub fn approved_count(&self) -> usize {
        self.registrations
            .iter()
            .filter(|r| r.status == RegistrationStatus::Approved)
            .count()
    }

    /// Whether another registration may be approved.
    #[must_use]
    pub fn has_capacity(&self) -> bool {
        self.approved_count() < self.details.max_participants as usize
    }
}

// ============================================================================
// Sub-users
// ============================================================================

/// Kind of helper assigned to an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubUserRole {
    /// Co-coordinator from the staff
    Staff,
    /// Student volunteer
    Volunteer,
    /// External vendor
    Vendor,
}

/// Something a sub-user may be allowed to do on their event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    /// Read registrations, the roster and the attendance export
    ViewAttendees,
    /// Mark attendance, one by one, in bulk or from a CSV upload
    MarkAttendance,
    /// Edit the event details
    UpdateSchedule,
    /// Approve and reject registrations
    ManageRegistrations,
}

impl Permission {
    /// Wire name, as used in the permission object.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ViewAttendees => "view_attendees",
            Self::MarkAttendance => "mark_attendance",
            Self::UpdateSchedule => "update_schedule",
            Self::ManageRegistrations => "manage_registrations",
        }
    }
}

/// Permissions of a sub-user. Everything is off unless granted.
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubUserPermissions {
    /// See [`Permission::ViewAttendees`]
    #[serde(default)]
    pub view_attendees: bool,
    /// See [`Permission::MarkAttendance`]
    #[serde(default)]
    pub mark_attendance: bool,
    /// See [`Permission::UpdateSchedule`]
    #[serde(default)]
    pub update_schedule: bool,
    /// See [`Permission::ManageRegistrations`]
    #[serde(default)]
    pub manage_registrations: bool,
}

impl SubUserPermissions {
    /// Whether `permission` is granted.
    #[must_use]
    pub const fn allows(self, permission: Permission) -> bool {
        match permission {
            Permission::ViewAttendees => self.view_attendees,
            Permission::MarkAttendance => self.mark_attendance,
            Permission::UpdateSchedule => self.update_schedule,
            Permission::ManageRegistrations => self.manage_registrations,
        }
    }
}

/// A user helping run one event, with the permissions they were given.
///
/// Matched against the caller's `X-User-Id`, whatever their role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubUser {
    /// University ID of the helper
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Kind of helper
    pub role: SubUserRole,
    /// Contact email
    pub email: Option<String>,
    /// What they may do
    pub permissions: SubUserPermissions,
    /// Staff member who made the assignment
    pub assigned_by: String,
    /// Assignment instant
    pub assigned_at: DateTime<Utc>,
}

// ============================================================================
// Registrations
// ============================================================================

/// Identity of a registering student.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    /// Roll number
    pub roll_number: RollNumber,
    /// Full name
    pub name: String,
    /// Email
    pub email: String,
    /// Department
    #[serde(default)]
    pub department: String,
    /// Year of study
    #[serde(default)]
    pub year: u8,
}

/// A team member listed by the team lead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    /// Full name
    pub name: String,
    /// Email
    #[serde(default)]
    pub email: String,
    /// Roll number
    pub roll_number: RollNumber,
    /// Department
    #[serde(default)]
    pub department: String,
    /// Year of study
    #[serde(default)]
    pub year: u8,
}

/// Team information of a registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Team name
    pub name: String,
    /// Whether the registering student leads the team
    #[serde(default = "default_true")]
    pub is_team_lead: bool,
    /// Other members (the registering student excluded)
    #[serde(default)]
    pub members: Vec<TeamMember>,
}

const fn default_true() -> bool {
    true
}

/// OD details attached to a registration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OdMetadata {
    /// Name of the event as it should appear on the OD letter
    pub event_name: String,
    /// Subjects that will be missed
    #[serde(default)]
    pub subjects: Vec<String>,
    /// Classmates attending together
    #[serde(default)]
    pub same_class_students: Vec<String>,
}

/// A student's registration for an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Identifier
    pub id: RegistrationId,
    /// Event registered for
    pub event_id: EventId,
    /// Registering student
    pub student: StudentProfile,
    /// Team, for team events
    pub team: Option<Team>,
    /// OD details
    pub od: Option<OdMetadata>,
    /// Review state
    pub status: RegistrationStatus,
    /// Submission instant
    pub registered_at: DateTime<Utc>,
    /// Reviewer, once reviewed
    pub reviewed_by: Option<String>,
    /// Review instant
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Registration {
    /// Team size including the registering student.
    #[must_use]
    pub fn team_size(&self) -> usize {
        1 + self.team.as_ref().map_or(0, |t| t.members.len())
    }
}

// ============================================================================
// Attendance
// ============================================================================

/// One student's attendance at one event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Identifier
    pub id: AttendanceId,
    /// Event attended
    pub event_id: EventId,
    /// Student roll number
    pub roll_number: RollNumber,
    /// Student name, copied from the registration
    pub student_name: String,
    /// Present or late
    pub status: AttendanceStatus,
    /// Marking instant
    pub marked_at: DateTime<Utc>,
    /// User ID of the marker
    pub marked_by: String,
    /// Free-text notes
    pub notes: Option<String>,
    /// Faculty who granted OD for this attendance
    pub od_granted_by: Option<String>,
    /// When OD was granted
    pub od_granted_at: Option<DateTime<Utc>>,
}

impl AttendanceRecord {
    /// Whether OD has been granted.
    #[must_use]
    pub const fn od_granted(&self) -> bool {
        self.od_granted_by.is_some()
    }
}

// ============================================================================
// OD requests
// ============================================================================

/// A student's request for on-duty leave.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OdRequest {
    /// Identifier
    pub id: OdRequestId,
    /// Requesting student
    pub roll_number: RollNumber,
    /// Student name
    pub student_name: String,
    /// Student email
    pub email: String,
    /// Department
    pub department: String,
    /// Year of study
    pub year: u8,
    /// Class section
    pub section: String,
    /// Portal event id, when the OD is for a portal event
    pub event_id: Option<String>,
    /// Event name as written by the student
    pub event_name: String,
    /// First day of absence
    pub date_from: NaiveDate,
    /// Last day of absence
    pub date_to: NaiveDate,
    /// Start of absence on the first day
    pub time_from: Option<NaiveTime>,
    /// End of absence on the last day
    pub time_to: Option<NaiveTime>,
    /// Faculty addressed
    pub faculty_name: String,
    /// Faculty code
    pub faculty_code: String,
    /// Subjects that will be missed
    pub subjects: Vec<String>,
    /// Course
    pub course: String,
    /// Program
    pub program: String,
    /// Semester
    pub semester: String,
    /// Classmates attending together
    pub same_class_students: Vec<String>,
    /// Other team members
    pub team_members: Vec<String>,
    /// Reason for the absence (at least 10 characters)
    pub purpose: String,
    /// Review state
    pub status: OdStatus,
    /// Submission instant
    pub requested_at: DateTime<Utc>,
    /// Review instant
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Reviewer
    pub reviewed_by: Option<String>,
    /// Reviewer remarks (required on rejection)
    pub remarks: Option<String>,
}

// ============================================================================
// State
// ============================================================================

/// Outcome of the last bulk "mark all present".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkAllSummary {
    /// Records created
    pub marked: usize,
    /// Approved students that already had a record
    pub skipped: usize,
}

/// A CSV row that was not turned into an attendance record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRejection {
    /// 1-based line of the row in the upload
    pub line: usize,
    /// Roll number as written in the row
    pub roll_number: String,
    /// Why it was skipped
    pub reason: String,
}

/// Outcome of the last CSV attendance import.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Records created
    pub imported: usize,
    /// Rows skipped, in file order
    pub rejected: Vec<ImportRejection>,
}

/// Root state of the portal.
///
/// Everything lives behind the store's single lock; reducers mutate it and
/// read endpoints project it.
#[derive(Clone, Debug, Default)]
pub struct PortalState {
    /// Events indexed by ID
    pub events: BTreeMap<EventId, Event>,
    /// OD requests indexed by ID
    pub od_requests: BTreeMap<OdRequestId, OdRequest>,
    /// Version of the last persisted domain event
    pub version: Version,
    /// Rejection of the last command, cleared by every accepted command
    pub last_error: Option<PortalError>,
    /// Result of the last bulk attendance command
    pub last_mark_all: Option<MarkAllSummary>,
    /// Result of the last CSV attendance import
    pub last_import: Option<ImportSummary>,
    /// Domain events that failed to reach the event log
    pub persistence_failures: u64,
}

impl PortalState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Event by ID
    #[must_use]
    pub fn event(&self, id: &EventId) -> Option<&Event> {
        self.events.get(id)
    }

    /// Mutable event by ID
    pub fn event_mut(&mut self, id: &EventId) -> Option<&mut Event> {
        self.events.get_mut(id)
    }

    /// OD request by ID
    #[must_use]
    pub fn od_request(&self, id: &OdRequestId) -> Option<&OdRequest> {
        self.od_requests.get(id)
    }

    /// Total registrations across events
    #[must_use]
    pub fn registration_count(&self) -> usize {
        self.events.values().map(|e| e.registrations.len()).sum()
    }
}
