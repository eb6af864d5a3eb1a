//! Portal error taxonomy.
//!
//! Every rejected command records one of these in
//! [`PortalState::last_error`](crate::types::PortalState::last_error); the HTTP
//! layer maps them onto [`AppError`] with a stable machine code.

use crate::types::{AttendanceId, EventId, EventStatus, OdRequestId, RegistrationId};
use campus_runtime::StoreError;
use campus_web::AppError;
use thiserror::Error;

/// Errors produced by portal commands and queries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortalError {
    /// No event with this ID
    #[error("Event with id {0} not found")]
    EventNotFound(EventId),

    /// No registration with this ID on the event
    #[error("Registration with id {0} not found")]
    RegistrationNotFound(RegistrationId),

    /// No attendance record with this ID on the event
    #[error("Attendance record with id {0} not found")]
    AttendanceNotFound(AttendanceId),

    /// No OD request with this ID
    #[error("OD request with id {0} not found")]
    OdRequestNotFound(OdRequestId),

    /// No sub-user with this user ID on the event
    #[error("Sub-user {0} is not assigned to this event")]
    SubUserNotFound(String),

    /// The user is already a sub-user of the event
    #[error("Sub-user {0} is already assigned to this event")]
    SubUserExists(String),

    /// Registration attempted on an event that is not active
    #[error("Event is not open for registration (status: {0})")]
    EventNotOpen(EventStatus),

    /// The student already holds a registration for this event
    #[error("Student {0} is already registered for this event")]
    AlreadyRegistered(String),

    /// Registration attempted at or after the deadline
    #[error("Registration deadline has passed")]
    DeadlinePassed,

    /// Approved registrations already fill the event
    #[error("Event has reached maximum participants ({0})")]
    CapacityReached(u32),

    /// Team size outside the event's bounds
    #[error("Team size {size} is outside the allowed range {min}..={max}")]
    TeamSize {
        /// Proposed size, lead included
        size: usize,
        /// Smallest allowed
        min: u32,
        /// Largest allowed
        max: u32,
    },

    /// Attendance for a student without an approved registration
    #[error("Student {0} not found in registration list")]
    NotRegistered(String),

    /// Attendance already recorded for this student
    #[error("Attendance already marked for student {0}")]
    AlreadyMarked(String),

    /// Attendance is closed for events in this state
    #[error("Attendance cannot be recorded for a {0} event")]
    AttendanceClosed(EventStatus),

    /// Completed or cancelled events can no longer be edited
    #[error("Event is {0} and can no longer be edited")]
    EventLocked(EventStatus),

    /// Lifecycle transition not allowed
    #[error("Cannot move event from {from} to {to}")]
    InvalidTransition {
        /// Current status
        from: EventStatus,
        /// Requested status
        to: EventStatus,
    },

    /// Approve/reject/withdraw on something already reviewed
    #[error("{what} has already been {status}")]
    AlreadyReviewed {
        /// "Registration" or "OD request"
        what: &'static str,
        /// Its current status
        status: String,
    },

    /// OD was already granted on this attendance record
    #[error("OD already granted for this attendance record")]
    OdAlreadyGranted,

    /// Malformed input
    #[error("{0}")]
    Validation(String),

    /// The caller's role or identity does not permit the operation
    #[error("{0}")]
    Forbidden(String),

    /// The event log could not be written or read
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// The store stopped accepting commands
    #[error("Service is shutting down")]
    ShuttingDown,
}

impl PortalError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EventNotFound(_) => "EVENT_NOT_FOUND",
            Self::RegistrationNotFound(_) => "REGISTRATION_NOT_FOUND",
            Self::AttendanceNotFound(_) => "ATTENDANCE_NOT_FOUND",
            Self::OdRequestNotFound(_) => "OD_REQUEST_NOT_FOUND",
            Self::SubUserNotFound(_) => "SUB_USER_NOT_FOUND",
            Self::SubUserExists(_) => "SUB_USER_EXISTS",
            Self::EventNotOpen(_) => "EVENT_NOT_OPEN",
            Self::AlreadyRegistered(_) => "ALREADY_REGISTERED",
            Self::DeadlinePassed => "DEADLINE_PASSED",
            Self::CapacityReached(_) => "CAPACITY_REACHED",
            Self::TeamSize { .. } => "TEAM_SIZE",
            Self::NotRegistered(_) => "STUDENT_NOT_REGISTERED",
            Self::AlreadyMarked(_) => "ALREADY_MARKED",
            Self::AttendanceClosed(_) => "ATTENDANCE_CLOSED",
            Self::EventLocked(_) => "EVENT_LOCKED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::AlreadyReviewed { .. } => "ALREADY_REVIEWED",
            Self::OdAlreadyGranted => "OD_ALREADY_GRANTED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Persistence(_) => "PERSISTENCE_FAILURE",
            Self::ShuttingDown => "SHUTTING_DOWN",
        }
    }
}

impl From<PortalError> for AppError {
    fn from(err: PortalError) -> Self {
        let code = err.code();
        let message = err.to_string();

        let app_error = match &err {
            PortalError::EventNotFound(_)
            | PortalError::RegistrationNotFound(_)
            | PortalError::AttendanceNotFound(_)
            | PortalError::OdRequestNotFound(_)
            | PortalError::SubUserNotFound(_)
            | PortalError::NotRegistered(_) => {
                Self::new(axum::http::StatusCode::NOT_FOUND, message, String::new())
            },
            PortalError::EventNotOpen(_)
            | PortalError::SubUserExists(_)
            | PortalError::AlreadyRegistered(_)
            | PortalError::DeadlinePassed
            | PortalError::CapacityReached(_)
            | PortalError::AlreadyMarked(_)
            | PortalError::AttendanceClosed(_)
            | PortalError::EventLocked(_)
            | PortalError::InvalidTransition { .. }
            | PortalError::AlreadyReviewed { .. }
            | PortalError::OdAlreadyGranted => Self::conflict(message),
            PortalError::TeamSize { .. } | PortalError::Validation(_) => Self::validation(message),
            PortalError::Forbidden(_) => Self::forbidden(message),
            PortalError::ShuttingDown => Self::unavailable(message),
            PortalError::Persistence(_) => {
                Self::internal("An internal error occurred").with_source(err.clone().into())
            },
        };

        app_error.with_code(code)
    }
}

impl From<StoreError> for PortalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ShutdownInProgress => Self::ShuttingDown,
            StoreError::ShutdownTimeout(pending) => {
                Self::Persistence(format!("{pending} effects still running at shutdown"))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn rule_violations_are_conflicts() {
        let err = AppError::from(PortalError::CapacityReached(30));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "CAPACITY_REACHED");
        assert_eq!(err.message(), "Event has reached maximum participants (30)");
    }

    #[test]
    fn missing_resources_are_not_found() {
        let err = AppError::from(PortalError::NotRegistered("A001".to_string()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "Student A001 not found in registration list");
    }

    #[test]
    fn sub_user_errors() {
        let missing = AppError::from(PortalError::SubUserNotFound("vol-7".to_string()));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.code(), "SUB_USER_NOT_FOUND");

        let duplicate = AppError::from(PortalError::SubUserExists("vol-7".to_string()));
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);
        assert_eq!(
            duplicate.message(),
            "Sub-user vol-7 is already assigned to this event"
        );
    }

    #[test]
    fn validation_and_forbidden() {
        assert_eq!(
            AppError::from(PortalError::Validation("bad".into())).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::from(PortalError::Forbidden("no".into())).status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn persistence_hides_details() {
        let err = AppError::from(PortalError::Persistence("disk full".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message().contains("disk"));
    }
}
