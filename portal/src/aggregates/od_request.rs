//! OD request aggregate.
//!
//! Students file on-duty leave requests; faculty approve or reject them.
//! A pending request may be withdrawn by the student who filed it.

use super::{PortalAction, PortalEnvironment, persist, record_persistence_failure};
use crate::error::PortalError;
use crate::types::{OdRequest, OdRequestId, OdStatus, PortalState, RollNumber};
use campus_core::{SmallVec, effect::Effect, reducer::Reducer};
use campus_runtime::metrics::PortalMetrics;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum length of the purpose, in characters, after trimming.
pub const MIN_PURPOSE_LEN: usize = 10;

/// What a student submits when filing an OD request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OdSubmission {
    /// Requesting student
    pub roll_number: RollNumber,
    /// Student name
    pub student_name: String,
    /// Student email
    #[serde(default)]
    pub email: String,
    /// Department
    #[serde(default)]
    pub department: String,
    /// Year of study
    #[serde(default)]
    pub year: u8,
    /// Class section
    #[serde(default)]
    pub section: String,
    /// Portal event id, when the OD is for a portal event
    #[serde(default)]
    pub event_id: Option<String>,
    /// Event name
    pub event_name: String,
    /// First day of absence
    pub date_from: NaiveDate,
    /// Last day of absence
    pub date_to: NaiveDate,
    /// Start of absence on the first day
    #[serde(default)]
    pub time_from: Option<NaiveTime>,
    /// End of absence on the last day
    #[serde(default)]
    pub time_to: Option<NaiveTime>,
    /// Faculty addressed
    #[serde(default)]
    pub faculty_name: String,
    /// Faculty code
    #[serde(default)]
    pub faculty_code: String,
    /// Subjects that will be missed
    #[serde(default)]
    pub subjects: Vec<String>,
    /// Course
    #[serde(default)]
    pub course: String,
    /// Program
    #[serde(default)]
    pub program: String,
    /// Semester
    #[serde(default)]
    pub semester: String,
    /// Classmates attending together
    #[serde(default)]
    pub same_class_students: Vec<String>,
    /// Other team members
    #[serde(default)]
    pub team_members: Vec<String>,
    /// Reason for the absence
    pub purpose: String,
}

impl OdSubmission {
    fn into_request(self, id: OdRequestId, requested_at: DateTime<Utc>) -> OdRequest {
        OdRequest {
            id,
            roll_number: self.roll_number,
            student_name: self.student_name.trim().to_string(),
            email: self.email,
            department: self.department,
            year: self.year,
            section: self.section,
            event_id: self.event_id.filter(|id| !id.trim().is_empty()),
            event_name: self.event_name.trim().to_string(),
            date_from: self.date_from,
            date_to: self.date_to,
            time_from: self.time_from,
            time_to: self.time_to,
            faculty_name: self.faculty_name,
            faculty_code: self.faculty_code,
            subjects: self.subjects,
            course: self.course,
            program: self.program,
            semester: self.semester,
            same_class_students: self.same_class_students,
            team_members: self.team_members,
            purpose: self.purpose.trim().to_string(),
            status: OdStatus::Pending,
            requested_at,
            reviewed_at: None,
            reviewed_by: None,
            remarks: None,
        }
    }
}

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the OD request aggregate
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum OdRequestAction {
    // Commands
    /// File a new request
    SubmitOdRequest {
        /// Identifier for the new request
        id: OdRequestId,
        /// Submitted form
        submission: OdSubmission,
    },

    /// Approve a pending request
    ApproveOdRequest {
        /// Request
        id: OdRequestId,
        /// Reviewer
        reviewed_by: String,
        /// Optional remarks
        remarks: Option<String>,
    },

    /// Reject a pending request
    RejectOdRequest {
        /// Request
        id: OdRequestId,
        /// Reviewer
        reviewed_by: String,
        /// Reason, required
        remarks: String,
    },

    /// Withdraw a pending request
    WithdrawOdRequest {
        /// Request
        id: OdRequestId,
        /// Student asking for the withdrawal
        requested_by: RollNumber,
    },

    // Events
    /// A request was filed
    OdRequestSubmitted {
        /// The new request
        request: OdRequest,
    },

    /// A request was approved
    OdRequestApproved {
        /// Request
        id: OdRequestId,
        /// Reviewer
        reviewed_by: String,
        /// Remarks
        remarks: Option<String>,
        /// When reviewed
        reviewed_at: DateTime<Utc>,
    },

    /// A request was rejected
    OdRequestRejected {
        /// Request
        id: OdRequestId,
        /// Reviewer
        reviewed_by: String,
        /// Reason
        remarks: String,
        /// When reviewed
        reviewed_at: DateTime<Utc>,
    },

    /// A request was withdrawn by its student
    OdRequestWithdrawn {
        /// Request
        id: OdRequestId,
        /// When withdrawn
        withdrawn_at: DateTime<Utc>,
    },

    /// Command was rejected
    #[serde(skip)]
    ValidationFailed {
        /// Why
        error: PortalError,
    },

    /// The domain event could not be appended to the log
    #[serde(skip)]
    PersistenceFailed {
        /// Store error
        error: String,
    },
}

impl OdRequestAction {
    /// Name of the action; domain events carry a schema version suffix.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SubmitOdRequest { .. } => "SubmitOdRequest",
            Self::ApproveOdRequest { .. } => "ApproveOdRequest",
            Self::RejectOdRequest { .. } => "RejectOdRequest",
            Self::WithdrawOdRequest { .. } => "WithdrawOdRequest",
            Self::OdRequestSubmitted { .. } => "OdRequestSubmitted.v1",
            Self::OdRequestApproved { .. } => "OdRequestApproved.v1",
            Self::OdRequestRejected { .. } => "OdRequestRejected.v1",
            Self::OdRequestWithdrawn { .. } => "OdRequestWithdrawn.v1",
            Self::ValidationFailed { .. } => "ValidationFailed",
            Self::PersistenceFailed { .. } => "PersistenceFailed",
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the OD request aggregate
#[derive(Clone, Debug, Default)]
pub struct OdRequestReducer;

impl OdRequestReducer {
    /// Creates a new `OdRequestReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates `SubmitOdRequest` command
    fn validate_submission(
        state: &PortalState,
        id: &OdRequestId,
        submission: &OdSubmission,
    ) -> Result<(), PortalError> {
        if state.od_requests.contains_key(id) {
            return Err(PortalError::Validation(format!(
                "OD request {id} already exists"
            )));
        }
        if submission.student_name.trim().is_empty() {
            return Err(PortalError::Validation(
                "Student name cannot be empty".to_string(),
            ));
        }
        if submission.event_name.trim().is_empty() {
            return Err(PortalError::Validation(
                "Event name cannot be empty".to_string(),
            ));
        }
        if submission.date_from > submission.date_to {
            return Err(PortalError::Validation(
                "date_from must not be after date_to".to_string(),
            ));
        }
        if let (Some(from), Some(to)) = (submission.time_from, submission.time_to) {
            if submission.date_from == submission.date_to && from >= to {
                return Err(PortalError::Validation(
                    "time_from must be before time_to on a single-day request".to_string(),
                ));
            }
        }
        if submission.purpose.trim().chars().count() < MIN_PURPOSE_LEN {
            return Err(PortalError::Validation(format!(
                "Purpose must be at least {MIN_PURPOSE_LEN} characters"
            )));
        }
        Ok(())
    }

    fn pending(state: &PortalState, id: &OdRequestId) -> Result<(), PortalError> {
        let request = state
            .od_request(id)
            .ok_or(PortalError::OdRequestNotFound(*id))?;

        if request.status != OdStatus::Pending {
            return Err(PortalError::AlreadyReviewed {
                what: "OD request",
                status: request.status.to_string(),
            });
        }

        Ok(())
    }

    fn validate_withdraw(
        state: &PortalState,
        id: &OdRequestId,
        requested_by: &RollNumber,
    ) -> Result<(), PortalError> {
        let request = state
            .od_request(id)
            .ok_or(PortalError::OdRequestNotFound(*id))?;

        if &request.roll_number != requested_by {
            return Err(PortalError::Forbidden(
                "Only the requesting student can withdraw an OD request".to_string(),
            ));
        }

        Self::pending(state, id)
    }

    /// Applies an event to state
    fn apply_event(state: &mut PortalState, action: &OdRequestAction) {
        match action {
            OdRequestAction::OdRequestSubmitted { request } => {
                state.od_requests.insert(request.id, request.clone());
                state.last_error = None;
            },
            OdRequestAction::OdRequestApproved {
                id,
                reviewed_by,
                remarks,
                reviewed_at,
            } => {
                if let Some(request) = state.od_requests.get_mut(id) {
                    request.status = OdStatus::Approved;
                    request.reviewed_by = Some(reviewed_by.clone());
                    request.reviewed_at = Some(*reviewed_at);
                    request.remarks.clone_from(remarks);
                }
                state.last_error = None;
            },
            OdRequestAction::OdRequestRejected {
                id,
                reviewed_by,
                remarks,
                reviewed_at,
            } => {
                if let Some(request) = state.od_requests.get_mut(id) {
                    request.status = OdStatus::Rejected;
                    request.reviewed_by = Some(reviewed_by.clone());
                    request.reviewed_at = Some(*reviewed_at);
                    request.remarks = Some(remarks.clone());
                }
                state.last_error = None;
            },
            OdRequestAction::OdRequestWithdrawn { id, .. } => {
                state.od_requests.remove(id);
                state.last_error = None;
            },
            OdRequestAction::ValidationFailed { error } => {
                state.last_error = Some(error.clone());
            },
            OdRequestAction::PersistenceFailed { error } => {
                record_persistence_failure(state, error);
            },
            // Commands don't modify state
            OdRequestAction::SubmitOdRequest { .. }
            | OdRequestAction::ApproveOdRequest { .. }
            | OdRequestAction::RejectOdRequest { .. }
            | OdRequestAction::WithdrawOdRequest { .. } => {},
        }
    }

    fn reject(
        state: &mut PortalState,
        error: PortalError,
    ) -> SmallVec<[Effect<OdRequestAction>; 4]> {
        tracing::debug!(code = error.code(), %error, "OD request command rejected");
        Self::apply_event(state, &OdRequestAction::ValidationFailed { error });
        SmallVec::new()
    }

    /// Persists an applied event
    fn create_effects(
        state: &mut PortalState,
        event: OdRequestAction,
        env: &PortalEnvironment,
    ) -> SmallVec<[Effect<OdRequestAction>; 4]> {
        persist(state, env, PortalAction::OdRequest(event), |error| {
            OdRequestAction::PersistenceFailed { error }
        })
    }
}

impl Reducer for OdRequestReducer {
    type State = PortalState;
    type Action = OdRequestAction;
    type Environment = PortalEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            OdRequestAction::SubmitOdRequest { id, submission } => {
                if let Err(error) = Self::validate_submission(state, &id, &submission) {
                    return Self::reject(state, error);
                }

                let event = OdRequestAction::OdRequestSubmitted {
                    request: submission.into_request(id, env.clock.now()),
                };
                Self::apply_event(state, &event);
                PortalMetrics::record_od_request("submitted");
                tracing::info!(od_request_id = %id, "OD request submitted");

                Self::create_effects(state, event, env)
            },

            OdRequestAction::ApproveOdRequest {
                id,
                reviewed_by,
                remarks,
            } => {
                if let Err(error) = Self::pending(state, &id) {
                    return Self::reject(state, error);
                }

                let event = OdRequestAction::OdRequestApproved {
                    id,
                    reviewed_by,
                    remarks: remarks.filter(|r| !r.trim().is_empty()),
                    reviewed_at: env.clock.now(),
                };
                Self::apply_event(state, &event);
                PortalMetrics::record_od_request("approved");

                Self::create_effects(state, event, env)
            },

            OdRequestAction::RejectOdRequest {
                id,
                reviewed_by,
                remarks,
            } => {
                if remarks.trim().is_empty() {
                    return Self::reject(
                        state,
                        PortalError::Validation("Remarks are required when rejecting".to_string()),
                    );
                }
                if let Err(error) = Self::pending(state, &id) {
                    return Self::reject(state, error);
                }

                let event = OdRequestAction::OdRequestRejected {
                    id,
                    reviewed_by,
                    remarks: remarks.trim().to_string(),
                    reviewed_at: env.clock.now(),
                };
                Self::apply_event(state, &event);
                PortalMetrics::record_od_request("rejected");

                Self::create_effects(state, event, env)
            },

            OdRequestAction::WithdrawOdRequest { id, requested_by } => {
                if let Err(error) = Self::validate_withdraw(state, &id, &requested_by) {
                    return Self::reject(state, error);
                }

                let event = OdRequestAction::OdRequestWithdrawn {
                    id,
                    withdrawn_at: env.clock.now(),
                };
                Self::apply_event(state, &event);
                PortalMetrics::record_od_request("withdrawn");

                Self::create_effects(state, event, env)
            },

            // ========== Events (from event store replay) ==========
            event => {
                Self::apply_event(state, &event);
                SmallVec::new()
            },
        }
    }
}
