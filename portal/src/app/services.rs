//! Portal service: role checks and command dispatch.
//!
//! Every command goes through [`PortalService::dispatch`]:
//! 1. Check the caller's role, or their sub-user permission on the event
//! 2. Send the action to the store
//! 3. Inspect the resulting state under the same lock (rejection or result)
//! 4. Wait for the domain event to be appended to the log
//!
//! Read-only queries live in [`super::queries`].

use crate::aggregates::event::SubUserAssignment;
use crate::aggregates::{
    AttendanceAction, EventAction, OdRequestAction, OdSubmission, PortalAction,
    PortalEnvironment, PortalReducer, RegistrationAction,
};
use crate::config::PortalConfig;
use crate::error::PortalError;
use crate::import::parse_attendance_csv;
use crate::types::{
    AttendanceId, AttendanceRecord, AttendanceStatus, Event, EventDetails, EventId, EventStatus,
    EventUpdate, ImportSummary, MarkAllSummary, OdMetadata, OdRequest, OdRequestId, Permission,
    PortalState, Registration, RegistrationId, Role, RollNumber, StudentProfile, SubUser,
    SubUserPermissions, Team,
};
use campus_core::environment::Clock;
use campus_runtime::{HealthCheck, Store};
use campus_web::Identity;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// The portal's store.
pub type PortalStore = Store<PortalState, PortalAction, PortalEnvironment, PortalReducer>;

/// An authenticated caller.
pub type Caller = Identity<Role>;

/// Body of a registration.
#[derive(Clone, Debug, Deserialize)]
pub struct RegistrationRequest {
    /// The registering student; must be the caller
    pub student: StudentProfile,
    /// Team details for team events
    #[serde(default)]
    pub team: Option<Team>,
    /// OD details collected with the registration
    #[serde(default)]
    pub od: Option<OdMetadata>,
}

/// Body of a single attendance mark.
#[derive(Clone, Debug, Deserialize)]
pub struct MarkAttendanceRequest {
    /// Student to mark
    pub roll_number: RollNumber,
    /// Present or late
    pub status: AttendanceStatus,
    /// Free-text notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// Require faculty or admin.
///
/// # Errors
///
/// [`PortalError::Forbidden`] for students.
pub fn require_staff(caller: &Caller) -> Result<(), PortalError> {
    if caller.role.is_staff() {
        Ok(())
    } else {
        Err(PortalError::Forbidden(
            "Only faculty and admins can perform this action".to_string(),
        ))
    }
}

/// Require admin.
///
/// # Errors
///
/// [`PortalError::Forbidden`] for anyone else.
pub fn require_admin(caller: &Caller) -> Result<(), PortalError> {
    if caller.role == Role::Admin {
        Ok(())
    } else {
        Err(PortalError::Forbidden(
            "Only admins can perform this action".to_string(),
        ))
    }
}

/// Require faculty or admin, or a sub-user of the event holding `permission`.
///
/// Unknown events are reported as forbidden to anyone but staff.
///
/// # Errors
///
/// [`PortalError::Forbidden`] when neither applies.
pub fn require_event_permission(
    state: &PortalState,
    caller: &Caller,
    event_id: EventId,
    permission: Permission,
) -> Result<(), PortalError> {
    if caller.role.is_staff() {
        return Ok(());
    }

    let granted = state
        .event(&event_id)
        .and_then(|event| event.sub_user(&caller.user_id))
        .is_some_and(|sub_user| sub_user.permissions.allows(permission));

    if granted {
        Ok(())
    } else {
        Err(PortalError::Forbidden(format!(
            "Only faculty, admins or sub-users with the {} permission can perform this action",
            permission.as_str()
        )))
    }
}

/// Require a student acting as `roll`.
///
/// # Errors
///
/// [`PortalError::Forbidden`] for staff or for a different student.
pub fn require_student(caller: &Caller, roll: &RollNumber) -> Result<(), PortalError> {
    if caller.role != Role::Student {
        return Err(PortalError::Forbidden(
            "Only students can perform this action".to_string(),
        ));
    }
    let own = RollNumber::parse(&caller.user_id)?;
    if &own == roll {
        Ok(())
    } else {
        Err(PortalError::Forbidden(
            "Students can only act for themselves".to_string(),
        ))
    }
}

/// Command and query entry point shared by every handler.
#[derive(Clone)]
pub struct PortalService {
    store: PortalStore,
    clock: Arc<dyn Clock>,
    config: PortalConfig,
}

impl PortalService {
    /// Service over an already-built store.
    #[must_use]
    pub fn new(store: PortalStore, clock: Arc<dyn Clock>, config: PortalConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Service whose state is `state`.
    #[must_use]
    pub fn with_state(state: PortalState, env: PortalEnvironment, config: PortalConfig) -> Self {
        let clock = Arc::clone(&env.clock);
        Self::new(Store::new(state, PortalReducer::new(), env), clock, config)
    }

    pub(crate) const fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// [`require_event_permission`] against the current state.
    ///
    /// A permission revoked after this check still covers the command that
    /// passed it.
    async fn authorize(
        &self,
        caller: &Caller,
        event_id: EventId,
        permission: Permission,
    ) -> Result<(), PortalError> {
        if caller.role.is_staff() {
            return Ok(());
        }
        self.read(|state| require_event_permission(state, caller, event_id, permission))
            .await
    }

    /// Run `f` against the current state under the read lock.
    pub async fn read<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&PortalState) -> T,
    {
        self.store.state(f).await
    }

    /// Send `action` and read its outcome in the same critical section.
    ///
    /// `read` only runs when the command was accepted. The call returns once
    /// the command's effects (the append to the event log) have finished.
    ///
    /// # Errors
    ///
    /// The command's rejection, the error of `read`, or
    /// [`PortalError::ShuttingDown`].
    pub async fn dispatch<F, T>(
        &self,
        action: impl Into<PortalAction>,
        read: F,
    ) -> Result<T, PortalError>
    where
        F: FnOnce(&PortalState) -> Result<T, PortalError>,
    {
        let action = action.into();
        let name = campus_core::event::Event::event_type(&action);

        let (mut handle, outcome) = self
            .store
            .send_and_inspect(action, |state| match &state.last_error {
                Some(error) => Err(error.clone()),
                None => read(state),
            })
            .await?;

        handle.wait().await;

        match &outcome {
            Ok(_) => tracing::info!(command = name, "Command accepted"),
            Err(error) => tracing::info!(command = name, code = error.code(), "Command rejected"),
        }
        outcome
    }

    /// Store and event log health.
    pub async fn health(&self) -> Vec<HealthCheck> {
        let failures = self.read(|state| state.persistence_failures).await;
        let event_log = if failures == 0 {
            HealthCheck::healthy("event_log")
        } else {
            HealthCheck::degraded(
                "event_log",
                format!("{failures} domain events failed to persist"),
            )
        };
        vec![self.store.health(), event_log]
    }

    /// Stop accepting commands and wait for pending appends.
    ///
    /// # Errors
    ///
    /// [`PortalError::Persistence`] if appends are still running after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), PortalError> {
        self.store.shutdown(timeout).await.map_err(PortalError::from)
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    /// Create a draft event owned by the caller.
    ///
    /// # Errors
    ///
    /// Forbidden for students; validation errors from the reducer.
    pub async fn create_event(
        &self,
        caller: &Caller,
        details: EventDetails,
    ) -> Result<Event, PortalError> {
        require_staff(caller)?;
        let id = EventId::new();
        let action = EventAction::CreateEvent {
            id,
            details,
            created_by: caller.user_id.clone(),
        };
        self.dispatch(action, move |state| event_snapshot(state, id))
            .await
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Forbidden for students without the `update_schedule` permission; not
    /// found, locked or validation errors.
    pub async fn update_event(
        &self,
        caller: &Caller,
        event_id: EventId,
        update: EventUpdate,
    ) -> Result<Event, PortalError> {
        self.authorize(caller, event_id, Permission::UpdateSchedule)
            .await?;
        let action = EventAction::UpdateEvent { event_id, update };
        self.dispatch(action, move |state| event_snapshot(state, event_id))
            .await
    }

    /// Move an event through its lifecycle.
    ///
    /// # Errors
    ///
    /// Forbidden for students; not found or invalid transition.
    pub async fn change_status(
        &self,
        caller: &Caller,
        event_id: EventId,
        status: EventStatus,
    ) -> Result<Event, PortalError> {
        require_staff(caller)?;
        let action = EventAction::ChangeStatus { event_id, status };
        self.dispatch(action, move |state| event_snapshot(state, event_id))
            .await
    }

    /// Delete an event with its registrations and attendance.
    ///
    /// # Errors
    ///
    /// Forbidden for students; not found.
    pub async fn delete_event(&self, caller: &Caller, event_id: EventId) -> Result<(), PortalError> {
        require_staff(caller)?;
        self.dispatch(EventAction::DeleteEvent { event_id }, |_| Ok(()))
            .await
    }

    /// Assign a sub-user to an event.
    ///
    /// # Errors
    ///
    /// Forbidden for students; not found, duplicate or validation errors.
    pub async fn assign_sub_user(
        &self,
        caller: &Caller,
        event_id: EventId,
        assignment: SubUserAssignment,
    ) -> Result<SubUser, PortalError> {
        require_staff(caller)?;
        let user_id = assignment.user_id.trim().to_string();
        let action = EventAction::AssignSubUser {
            event_id,
            assignment,
            assigned_by: caller.user_id.clone(),
        };
        self.dispatch(action, move |state| {
            sub_user_snapshot(state, event_id, &user_id)
        })
        .await
    }

    /// Replace a sub-user's permissions.
    ///
    /// # Errors
    ///
    /// Forbidden for students; event or sub-user not found.
    pub async fn update_sub_user(
        &self,
        caller: &Caller,
        event_id: EventId,
        user_id: String,
        permissions: SubUserPermissions,
    ) -> Result<SubUser, PortalError> {
        require_staff(caller)?;
        let lookup = user_id.clone();
        let action = EventAction::UpdateSubUserPermissions {
            event_id,
            user_id,
            permissions,
        };
        self.dispatch(action, move |state| {
            sub_user_snapshot(state, event_id, &lookup)
        })
        .await
    }

    /// Remove a sub-user from an event.
    ///
    /// # Errors
    ///
    /// Forbidden for students; event or sub-user not found.
    pub async fn remove_sub_user(
        &self,
        caller: &Caller,
        event_id: EventId,
        user_id: String,
    ) -> Result<(), PortalError> {
        require_staff(caller)?;
        self.dispatch(EventAction::RemoveSubUser { event_id, user_id }, |_| Ok(()))
            .await
    }

    // ------------------------------------------------------------------------
    // Registrations
    // ------------------------------------------------------------------------

    /// Register the calling student.
    ///
    /// # Errors
    ///
    /// Forbidden unless a student registers themselves; any registration
    /// guard failure.
    pub async fn register(
        &self,
        caller: &Caller,
        event_id: EventId,
        request: RegistrationRequest,
    ) -> Result<Registration, PortalError> {
        require_student(caller, &request.student.roll_number)?;
        let registration_id = RegistrationId::new();
        let action = RegistrationAction::RegisterStudent {
            event_id,
            registration_id,
            student: request.student,
            team: request.team,
            od: request.od,
        };
        self.dispatch(action, move |state| {
            registration_snapshot(state, event_id, registration_id)
        })
        .await
    }

    /// Approve a pending registration.
    ///
    /// # Errors
    ///
    /// Forbidden for students without the `manage_registrations` permission;
    /// not found, already reviewed or capacity reached.
    pub async fn approve_registration(
        &self,
        caller: &Caller,
        event_id: EventId,
        registration_id: RegistrationId,
    ) -> Result<Registration, PortalError> {
        self.authorize(caller, event_id, Permission::ManageRegistrations)
            .await?;
        let action = RegistrationAction::ApproveRegistration {
            event_id,
            registration_id,
            reviewed_by: caller.user_id.clone(),
        };
        self.dispatch(action, move |state| {
            registration_snapshot(state, event_id, registration_id)
        })
        .await
    }

    /// Reject a pending registration.
    ///
    /// # Errors
    ///
    /// Forbidden for students without the `manage_registrations` permission;
    /// not found or already reviewed.
    pub async fn reject_registration(
        &self,
        caller: &Caller,
        event_id: EventId,
        registration_id: RegistrationId,
    ) -> Result<Registration, PortalError> {
        self.authorize(caller, event_id, Permission::ManageRegistrations)
            .await?;
        let action = RegistrationAction::RejectRegistration {
            event_id,
            registration_id,
            reviewed_by: caller.user_id.clone(),
        };
        self.dispatch(action, move |state| {
            registration_snapshot(state, event_id, registration_id)
        })
        .await
    }

    /// Delete a registration and the student's attendance on the event.
    ///
    /// # Errors
    ///
    /// Forbidden for non-admins; not found.
    pub async fn delete_registration(
        &self,
        caller: &Caller,
        event_id: EventId,
        registration_id: RegistrationId,
    ) -> Result<(), PortalError> {
        require_admin(caller)?;
        let action = RegistrationAction::DeleteRegistration {
            event_id,
            registration_id,
        };
        self.dispatch(action, |_| Ok(())).await
    }

    // ------------------------------------------------------------------------
    // Attendance
    // ------------------------------------------------------------------------

    /// Mark one student present or late.
    ///
    /// # Errors
    ///
    /// Forbidden for students without the `mark_attendance` permission; any
    /// attendance recorder failure.
    pub async fn mark_attendance(
        &self,
        caller: &Caller,
        event_id: EventId,
        request: MarkAttendanceRequest,
    ) -> Result<AttendanceRecord, PortalError> {
        self.authorize(caller, event_id, Permission::MarkAttendance)
            .await?;
        let attendance_id = AttendanceId::new();
        let action = AttendanceAction::MarkAttendance {
            event_id,
            attendance_id,
            roll_number: request.roll_number,
            status: request.status,
            notes: request.notes,
            marked_by: caller.user_id.clone(),
        };
        self.dispatch(action, move |state| {
            attendance_snapshot(state, event_id, attendance_id)
        })
        .await
    }

    /// Mark every approved, unmarked student present.
    ///
    /// # Errors
    ///
    /// Forbidden for students without the `mark_attendance` permission; not
    /// found or attendance closed.
    pub async fn mark_all_present(
        &self,
        caller: &Caller,
        event_id: EventId,
    ) -> Result<MarkAllSummary, PortalError> {
        self.authorize(caller, event_id, Permission::MarkAttendance)
            .await?;
        let action = AttendanceAction::MarkAllPresent {
            event_id,
            marked_by: caller.user_id.clone(),
        };
        self.dispatch(action, |state| Ok(state.last_mark_all.unwrap_or_default()))
            .await
    }

    /// Record an attendance CSV upload.
    ///
    /// Each readable row goes through the same checks as a single mark;
    /// rows that fail are listed in the summary instead of failing the
    /// upload.
    ///
    /// # Errors
    ///
    /// Forbidden for students without the `mark_attendance` permission; an
    /// unreadable upload; not found or attendance closed.
    pub async fn import_attendance(
        &self,
        caller: &Caller,
        event_id: EventId,
        csv: &str,
    ) -> Result<ImportSummary, PortalError> {
        self.authorize(caller, event_id, Permission::MarkAttendance)
            .await?;
        let upload = parse_attendance_csv(csv)?;
        let action = AttendanceAction::ImportAttendance {
            event_id,
            rows: upload.rows,
            rejected: upload.rejected,
            marked_by: caller.user_id.clone(),
        };
        self.dispatch(action, |state| Ok(state.last_import.clone().unwrap_or_default()))
            .await
    }

    /// Delete an attendance record.
    ///
    /// # Errors
    ///
    /// Forbidden for students; not found.
    pub async fn remove_attendance(
        &self,
        caller: &Caller,
        event_id: EventId,
        attendance_id: AttendanceId,
    ) -> Result<(), PortalError> {
        require_staff(caller)?;
        let action = AttendanceAction::RemoveAttendance {
            event_id,
            attendance_id,
        };
        self.dispatch(action, |_| Ok(())).await
    }

    /// Grant OD on an attendance record.
    ///
    /// The role check happens in the reducer so that replayed and live
    /// commands follow the same rule.
    ///
    /// # Errors
    ///
    /// Forbidden for students; not found or already granted.
    pub async fn grant_od(
        &self,
        caller: &Caller,
        event_id: EventId,
        attendance_id: AttendanceId,
    ) -> Result<AttendanceRecord, PortalError> {
        let action = AttendanceAction::GrantOd {
            event_id,
            attendance_id,
            granted_by: caller.user_id.clone(),
            role: caller.role,
        };
        self.dispatch(action, move |state| {
            attendance_snapshot(state, event_id, attendance_id)
        })
        .await
    }

    // ------------------------------------------------------------------------
    // OD requests
    // ------------------------------------------------------------------------

    /// File an OD request for the calling student.
    ///
    /// # Errors
    ///
    /// Forbidden unless a student files for themselves; validation errors.
    pub async fn submit_od_request(
        &self,
        caller: &Caller,
        submission: OdSubmission,
    ) -> Result<OdRequest, PortalError> {
        require_student(caller, &submission.roll_number)?;
        let id = OdRequestId::new();
        let action = OdRequestAction::SubmitOdRequest { id, submission };
        self.dispatch(action, move |state| od_snapshot(state, id))
            .await
    }

    /// Approve a pending OD request.
    ///
    /// # Errors
    ///
    /// Forbidden for students; not found or already reviewed.
    pub async fn approve_od_request(
        &self,
        caller: &Caller,
        id: OdRequestId,
        remarks: Option<String>,
    ) -> Result<OdRequest, PortalError> {
        require_staff(caller)?;
        let action = OdRequestAction::ApproveOdRequest {
            id,
            reviewed_by: caller.user_id.clone(),
            remarks,
        };
        self.dispatch(action, move |state| od_snapshot(state, id))
            .await
    }

    /// Reject a pending OD request with remarks.
    ///
    /// # Errors
    ///
    /// Forbidden for students; blank remarks, not found or already reviewed.
    pub async fn reject_od_request(
        &self,
        caller: &Caller,
        id: OdRequestId,
        remarks: String,
    ) -> Result<OdRequest, PortalError> {
        require_staff(caller)?;
        let action = OdRequestAction::RejectOdRequest {
            id,
            reviewed_by: caller.user_id.clone(),
            remarks,
        };
        self.dispatch(action, move |state| od_snapshot(state, id))
            .await
    }

    /// Withdraw the caller's own pending OD request.
    ///
    /// # Errors
    ///
    /// Forbidden for staff or another student's request; not found or
    /// already reviewed.
    pub async fn withdraw_od_request(
        &self,
        caller: &Caller,
        id: OdRequestId,
    ) -> Result<(), PortalError> {
        if caller.role != Role::Student {
            return Err(PortalError::Forbidden(
                "Only students can withdraw OD requests".to_string(),
            ));
        }
        let requested_by = RollNumber::parse(&caller.user_id)?;
        let action = OdRequestAction::WithdrawOdRequest { id, requested_by };
        self.dispatch(action, |_| Ok(())).await
    }
}

fn event_snapshot(state: &PortalState, id: EventId) -> Result<Event, PortalError> {
    state
        .event(&id)
        .cloned()
        .ok_or(PortalError::EventNotFound(id))
}

fn sub_user_snapshot(
    state: &PortalState,
    event_id: EventId,
    user_id: &str,
) -> Result<SubUser, PortalError> {
    state
        .event(&event_id)
        .ok_or(PortalError::EventNotFound(event_id))?
        .sub_user(user_id)
        .cloned()
        .ok_or_else(|| PortalError::SubUserNotFound(user_id.to_string()))
}

fn registration_snapshot(
    state: &PortalState,
    event_id: EventId,
    registration_id: RegistrationId,
) -> Result<Registration, PortalError> {
    state
        .event(&event_id)
        .and_then(|event| event.registration(registration_id))
        .cloned()
        .ok_or(PortalError::RegistrationNotFound(registration_id))
}

fn attendance_snapshot(
    state: &PortalState,
    event_id: EventId,
    attendance_id: AttendanceId,
) -> Result<AttendanceRecord, PortalError> {
    state
        .event(&event_id)
        .and_then(|event| event.attendance_record(attendance_id))
        .cloned()
        .ok_or(PortalError::AttendanceNotFound(attendance_id))
}

fn od_snapshot(state: &PortalState, id: OdRequestId) -> Result<OdRequest, PortalError> {
    state
        .od_request(&id)
        .cloned()
        .ok_or(PortalError::OdRequestNotFound(id))
}
