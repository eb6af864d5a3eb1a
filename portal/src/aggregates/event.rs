//! Event aggregate.
//!
//! Manages the event lifecycle: creation, partial updates, status
//! transitions and deletion. Deleting an event drops its registrations and
//! attendance with it. Also keeps the event's sub-users, the helpers who may
//! act on it with the permissions they were given.

use super::{PortalAction, PortalEnvironment, persist, record_persistence_failure};
use crate::error::PortalError;
use crate::types::{
    Event, EventDetails, EventId, EventStatus, EventUpdate, PortalState, SubUser,
    SubUserPermissions, SubUserRole,
};
use campus_core::{SmallVec, effect::Effect, reducer::Reducer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A sub-user as submitted by the assigning staff member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubUserAssignment {
    /// University ID of the helper
    #[serde(alias = "university_id")]
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Kind of helper
    pub role: SubUserRole,
    /// Contact email
    #[serde(default)]
    pub email: Option<String>,
    /// Granted permissions
    #[serde(default)]
    pub permissions: SubUserPermissions,
}

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the Event aggregate
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EventAction {
    // Commands
    /// Create a new event in `draft`
    CreateEvent {
        /// Event identifier, chosen by the caller
        id: EventId,
        /// Details
        details: EventDetails,
        /// User creating the event
        created_by: String,
    },

    /// Change some details of an event
    UpdateEvent {
        /// Event to update
        event_id: EventId,
        /// Fields to change
        update: EventUpdate,
    },

    /// Move an event along its lifecycle
    ChangeStatus {
        /// Event to move
        event_id: EventId,
        /// Target status
        status: EventStatus,
    },

    /// Delete an event with its registrations and attendance
    DeleteEvent {
        /// Event to delete
        event_id: EventId,
    },

    /// Give a user a helper role on an event
    AssignSubUser {
        /// Event
        event_id: EventId,
        /// Who and with which permissions
        assignment: SubUserAssignment,
        /// Staff member making the assignment
        assigned_by: String,
    },

    /// Replace the permissions of a sub-user
    UpdateSubUserPermissions {
        /// Event
        event_id: EventId,
        /// Sub-user
        user_id: String,
        /// New permissions
        permissions: SubUserPermissions,
    },

    /// Take a helper off an event
    RemoveSubUser {
        /// Event
        event_id: EventId,
        /// Sub-user
        user_id: String,
    },

    // Events
    /// Event was created
    EventCreated {
        /// Event identifier
        id: EventId,
        /// Details
        details: EventDetails,
        /// Creator
        created_by: String,
        /// When the event was created
        created_at: DateTime<Utc>,
    },

    /// Event details were changed
    EventUpdated {
        /// Event ID
        event_id: EventId,
        /// Applied update
        update: EventUpdate,
        /// When updated
        updated_at: DateTime<Utc>,
    },

    /// Event status changed
    EventStatusChanged {
        /// Event ID
        event_id: EventId,
        /// Previous status
        from: EventStatus,
        /// New status
        to: EventStatus,
        /// When it changed
        changed_at: DateTime<Utc>,
    },

    /// Event was deleted
    EventDeleted {
        /// Event ID
        event_id: EventId,
        /// When deleted
        deleted_at: DateTime<Utc>,
    },

    /// A sub-user was assigned
    SubUserAssigned {
        /// Event ID
        event_id: EventId,
        /// The assignment as stored
        sub_user: SubUser,
    },

    /// A sub-user's permissions were replaced
    SubUserPermissionsUpdated {
        /// Event ID
        event_id: EventId,
        /// Sub-user
        user_id: String,
        /// New permissions
        permissions: SubUserPermissions,
        /// When updated
        updated_at: DateTime<Utc>,
    },

    /// A sub-user was removed
    SubUserRemoved {
        /// Event ID
        event_id: EventId,
        /// Sub-user
        user_id: String,
        /// When removed
        removed_at: DateTime<Utc>,
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

impl EventAction {
    /// Name of the action; domain events carry a schema version suffix.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateEvent { .. } => "CreateEvent",
            Self::UpdateEvent { .. } => "UpdateEvent",
            Self::ChangeStatus { .. } => "ChangeStatus",
            Self::DeleteEvent { .. } => "DeleteEvent",
            Self::AssignSubUser { .. } => "AssignSubUser",
            Self::UpdateSubUserPermissions { .. } => "UpdateSubUserPermissions",
            Self::RemoveSubUser { .. } => "RemoveSubUser",
            Self::EventCreated { .. } => "EventCreated.v1",
            Self::EventUpdated { .. } => "EventUpdated.v1",
            Self::EventStatusChanged { .. } => "EventStatusChanged.v1",
            Self::EventDeleted { .. } => "EventDeleted.v1",
            Self::SubUserAssigned { .. } => "SubUserAssigned.v1",
            Self::SubUserPermissionsUpdated { .. } => "SubUserPermissionsUpdated.v1",
            Self::SubUserRemoved { .. } => "SubUserRemoved.v1",
            Self::ValidationFailed { .. } => "ValidationFailed",
            Self::PersistenceFailed { .. } => "PersistenceFailed",
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the Event aggregate
#[derive(Clone, Debug, Default)]
pub struct EventReducer;

impl EventReducer {
    /// Creates a new `EventReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a full set of event details
    pub(crate) fn validate_details(details: &EventDetails) -> Result<(), PortalError> {
        if details.title.trim().chars().count() < 3 {
            return Err(PortalError::Validation(
                "Title must be at least 3 characters".to_string(),
            ));
        }
        if details.venue.trim().is_empty() {
            return Err(PortalError::Validation("Venue cannot be empty".to_string()));
        }
        if details.organizer.trim().is_empty() {
            return Err(PortalError::Validation(
                "Organizer cannot be empty".to_string(),
            ));
        }
        if details.max_participants == 0 {
            return Err(PortalError::Validation(
                "Max participants must be at least 1".to_string(),
            ));
        }
        if details.min_team_size == 0 || details.max_team_size == 0 {
            return Err(PortalError::Validation(
                "Team sizes must be at least 1".to_string(),
            ));
        }
        if details.min_team_size > details.max_team_size {
            return Err(PortalError::Validation(format!(
                "Min team size ({}) cannot exceed max team size ({})",
                details.min_team_size, details.max_team_size
            )));
        }
        Ok(())
    }

    /// Validates `CreateEvent` command
    fn validate_create_event(
        state: &PortalState,
        id: &EventId,
        details: &EventDetails,
        created_by: &str,
    ) -> Result<(), PortalError> {
        if state.events.contains_key(id) {
            return Err(PortalError::Validation(format!("Event {id} already exists")));
        }
        if created_by.trim().is_empty() {
            return Err(PortalError::Validation(
                "Creator cannot be empty".to_string(),
            ));
        }
        Self::validate_details(details)
    }

    /// Validates `UpdateEvent` command
    fn validate_update_event(
        state: &PortalState,
        event_id: &EventId,
        update: &EventUpdate,
    ) -> Result<(), PortalError> {
        let event = state
            .event(event_id)
            .ok_or(PortalError::EventNotFound(*event_id))?;

        if event.status.is_terminal() {
            return Err(PortalError::EventLocked(event.status));
        }
        if update.is_empty() {
            return Err(PortalError::Validation("No fields to update".to_string()));
        }

        let next = update.applied_to(&event.details);
        Self::validate_details(&next)?;

        let approved = event.approved_count();
        if (next.max_participants as usize) < approved {
            return Err(PortalError::Validation(format!(
                "Max participants cannot drop below the {approved} approved registrations"
            )));
        }

        Ok(())
    }

    /// Validates `ChangeStatus` command
    fn validate_change_status(
        state: &PortalState,
        event_id: &EventId,
        status: EventStatus,
    ) -> Result<EventStatus, PortalError> {
        let event = state
            .event(event_id)
            .ok_or(PortalError::EventNotFound(*event_id))?;

        if !event.status.can_transition_to(status) {
            return Err(PortalError::InvalidTransition {
                from: event.status,
                to: status,
            });
        }

        Ok(event.status)
    }

    /// Validates `AssignSubUser` command
    fn validate_assign_sub_user(
        state: &PortalState,
        event_id: &EventId,
        assignment: &SubUserAssignment,
    ) -> Result<(), PortalError> {
        let event = state
            .event(event_id)
            .ok_or(PortalError::EventNotFound(*event_id))?;

        if assignment.user_id.trim().is_empty() {
            return Err(PortalError::Validation(
                "Sub-user ID cannot be empty".to_string(),
            ));
        }
        if assignment.name.trim().is_empty() {
            return Err(PortalError::Validation(
                "Sub-user name cannot be empty".to_string(),
            ));
        }
        if event.sub_user(assignment.user_id.trim()).is_some() {
            return Err(PortalError::SubUserExists(
                assignment.user_id.trim().to_string(),
            ));
        }

        Ok(())
    }

    /// Validates the commands that target an existing sub-user
    fn validate_existing_sub_user(
        state: &PortalState,
        event_id: &EventId,
        user_id: &str,
    ) -> Result<(), PortalError> {
        let event = state
            .event(event_id)
            .ok_or(PortalError::EventNotFound(*event_id))?;
        event
            .sub_user(user_id)
            .ok_or_else(|| PortalError::SubUserNotFound(user_id.to_string()))?;
        Ok(())
    }

    /// Applies an event to state
    fn apply_event(state: &mut PortalState, action: &EventAction) {
        match action {
            EventAction::EventCreated {
                id,
                details,
                created_by,
                created_at,
            } => {
                let event = Event::new(*id, details.clone(), created_by.clone(), *created_at);
                state.events.insert(*id, event);
                state.last_error = None;
            },
            EventAction::EventUpdated {
                event_id, update, ..
            } => {
                if let Some(event) = state.event_mut(event_id) {
                    event.details = update.applied_to(&event.details);
                }
                state.last_error = None;
            },
            EventAction::EventStatusChanged { event_id, to, .. } => {
                if let Some(event) = state.event_mut(event_id) {
                    event.status = *to;
                }
                state.last_error = None;
            },
            EventAction::EventDeleted { event_id, .. } => {
                state.events.remove(event_id);
                state.last_error = None;
            },
            EventAction::SubUserAssigned { event_id, sub_user } => {
                if let Some(event) = state.event_mut(event_id) {
                    event.sub_users.push(sub_user.clone());
                }
                state.last_error = None;
            },
            EventAction::SubUserPermissionsUpdated {
                event_id,
                user_id,
                permissions,
                ..
            } => {
                if let Some(sub_user) = state
                    .event_mut(event_id)
                    .and_then(|e| e.sub_users.iter_mut().find(|s| &s.user_id == user_id))
                {
                    sub_user.permissions = *permissions;
                }
                state.last_error = None;
            },
            EventAction::SubUserRemoved {
                event_id, user_id, ..
            } => {
                if let Some(event) = state.event_mut(event_id) {
                    event.sub_users.retain(|s| &s.user_id != user_id);
                }
                state.last_error = None;
            },
            EventAction::ValidationFailed { error } => {
                state.last_error = Some(error.clone());
            },
            EventAction::PersistenceFailed { error } => {
                record_persistence_failure(state, error);
            },
            // Commands don't modify state
            EventAction::CreateEvent { .. }
            | EventAction::UpdateEvent { .. }
            | EventAction::ChangeStatus { .. }
            | EventAction::DeleteEvent { .. }
            | EventAction::AssignSubUser { .. }
            | EventAction::UpdateSubUserPermissions { .. }
            | EventAction::RemoveSubUser { .. } => {},
        }
    }

    /// Persists an applied event
    fn create_effects(
        state: &mut PortalState,
        event: EventAction,
        env: &PortalEnvironment,
    ) -> SmallVec<[Effect<EventAction>; 4]> {
        persist(state, env, PortalAction::Event(event), |error| {
            EventAction::PersistenceFailed { error }
        })
    }
}

impl Reducer for EventReducer {
    type State = PortalState;
    type Action = EventAction;
    type Environment = PortalEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            EventAction::CreateEvent {
                id,
                details,
                created_by,
            } => {
                if let Err(error) = Self::validate_create_event(state, &id, &details, &created_by)
                {
                    Self::apply_event(state, &EventAction::ValidationFailed { error });
                    return SmallVec::new();
                }

                let event = EventAction::EventCreated {
                    id,
                    details,
                    created_by,
                    created_at: env.clock.now(),
                };
                Self::apply_event(state, &event);
                tracing::info!(event_id = %id, "Event created");

                Self::create_effects(state, event, env)
            },

            EventAction::UpdateEvent { event_id, update } => {
                if let Err(error) = Self::validate_update_event(state, &event_id, &update) {
                    Self::apply_event(state, &EventAction::ValidationFailed { error });
                    return SmallVec::new();
                }

                let event = EventAction::EventUpdated {
                    event_id,
                    update,
                    updated_at: env.clock.now(),
                };
                Self::apply_event(state, &event);

                Self::create_effects(state, event, env)
            },

            EventAction::ChangeStatus { event_id, status } => {
                let from = match Self::validate_change_status(state, &event_id, status) {
                    Ok(from) => from,
                    Err(error) => {
                        Self::apply_event(state, &EventAction::ValidationFailed { error });
                        return SmallVec::new();
                    },
                };

                let event = EventAction::EventStatusChanged {
                    event_id,
                    from,
                    to: status,
                    changed_at: env.clock.now(),
                };
                Self::apply_event(state, &event);
                tracing::info!(%event_id, %from, to = %status, "Event status changed");

                Self::create_effects(state, event, env)
            },

            EventAction::DeleteEvent { event_id } => {
                if state.event(&event_id).is_none() {
                    Self::apply_event(
                        state,
                        &EventAction::ValidationFailed {
                            error: PortalError::EventNotFound(event_id),
                        },
                    );
                    return SmallVec::new();
                }

                let event = EventAction::EventDeleted {
                    event_id,
                    deleted_at: env.clock.now(),
                };
                Self::apply_event(state, &event);
                tracing::info!(%event_id, "Event deleted");

                Self::create_effects(state, event, env)
            },

            EventAction::AssignSubUser {
                event_id,
                assignment,
                assigned_by,
            } => {
                if let Err(error) = Self::validate_assign_sub_user(state, &event_id, &assignment) {
                    Self::apply_event(state, &EventAction::ValidationFailed { error });
                    return SmallVec::new();
                }

                let sub_user = SubUser {
                    user_id: assignment.user_id.trim().to_string(),
                    name: assignment.name.trim().to_string(),
                    role: assignment.role,
                    email: assignment.email.filter(|e| !e.trim().is_empty()),
                    permissions: assignment.permissions,
                    assigned_by,
                    assigned_at: env.clock.now(),
                };
                tracing::info!(%event_id, user_id = %sub_user.user_id, "Sub-user assigned");
                let event = EventAction::SubUserAssigned { event_id, sub_user };
                Self::apply_event(state, &event);

                Self::create_effects(state, event, env)
            },

            EventAction::UpdateSubUserPermissions {
                event_id,
                user_id,
                permissions,
            } => {
                if let Err(error) = Self::validate_existing_sub_user(state, &event_id, &user_id) {
                    Self::apply_event(state, &EventAction::ValidationFailed { error });
                    return SmallVec::new();
                }

                let event = EventAction::SubUserPermissionsUpdated {
                    event_id,
                    user_id,
                    permissions,
                    updated_at: env.clock.now(),
                };
                Self::apply_event(state, &event);

                Self::create_effects(state, event, env)
            },

            EventAction::RemoveSubUser { event_id, user_id } => {
                if let Err(error) = Self::validate_existing_sub_user(state, &event_id, &user_id) {
                    Self::apply_event(state, &EventAction::ValidationFailed { error });
                    return SmallVec::new();
                }

                tracing::info!(%event_id, %user_id, "Sub-user removed");
                let event = EventAction::SubUserRemoved {
                    event_id,
                    user_id,
                    removed_at: env.clock.now(),
                };
                Self::apply_event(state, &event);

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
