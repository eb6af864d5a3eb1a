//! Registration aggregate.
//!
//! Hosts the registration guard. A registration attempt is accepted only
//! when, checked in this order:
//!
//! 1. the event exists and is `active`
//! 2. the student holds no registration for the event yet
//! 3. the clock reads strictly before the registration deadline
//! 4. approved registrations are below `max_participants`
//! 5. the team size (lead included) lies within the event's bounds
//! 6. the submitted fields are well formed
//!
//! Accepted registrations start `pending`. Approval re-checks capacity under
//! the same lock, so the approved count can never exceed the event capacity.

use super::{PortalAction, PortalEnvironment, persist, record_persistence_failure};
use crate::error::PortalError;
use crate::types::{
    Event, EventId, EventStatus, OdMetadata, PortalState, Registration, RegistrationId,
    RegistrationStatus, RollNumber, StudentProfile, Team,
};
use campus_core::{SmallVec, effect::Effect, reducer::Reducer};
use campus_runtime::metrics::PortalMetrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the Registration aggregate
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum RegistrationAction {
    // Commands
    /// A student asks to join an event
    RegisterStudent {
        /// Event to join
        event_id: EventId,
        /// Identifier for the new registration
        registration_id: RegistrationId,
        /// The registering student
        student: StudentProfile,
        /// Team, for team events
        team: Option<Team>,
        /// OD details
        od: Option<OdMetadata>,
    },

    /// Approve a pending registration
    ApproveRegistration {
        /// Event
        event_id: EventId,
        /// Registration to approve
        registration_id: RegistrationId,
        /// Reviewer
        reviewed_by: String,
    },

    /// Reject a pending registration
    RejectRegistration {
        /// Event
        event_id: EventId,
        /// Registration to reject
        registration_id: RegistrationId,
        /// Reviewer
        reviewed_by: String,
    },

    /// Remove a registration in any status
    DeleteRegistration {
        /// Event
        event_id: EventId,
        /// Registration to remove
        registration_id: RegistrationId,
    },

    // Events
    /// A registration was accepted as pending
    StudentRegistered {
        /// The new registration
        registration: Registration,
    },

    /// A registration was approved
    RegistrationApproved {
        /// Event
        event_id: EventId,
        /// Registration
        registration_id: RegistrationId,
        /// Reviewer
        reviewed_by: String,
        /// When reviewed
        reviewed_at: DateTime<Utc>,
    },

    /// A registration was rejected
    RegistrationRejected {
        /// Event
        event_id: EventId,
        /// Registration
        registration_id: RegistrationId,
        /// Reviewer
        reviewed_by: String,
        /// When reviewed
        reviewed_at: DateTime<Utc>,
    },

    /// A registration and the student's attendance record were removed
    RegistrationDeleted {
        /// Event
        event_id: EventId,
        /// Registration
        registration_id: RegistrationId,
        /// Student whose attendance goes too
        roll_number: RollNumber,
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

impl RegistrationAction {
    /// Name of the action; domain events carry a schema version suffix.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RegisterStudent { .. } => "RegisterStudent",
            Self::ApproveRegistration { .. } => "ApproveRegistration",
            Self::RejectRegistration { .. } => "RejectRegistration",
            Self::DeleteRegistration { .. } => "DeleteRegistration",
            Self::StudentRegistered { .. } => "StudentRegistered.v1",
            Self::RegistrationApproved { .. } => "RegistrationApproved.v1",
            Self::RegistrationRejected { .. } => "RegistrationRejected.v1",
            Self::RegistrationDeleted { .. } => "RegistrationDeleted.v1",
            Self::ValidationFailed { .. } => "ValidationFailed",
            Self::PersistenceFailed { .. } => "PersistenceFailed",
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the Registration aggregate
#[derive(Clone, Debug, Default)]
pub struct RegistrationReducer;

impl RegistrationReducer {
    /// Creates a new `RegistrationReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// The registration guard
    fn validate_register(
        state: &PortalState,
        event_id: &EventId,
        student: &StudentProfile,
        team: Option<&Team>,
        now: DateTime<Utc>,
    ) -> Result<(), PortalError> {
        let event = state
            .event(event_id)
            .ok_or(PortalError::EventNotFound(*event_id))?;

        if event.status != EventStatus::Active {
            return Err(PortalError::EventNotOpen(event.status));
        }

        if event.registration_of(&student.roll_number).is_some() {
            return Err(PortalError::AlreadyRegistered(
                student.roll_number.to_string(),
            ));
        }

        if now >= event.details.registration_deadline {
            return Err(PortalError::DeadlinePassed);
        }

        if !event.has_capacity() {
            return Err(PortalError::CapacityReached(event.details.max_participants));
        }

        Self::validate_team_size(event, team)?;
        Self::validate_fields(student, team)
    }

    fn validate_team_size(event: &Event, team: Option<&Team>) -> Result<(), PortalError> {
        let size = 1 + team.map_or(0, |t| t.members.len());
        let min = event.details.min_team_size;
        let max = event.details.max_team_size;

        if size < min as usize || size > max as usize {
            return Err(PortalError::TeamSize { size, min, max });
        }

        Ok(())
    }

    fn validate_fields(student: &StudentProfile, team: Option<&Team>) -> Result<(), PortalError> {
        if student.name.trim().is_empty() {
            return Err(PortalError::Validation(
                "Student name cannot be empty".to_string(),
            ));
        }

        let Some(team) = team else {
            return Ok(());
        };

        if team.name.trim().is_empty() {
            return Err(PortalError::Validation("Team name cannot be empty".to_string()));
        }

        let mut seen = HashSet::new();
        for member in &team.members {
            if member.name.trim().is_empty() {
                return Err(PortalError::Validation(
                    "Team member name cannot be empty".to_string(),
                ));
            }
            if member.roll_number == student.roll_number {
                return Err(PortalError::Validation(format!(
                    "Team lead {} cannot also be listed as a member",
                    student.roll_number
                )));
            }
            if !seen.insert(&member.roll_number) {
                return Err(PortalError::Validation(format!(
                    "Duplicate team member roll number {}",
                    member.roll_number
                )));
            }
        }

        Ok(())
    }

    /// Approve/reject: the registration must exist and still be pending
    fn validate_review(
        state: &PortalState,
        event_id: &EventId,
        registration_id: RegistrationId,
        approving: bool,
    ) -> Result<(), PortalError> {
        let event = state
            .event(event_id)
            .ok_or(PortalError::EventNotFound(*event_id))?;

        let registration = event
            .registration(registration_id)
            .ok_or(PortalError::RegistrationNotFound(registration_id))?;

        if registration.status != RegistrationStatus::Pending {
            return Err(PortalError::AlreadyReviewed {
                what: "Registration",
                status: registration.status.to_string(),
            });
        }

        if approving && !event.has_capacity() {
            return Err(PortalError::CapacityReached(event.details.max_participants));
        }

        Ok(())
    }

    fn review<'a>(
        state: &'a mut PortalState,
        event_id: &EventId,
        registration_id: RegistrationId,
    ) -> Option<&'a mut Registration> {
        state
            .event_mut(event_id)?
            .registrations
            .iter_mut()
            .find(|r| r.id == registration_id)
    }

    /// Applies an event to state
    fn apply_event(state: &mut PortalState, action: &RegistrationAction) {
        match action {
            RegistrationAction::StudentRegistered { registration } => {
                if let Some(event) = state.event_mut(&registration.event_id) {
                    event.registrations.push(registration.clone());
                }
                state.last_error = None;
            },
            RegistrationAction::RegistrationApproved {
                event_id,
                registration_id,
                reviewed_by,
                reviewed_at,
            } => {
                if let Some(registration) = Self::review(state, event_id, *registration_id) {
                    registration.status = RegistrationStatus::Approved;
                    registration.reviewed_by = Some(reviewed_by.clone());
                    registration.reviewed_at = Some(*reviewed_at);
                }
                state.last_error = None;
            },
            RegistrationAction::RegistrationRejected {
                event_id,
                registration_id,
                reviewed_by,
                reviewed_at,
            } => {
                if let Some(registration) = Self::review(state, event_id, *registration_id) {
                    registration.status = RegistrationStatus::Rejected;
                    registration.reviewed_by = Some(reviewed_by.clone());
                    registration.reviewed_at = Some(*reviewed_at);
                }
                state.last_error = None;
            },
            RegistrationAction::RegistrationDeleted {
                event_id,
                registration_id,
                roll_number,
            } => {
                if let Some(event) = state.event_mut(event_id) {
                    event.registrations.retain(|r| r.id != *registration_id);
                    event.attendance.retain(|a| &a.roll_number != roll_number);
                }
                state.last_error = None;
            },
            RegistrationAction::ValidationFailed { error } => {
                state.last_error = Some(error.clone());
            },
            RegistrationAction::PersistenceFailed { error } => {
                record_persistence_failure(state, error);
            },
            // Commands don't modify state
            RegistrationAction::RegisterStudent { .. }
            | RegistrationAction::ApproveRegistration { .. }
            | RegistrationAction::RejectRegistration { .. }
            | RegistrationAction::DeleteRegistration { .. } => {},
        }
    }

    fn reject(
        state: &mut PortalState,
        error: PortalError,
    ) -> SmallVec<[Effect<RegistrationAction>; 4]> {
        tracing::debug!(code = error.code(), %error, "Registration command rejected");
        Self::apply_event(state, &RegistrationAction::ValidationFailed { error });
        SmallVec::new()
    }

    /// Persists an applied event
    fn create_effects(
        state: &mut PortalState,
        event: RegistrationAction,
        env: &PortalEnvironment,
    ) -> SmallVec<[Effect<RegistrationAction>; 4]> {
        persist(state, env, PortalAction::Registration(event), |error| {
            RegistrationAction::PersistenceFailed { error }
        })
    }
}

impl Reducer for RegistrationReducer {
    type State = PortalState;
    type Action = RegistrationAction;
    type Environment = PortalEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            RegistrationAction::RegisterStudent {
                event_id,
                registration_id,
                student,
                team,
                od,
            } => {
                let now = env.clock.now();
                if let Err(error) =
                    Self::validate_register(state, &event_id, &student, team.as_ref(), now)
                {
                    PortalMetrics::record_registration(error.code());
                    return Self::reject(state, error);
                }

                let roll_number = student.roll_number.clone();
                let event = RegistrationAction::StudentRegistered {
                    registration: Registration {
                        id: registration_id,
                        event_id,
                        student,
                        team,
                        od,
                        status: RegistrationStatus::Pending,
                        registered_at: now,
                        reviewed_by: None,
                        reviewed_at: None,
                    },
                };
                Self::apply_event(state, &event);
                PortalMetrics::record_registration("accepted");
                tracing::info!(%event_id, %registration_id, %roll_number, "Student registered");

                Self::create_effects(state, event, env)
            },

            RegistrationAction::ApproveRegistration {
                event_id,
                registration_id,
                reviewed_by,
            } => {
                if let Err(error) = Self::validate_review(state, &event_id, registration_id, true) {
                    return Self::reject(state, error);
                }

                let event = RegistrationAction::RegistrationApproved {
                    event_id,
                    registration_id,
                    reviewed_by,
                    reviewed_at: env.clock.now(),
                };
                Self::apply_event(state, &event);
                PortalMetrics::record_registration("approved");

                Self::create_effects(state, event, env)
            },

            RegistrationAction::RejectRegistration {
                event_id,
                registration_id,
                reviewed_by,
            } => {
                if let Err(error) = Self::validate_review(state, &event_id, registration_id, false) {
                    return Self::reject(state, error);
                }

                let event = RegistrationAction::RegistrationRejected {
                    event_id,
                    registration_id,
                    reviewed_by,
                    reviewed_at: env.clock.now(),
                };
                Self::apply_event(state, &event);
                PortalMetrics::record_registration("rejected");

                Self::create_effects(state, event, env)
            },

            RegistrationAction::DeleteRegistration {
                event_id,
                registration_id,
            } => {
                let lookup = state.event(&event_id).map(|event| {
                    event
                        .registration(registration_id)
                        .map(|r| r.student.roll_number.clone())
                });
                let roll_number = match lookup {
                    None => return Self::reject(state, PortalError::EventNotFound(event_id)),
                    Some(None) => {
                        return Self::reject(
                            state,
                            PortalError::RegistrationNotFound(registration_id),
                        );
                    },
                    Some(Some(roll_number)) => roll_number,
                };

                let event = RegistrationAction::RegistrationDeleted {
                    event_id,
                    registration_id,
                    roll_number,
                };
                Self::apply_event(state, &event);
                tracing::info!(%event_id, %registration_id, "Registration deleted");

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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::aggregates::test_support::{details, env, now, student};
    use crate::types::{Event, TeamMember};
    use campus_testing::{ReducerTest, assertions};

    fn active_event(max_participants: u32) -> (EventId, PortalState) {
        let id = EventId::new();
        let mut event = Event::new(id, details(max_participants), "fac-01".to_string(), now());
        event.status = EventStatus::Active;

        let mut state = PortalState::new();
        state.events.insert(id, event);
        (id, state)
    }

    fn register(event_id: EventId, roll: &str) -> RegistrationAction {
        RegistrationAction::RegisterStudent {
            event_id,
            registration_id: RegistrationId::new(),
            student: student(roll),
            team: None,
            od: None,
        }
    }

    fn member(roll: &str) -> TeamMember {
        TeamMember {
            name: format!("Member {roll}"),
            email: String::new(),
            roll_number: roll.parse().unwrap(),
            department: "CSE".to_string(),
            year: 2,
        }
    }

    fn approved(state: &PortalState, event_id: EventId, rolls: &[&str]) -> PortalState {
        let mut state = state.clone();
        for roll in rolls {
            let registration = Registration {
                id: RegistrationId::new(),
                event_id,
                student: student(roll),
                team: None,
                od: None,
                status: RegistrationStatus::Approved,
                registered_at: now(),
                reviewed_by: Some("fac-01".to_string()),
                reviewed_at: Some(now()),
            };
            state.event_mut(&event_id).unwrap().registrations.push(registration);
        }
        state
    }

    #[test]
    fn test_register_starts_pending() {
        let (event_id, state) = active_event(30);

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(register(event_id, "a001"))
            .then_state(move |state| {
                let event = state.event(&event_id).unwrap();
                assert_eq!(event.registrations.len(), 1);
                let registration = &event.registrations[0];
                assert_eq!(registration.status, RegistrationStatus::Pending);
                assert_eq!(registration.student.roll_number.as_str(), "A001");
                assert_eq!(registration.registered_at, now());
                assert!(state.last_error.is_none());
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn test_register_draft_event_is_not_open() {
        let (event_id, mut state) = active_event(30);
        state.event_mut(&event_id).unwrap().status = EventStatus::Draft;

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(register(event_id, "A001"))
            .then_state(|state| {
                assert_eq!(
                    state.last_error,
                    Some(PortalError::EventNotOpen(EventStatus::Draft))
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let (event_id, state) = active_event(30);

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(state)
            .given_actions(vec![register(event_id, "A001")])
            .when_action(register(event_id, " a001"))
            .then_state(move |state| {
                assert_eq!(
                    state.last_error,
                    Some(PortalError::AlreadyRegistered("A001".to_string()))
                );
                assert_eq!(state.event(&event_id).unwrap().registrations.len(), 1);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_registration_at_deadline_is_rejected() {
        let (event_id, mut state) = active_event(30);
        state
            .event_mut(&event_id)
            .unwrap()
            .details
            .registration_deadline = now();

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(register(event_id, "A001"))
            .then_state(|state| {
                assert_eq!(state.last_error, Some(PortalError::DeadlinePassed));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_deadline_is_checked_before_capacity() {
        let (event_id, state) = active_event(1);
        let mut state = approved(&state, event_id, &["B001"]);
        state
            .event_mut(&event_id)
            .unwrap()
            .details
            .registration_deadline = now() - chrono::Duration::hours(1);

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(register(event_id, "A001"))
            .then_state(|state| {
                assert_eq!(state.last_error, Some(PortalError::DeadlinePassed));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_full_event_rejects_registration() {
        let (event_id, state) = active_event(2);
        let state = approved(&state, event_id, &["B001", "B002"]);

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(register(event_id, "A001"))
            .then_state(|state| {
                assert_eq!(state.last_error, Some(PortalError::CapacityReached(2)));
                assert_eq!(
                    state.last_error.as_ref().unwrap().to_string(),
                    "Event has reached maximum participants (2)"
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_team_too_large() {
        let (event_id, state) = active_event(30);

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(RegistrationAction::RegisterStudent {
                event_id,
                registration_id: RegistrationId::new(),
                student: student("A001"),
                team: Some(Team {
                    name: "Borrowers".to_string(),
                    is_team_lead: true,
                    members: vec![member("A002"), member("A003"), member("A004")],
                }),
                od: None,
            })
            .then_state(|state| {
                assert_eq!(
                    state.last_error,
                    Some(PortalError::TeamSize {
                        size: 4,
                        min: 1,
                        max: 3
                    })
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_lead_listed_as_member() {
        let (event_id, state) = active_event(30);

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(RegistrationAction::RegisterStudent {
                event_id,
                registration_id: RegistrationId::new(),
                student: student("A001"),
                team: Some(Team {
                    name: "Borrowers".to_string(),
                    is_team_lead: true,
                    members: vec![member("a001")],
                }),
                od: None,
            })
            .then_state(|state| {
                assert!(matches!(state.last_error, Some(PortalError::Validation(_))));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_duplicate_team_members() {
        let (event_id, state) = active_event(30);

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(RegistrationAction::RegisterStudent {
                event_id,
                registration_id: RegistrationId::new(),
                student: student("A001"),
                team: Some(Team {
                    name: "Borrowers".to_string(),
                    is_team_lead: true,
                    members: vec![member("A002"), member("A002")],
                }),
                od: None,
            })
            .then_state(|state| {
                let error = state.last_error.as_ref().unwrap().to_string();
                assert!(error.contains("Duplicate team member"));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_approve_unknown_registration() {
        let (event_id, state) = active_event(1);
        let registration_id = RegistrationId::new();

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(state)
            .given_actions(vec![
                RegistrationAction::RegisterStudent {
                    event_id,
                    registration_id,
                    student: student("A001"),
                    team: None,
                    od: None,
                },
                register(event_id, "A002"),
                RegistrationAction::ApproveRegistration {
                    event_id,
                    registration_id,
                    reviewed_by: "fac-01".to_string(),
                },
            ])
            .when_action(RegistrationAction::ApproveRegistration {
                event_id,
                registration_id: RegistrationId::new(),
                reviewed_by: "fac-01".to_string(),
            })
            .then_state(move |state| {
                assert!(matches!(
                    state.last_error,
                    Some(PortalError::RegistrationNotFound(_))
                ));
                assert_eq!(state.event(&event_id).unwrap().approved_count(), 1);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_second_approval_over_capacity_is_rejected() {
        let (event_id, state) = active_event(1);
        let first = RegistrationId::new();
        let second = RegistrationId::new();
        let mut state = state;
        let reducer = RegistrationReducer::new();
        let env = env();

        for (id, roll) in [(first, "A001"), (second, "A002")] {
            reducer.reduce(
                &mut state,
                RegistrationAction::RegisterStudent {
                    event_id,
                    registration_id: id,
                    student: student(roll),
                    team: None,
                    od: None,
                },
                &env,
            );
        }

        reducer.reduce(
            &mut state,
            RegistrationAction::ApproveRegistration {
                event_id,
                registration_id: first,
                reviewed_by: "fac-01".to_string(),
            },
            &env,
        );
        assert!(state.last_error.is_none());

        let effects = reducer.reduce(
            &mut state,
            RegistrationAction::ApproveRegistration {
                event_id,
                registration_id: second,
                reviewed_by: "fac-01".to_string(),
            },
            &env,
        );
        assert!(effects.is_empty());
        assert_eq!(state.last_error, Some(PortalError::CapacityReached(1)));
        assert_eq!(state.event(&event_id).unwrap().approved_count(), 1);
    }

    #[test]
    fn test_review_only_pending() {
        let (event_id, state) = active_event(30);
        let registration_id = RegistrationId::new();

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(state)
            .given_actions(vec![
                RegistrationAction::RegisterStudent {
                    event_id,
                    registration_id,
                    student: student("A001"),
                    team: None,
                    od: None,
                },
                RegistrationAction::RejectRegistration {
                    event_id,
                    registration_id,
                    reviewed_by: "fac-01".to_string(),
                },
            ])
            .when_action(RegistrationAction::ApproveRegistration {
                event_id,
                registration_id,
                reviewed_by: "fac-01".to_string(),
            })
            .then_state(move |state| {
                assert_eq!(
                    state.last_error,
                    Some(PortalError::AlreadyReviewed {
                        what: "Registration",
                        status: "rejected".to_string(),
                    })
                );
                let registration = state
                    .event(&event_id)
                    .unwrap()
                    .registration(registration_id)
                    .unwrap();
                assert_eq!(registration.status, RegistrationStatus::Rejected);
                assert_eq!(registration.reviewed_by.as_deref(), Some("fac-01"));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_delete_registration_cascades_attendance() {
        let (event_id, state) = active_event(30);
        let mut state = approved(&state, event_id, &["A001"]);
        let registration_id = state.event(&event_id).unwrap().registrations[0].id;
        state
            .event_mut(&event_id)
            .unwrap()
            .attendance
            .push(crate::types::AttendanceRecord {
                id: crate::types::AttendanceId::new(),
                event_id,
                roll_number: "A001".parse().unwrap(),
                student_name: "Student A001".to_string(),
                status: crate::types::AttendanceStatus::Present,
                marked_at: now(),
                marked_by: "fac-01".to_string(),
                notes: None,
                od_granted_by: None,
                od_granted_at: None,
            });

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(RegistrationAction::DeleteRegistration {
                event_id,
                registration_id,
            })
            .then_state(move |state| {
                let event = state.event(&event_id).unwrap();
                assert!(event.registrations.is_empty());
                assert!(event.attendance.is_empty());
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }
}
