//! Reducers of the portal.
//!
//! Four aggregates share one [`PortalState`]:
//!
//! - [`event`]: event lifecycle (create, update, status, delete)
//! - [`registration`]: the registration guard and review
//! - [`attendance`]: the attendance recorder and OD grants
//! - [`od_request`]: OD leave requests
//!
//! [`PortalReducer`] routes a [`PortalAction`] to the right child. Every
//! accepted command produces exactly one domain event, applied to state and
//! persisted through [`persist`]. Replaying persisted events through the same
//! reducers rebuilds the state.

pub mod attendance;
pub mod event;
pub mod od_request;
pub mod registration;

pub use attendance::{AttendanceAction, AttendanceReducer};
pub use event::{EventAction, EventReducer};
pub use od_request::{OdRequestAction, OdRequestReducer, OdSubmission};
pub use registration::{RegistrationAction, RegistrationReducer};

use crate::types::PortalState;
use campus_core::{
    SmallVec, append_events,
    effect::Effect,
    environment::Clock,
    event::{Event, SerializedEvent},
    event_store::EventStore,
    reducer::Reducer,
    smallvec,
    stream::StreamId,
};
use campus_runtime::metrics::EventLogMetrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name of the single stream the portal writes to.
pub const PORTAL_STREAM: &str = "campus-portal";

/// Any action of any portal aggregate.
///
/// This is also the persisted event envelope: only the event variants of the
/// inner actions ever reach the log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum PortalAction {
    /// Event lifecycle
    Event(EventAction),
    /// Registrations
    Registration(RegistrationAction),
    /// Attendance
    Attendance(AttendanceAction),
    /// OD requests
    OdRequest(OdRequestAction),
}

impl Event for PortalAction {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Event(action) => action.name(),
            Self::Registration(action) => action.name(),
            Self::Attendance(action) => action.name(),
            Self::OdRequest(action) => action.name(),
        }
    }
}

impl From<EventAction> for PortalAction {
    fn from(action: EventAction) -> Self {
        Self::Event(action)
    }
}

impl From<RegistrationAction> for PortalAction {
    fn from(action: RegistrationAction) -> Self {
        Self::Registration(action)
    }
}

impl From<AttendanceAction> for PortalAction {
    fn from(action: AttendanceAction) -> Self {
        Self::Attendance(action)
    }
}

impl From<OdRequestAction> for PortalAction {
    fn from(action: OdRequestAction) -> Self {
        Self::OdRequest(action)
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Dependencies shared by every portal reducer.
#[derive(Clone)]
pub struct PortalEnvironment {
    /// Clock for timestamps and deadline checks
    pub clock: Arc<dyn Clock>,
    /// Event log
    pub event_store: Arc<dyn EventStore>,
    /// Stream the portal appends to
    pub stream_id: StreamId,
}

impl PortalEnvironment {
    /// Environment writing to [`PORTAL_STREAM`].
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, event_store: Arc<dyn EventStore>) -> Self {
        Self {
            clock,
            event_store,
            stream_id: StreamId::new(PORTAL_STREAM),
        }
    }
}

/// Stamp the next version on a domain event and describe its append.
///
/// The version is claimed while the store lock is held, so versions follow
/// the order in which events were applied even if appends land out of order.
/// A failed append comes back as the action built by `on_error`.
pub(crate) fn persist<A>(
    state: &mut PortalState,
    env: &PortalEnvironment,
    event: PortalAction,
    on_error: fn(String) -> A,
) -> SmallVec<[Effect<A>; 4]>
where
    A: Send + 'static,
{
    let version = state.version.next();

    let serialized = match SerializedEvent::from_event(&event, version, env.clock.now()) {
        Ok(serialized) => serialized,
        Err(error) => {
            tracing::error!(%error, event_type = event.event_type(), "Failed to serialize domain event");
            state.persistence_failures += 1;
            EventLogMetrics::record_append_failure();
            return SmallVec::new();
        },
    };

    state.version = version;
    tracing::debug!(version = %version, event_type = %serialized.event_type, "Domain event recorded");

    smallvec![append_events! {
        store: env.event_store,
        stream: env.stream_id.clone(),
        events: vec![serialized],
        on_success: |_version| None,
        on_error: |error| Some(on_error(error.to_string()))
    }]
}

/// Book-keeping for an append that failed after the state was updated.
pub(crate) fn record_persistence_failure(state: &mut PortalState, error: &str) {
    tracing::error!(error, "Domain event was not persisted");
    state.persistence_failures += 1;
    EventLogMetrics::record_append_failure();
}

// ============================================================================
// Root reducer
// ============================================================================

/// Routes actions to the child reducers.
#[derive(Clone, Debug, Default)]
pub struct PortalReducer {
    event: EventReducer,
    registration: RegistrationReducer,
    attendance: AttendanceReducer,
    od_request: OdRequestReducer,
}

impl PortalReducer {
    /// Creates a new `PortalReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self {
            event: EventReducer::new(),
            registration: RegistrationReducer::new(),
            attendance: AttendanceReducer::new(),
            od_request: OdRequestReducer::new(),
        }
    }
}

impl Reducer for PortalReducer {
    type State = PortalState;
    type Action = PortalAction;
    type Environment = PortalEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            PortalAction::Event(action) => self
                .event
                .reduce(state, action, env)
                .into_iter()
                .map(|effect| effect.map(PortalAction::Event))
                .collect(),
            PortalAction::Registration(action) => self
                .registration
                .reduce(state, action, env)
                .into_iter()
                .map(|effect| effect.map(PortalAction::Registration))
                .collect(),
            PortalAction::Attendance(action) => self
                .attendance
                .reduce(state, action, env)
                .into_iter()
                .map(|effect| effect.map(PortalAction::Attendance))
                .collect(),
            PortalAction::OdRequest(action) => self
                .od_request
                .reduce(state, action, env)
                .into_iter()
                .map(|effect| effect.map(PortalAction::OdRequest))
                .collect(),
        }
    }
}
