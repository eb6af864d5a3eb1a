//! Event trait and related types for event sourcing.
//!
//! Events are facts about things that already happened. The portal persists
//! them as JSON so the log stays human-readable and can be inspected or
//! repaired with ordinary text tools.
//!
//! # Example
//!
//! ```
//! use campus_core::event::Event;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! enum RosterEvent {
//!     StudentAdded { roll: String },
//! }
//!
//! impl Event for RosterEvent {
//!     fn event_type(&self) -> &'static str {
//!         match self {
//!             RosterEvent::StudentAdded { .. } => "StudentAdded.v1",
//!         }
//!     }
//! }
//! ```

use crate::stream::Version;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event operations.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize event.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize event.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),
}

/// An event that can be stored in an event store and replayed to reconstruct state.
///
/// # Event Naming Convention
///
/// The `event_type()` method should return a stable string identifier that includes
/// a version number, e.g. `"RegistrationSubmitted.v1"`.
pub trait Event: Send + Sync + 'static {
    /// Returns the event type identifier for this event.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    fn to_json(&self) -> Result<serde_json::Value, EventError>
    where
        Self: Serialize,
    {
        serde_json::to_value(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the value does not match
    /// this event's schema.
    fn from_json(value: &serde_json::Value) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        serde_json::from_value(value.clone()).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// A serialized event ready for storage.
///
/// The `version` is the position the writer assigned to this event inside its
/// stream. Stores keep events ordered by it, independent of the order in which
/// concurrent appends reach them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedEvent {
    /// Position of the event in its stream (1-based).
    pub version: Version,

    /// The event type identifier (e.g., "AttendanceMarked.v1").
    pub event_type: String,

    /// The event payload.
    pub data: serde_json::Value,

    /// When the event was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl SerializedEvent {
    /// Create a new serialized event.
    #[must_use]
    pub const fn new(
        version: Version,
        event_type: String,
        data: serde_json::Value,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            version,
            event_type,
            data,
            recorded_at,
        }
    }

    /// Create a serialized event from an `Event`.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    pub fn from_event<E: Event + Serialize>(
        event: &E,
        version: Version,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self, EventError> {
        Ok(Self {
            version,
            event_type: event.event_type().to_string(),
            data: event.to_json()?,
            recorded_at,
        })
    }

    /// Decode the payload back into a typed event.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the payload does not match `E`.
    pub fn decode<E: Event + DeserializeOwned>(&self) -> Result<E, EventError> {
        E::from_json(&self.data)
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ version: {}, type: {} }}",
            self.version, self.event_type
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    enum TestEvent {
        Created { id: String, value: i32 },
        Updated { id: String, new_value: i32 },
    }

    impl Event for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Created { .. } => "TestEvent.Created.v1",
                TestEvent::Updated { .. } => "TestEvent.Updated.v1",
            }
        }
    }

    #[test]
    fn event_type_returns_correct_identifier() {
        let event = TestEvent::Created {
            id: "test-1".to_string(),
            value: 42,
        };
        assert_eq!(event.event_type(), "TestEvent.Created.v1");
    }

    #[test]
    #[allow(clippy::expect_used)] // Panics: Test will fail if serialization fails
    fn serialized_event_decodes_back() {
        let event = TestEvent::Updated {
            id: "test-1".to_string(),
            new_value: 100,
        };

        let serialized = SerializedEvent::from_event(&event, Version::new(3), Utc::now())
            .expect("serialization should succeed");

        assert_eq!(serialized.event_type, "TestEvent.Updated.v1");
        assert_eq!(serialized.version, Version::new(3));
        let decoded: TestEvent = serialized.decode().expect("decode should succeed");
        assert_eq!(decoded, event);
    }

    #[test]
    fn decode_rejects_foreign_payload() {
        let serialized = SerializedEvent::new(
            Version::new(1),
            "Other.v1".to_string(),
            serde_json::json!({"unexpected": true}),
            Utc::now(),
        );

        assert!(serialized.decode::<TestEvent>().is_err());
    }

    #[test]
    fn serialized_event_display() {
        let serialized = SerializedEvent::new(
            Version::new(7),
            "TestEvent.v1".to_string(),
            serde_json::Value::Null,
            Utc::now(),
        );

        let display = format!("{serialized}");
        assert!(display.contains("TestEvent.v1"));
        assert!(display.contains("version: 7"));
    }
}
