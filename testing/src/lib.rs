//! # Campus Testing
//!
//! Testing utilities for the campus events portal.
//!
//! This crate provides:
//! - Deterministic clocks
//! - An in-memory event store
//! - The [`ReducerTest`] Given-When-Then harness and effect assertions
//!
//! ## Example
//!
//! ```ignore
//! use campus_testing::{InMemoryEventStore, test_clock};
//! use campus_runtime::Store;
//!
//! #[tokio::test]
//! async fn registration_is_persisted() {
//!     let log = Arc::new(InMemoryEventStore::new());
//!     let env = PortalEnvironment::new(Arc::new(test_clock()), log.clone());
//!     let store = Store::new(PortalState::default(), PortalReducer::new(), env);
//!
//!     let mut handle = store.send(create_event_action()).await?;
//!     handle.wait().await;
//!
//!     assert_eq!(log.event_count(&env.stream_id), 1);
//! }
//! ```

use campus_core::environment::Clock;
use chrono::{DateTime, Utc};


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of environment dependencies.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use campus_core::event::SerializedEvent;
    use campus_core::event_store::{EventStore, EventStoreError};
    use campus_core::stream::{StreamId, Version};
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::{Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use campus_testing::mocks::FixedClock;
    /// use campus_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }

        /// Parse an RFC 3339 timestamp into a fixed clock.
        ///
        /// # Errors
        ///
        /// Returns the parse error for malformed input.
        pub fn at(rfc3339: &str) -> Result<Self, chrono::ParseError> {
            Ok(Self::new(
                DateTime::parse_from_rfc3339(rfc3339)?.with_timezone(&Utc),
            ))
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Never in practice; the timestamp is a literal.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::at("2025-01-01T00:00:00Z").expect("hardcoded timestamp should always parse")
    }

    /// In-memory event store.
    ///
    /// Keeps each stream as a vector sorted by version and refuses duplicate
    /// versions, matching the contract of the file-backed store.
    #[derive(Debug, Default)]
    pub struct InMemoryEventStore {
        streams: Mutex<HashMap<StreamId, Vec<SerializedEvent>>>,
    }

    impl InMemoryEventStore {
        /// Create an empty store
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of events stored in a stream
        #[must_use]
        pub fn event_count(&self, stream_id: &StreamId) -> usize {
            self.streams
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(stream_id)
                .map_or(0, Vec::len)
        }

        /// Event types of a stream, in version order
        #[must_use]
        pub fn event_types(&self, stream_id: &StreamId) -> Vec<String> {
            self.streams
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(stream_id)
                .map(|events| events.iter().map(|e| e.event_type.clone()).collect())
                .unwrap_or_default()
        }
    }

    impl EventStore for InMemoryEventStore {
        fn append_events(
            &self,
            stream_id: StreamId,
            events: Vec<SerializedEvent>,
        ) -> Pin<Box<dyn Future<Output = Result<Version, EventStoreError>> + Send + '_>> {
            Box::pin(async move {
                let mut streams = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
                let stream = streams.entry(stream_id.clone()).or_default();

                for event in &events {
                    if stream.iter().any(|e| e.version == event.version) {
                        return Err(EventStoreError::VersionConflict {
                            stream_id,
                            version: event.version,
                        });
                    }
                }

                stream.extend(events);
                stream.sort_by_key(|e| e.version);

                Ok(stream.last().map_or(Version::INITIAL, |e| e.version))
            })
        }

        fn load_events(
            &self,
            stream_id: StreamId,
            from_version: Option<Version>,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<SerializedEvent>, EventStoreError>> + Send + '_>>
        {
            Box::pin(async move {
                let streams = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
                let from = from_version.unwrap_or(Version::INITIAL);

                Ok(streams
                    .get(&stream_id)
                    .map(|events| {
                        events
                            .iter()
                            .filter(|e| e.version >= from)
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default())
            })
        }
    }
}

pub use mocks::{FixedClock, InMemoryEventStore, test_clock};
