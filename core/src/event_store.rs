//! Event store trait and related types for event sourcing.
//!
//! The event store is an append-only log of serialized domain events, grouped
//! into streams. State is rebuilt at startup by replaying a stream in version
//! order through the same reducers that produced it.
//!
//! # Implementations
//!
//! - `FileEventStore` (in `campus-portal`): JSON lines on local disk
//! - `InMemoryEventStore` (in `campus-testing`): fast, deterministic testing
//!
//! # Example
//!
//! ```no_run
//! use campus_core::event_store::{EventStore, EventStoreError};
//! use campus_core::stream::StreamId;
//!
//! async fn replay<E: EventStore>(store: &E) -> Result<(), EventStoreError> {
//!     let events = store.load_events(StreamId::new("campus-portal"), None).await?;
//!     for event in events {
//!         println!("{event}");
//!     }
//!     Ok(())
//! }
//! ```

use crate::event::SerializedEvent;
use crate::stream::{StreamId, Version};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during event store operations.
#[derive(Error, Debug)]
pub enum EventStoreError {
    /// An event with this version was already written to the stream.
    #[error("Version conflict on stream {stream_id}: version {version} already exists")]
    VersionConflict {
        /// The stream where the conflict occurred.
        stream_id: StreamId,
        /// The duplicated version.
        version: Version,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// General I/O error.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for EventStoreError {
    fn from(error: std::io::Error) -> Self {
        Self::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for EventStoreError {
    fn from(error: serde_json::Error) -> Self {
        Self::SerializationError(error.to_string())
    }
}

/// Event store abstraction for storing and retrieving event streams.
///
/// # Ordering
///
/// Writers stamp every event with its version before appending. Appends may
/// reach the store out of order (effects run on independent tasks), so
/// implementations must return loaded events sorted by version and must refuse
/// a second event with an existing version.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// to enable trait object usage (`Arc<dyn EventStore>`). Reducers capture the
/// store inside effects.
pub trait EventStore: Send + Sync {
    /// Append events to a stream.
    ///
    /// Returns the highest version now stored in the stream.
    ///
    /// # Errors
    ///
    /// - `VersionConflict`: one of the versions is already present
    /// - `IoError` / `SerializationError`: the write failed
    fn append_events(
        &self,
        stream_id: StreamId,
        events: Vec<SerializedEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<Version, EventStoreError>> + Send + '_>>;

    /// Load events from a stream, ordered by version.
    ///
    /// `from_version` is inclusive; `None` loads everything. A stream that was
    /// never written to yields an empty vector.
    ///
    /// # Errors
    ///
    /// - `IoError`: the backing storage could not be read
    /// - `SerializationError`: a stored record is corrupt
    fn load_events(
        &self,
        stream_id: StreamId,
        from_version: Option<Version>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SerializedEvent>, EventStoreError>> + Send + '_>>;
}
