//! Durable event log and startup replay.
//!
//! [`FileEventStore`] appends one JSON object per line:
//!
//! ```text
//! {"stream_id":"campus-portal","version":3,"event_type":"StudentRegistered.v1","data":{...},"recorded_at":"..."}
//! ```
//!
//! Appends are serialized by a mutex and refuse versions already present, so
//! a stream never holds two events at the same position. The store tracks the
//! length of the intact log: a failed write is cut back to it, and a tail that
//! is not ours is cut before the next append. [`replay`] reads a stream back in
//! version order and folds it through the portal reducer.

use crate::aggregates::{PortalAction, PortalEnvironment, PortalReducer};
use crate::types::PortalState;
use campus_core::{
    event::SerializedEvent,
    event_store::{EventStore, EventStoreError},
    reducer::Reducer,
    stream::{StreamId, Version},
};
use campus_runtime::metrics::EventLogMetrics;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// One line of the log.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEvent {
    stream_id: StreamId,
    #[serde(flatten)]
    event: SerializedEvent,
}

/// Parsed log plus the byte length of its intact prefix.
struct LogContents {
    events: Vec<StoredEvent>,
    intact_len: u64,
    torn: bool,
}

/// Writer state guarded by the store mutex.
#[derive(Debug, Default)]
struct LogIndex {
    /// Versions written so far, per stream
    versions: HashMap<StreamId, BTreeSet<Version>>,
    /// Length of the log up to its last complete line
    len: u64,
}

/// Append-only JSON-lines event store.
#[derive(Debug)]
pub struct FileEventStore {
    path: PathBuf,
    index: Mutex<LogIndex>,
}

impl FileEventStore {
    /// Open (or create) the log at `path`.
    ///
    /// Parent directories are created as needed and existing lines are
    /// indexed so that later appends detect version conflicts.
    ///
    /// # Errors
    ///
    /// - `IoError` if the file or its directory cannot be created or read
    /// - `SerializationError` if an existing line is corrupt
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, EventStoreError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let log = read_log(&path).await?;
        if log.torn {
            cut_to(&path, log.intact_len).await?;
        }

        let mut versions: HashMap<StreamId, BTreeSet<Version>> = HashMap::new();
        for stored in log.events {
            versions
                .entry(stored.stream_id)
                .or_default()
                .insert(stored.event.version);
        }

        let total: usize = versions.values().map(BTreeSet::len).sum();
        tracing::info!(path = %path.display(), events = total, "Opened event log");

        Ok(Self {
            path,
            index: Mutex::new(LogIndex {
                versions,
                len: log.intact_len,
            }),
        })
    }

    /// Location of the log.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Truncate the log to `len` bytes.
async fn cut_to(path: &Path, len: u64) -> Result<(), EventStoreError> {
    let file = tokio::fs::OpenOptions::new().write(true).open(path).await?;
    file.set_len(len).await?;
    tracing::warn!(path = %path.display(), len, "Cut truncated tail off event log");
    Ok(())
}

/// Parse every line of the log.
///
/// A final line without its newline is a write cut short by a crash; it is
/// skipped with a warning and reported as torn. Any other malformed line is
/// an error.
async fn read_log(path: &Path) -> Result<LogContents, EventStoreError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return Ok(LogContents {
                events: Vec::new(),
                intact_len: 0,
                torn: false,
            });
        },
        Err(error) => return Err(error.into()),
    };

    let complete = content.is_empty() || content.ends_with('\n');
    let lines: Vec<&str> = content.lines().collect();
    let mut events = Vec::with_capacity(lines.len());

    for (index, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<StoredEvent>(line) {
            Ok(stored) => events.push(stored),
            Err(error) if !complete && index + 1 == lines.len() => {
                tracing::warn!(%error, line = index + 1, "Ignoring truncated last line of event log");
            },
            Err(error) => {
                return Err(EventStoreError::SerializationError(format!(
                    "line {}: {error}",
                    index + 1
                )));
            },
        }
    }

    let intact_len = if complete {
        content.len()
    } else {
        content.rfind('\n').map_or(0, |i| i + 1)
    };
    Ok(LogContents {
        events,
        intact_len: intact_len as u64,
        torn: !complete,
    })
}

impl EventStore for FileEventStore {
    fn append_events(
        &self,
        stream_id: StreamId,
        events: Vec<SerializedEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<Version, EventStoreError>> + Send + '_>> {
        Box::pin(async move {
            let start = Instant::now();
            let mut index = self.index.lock().await;
            let LogIndex { versions, len } = &mut *index;
            let known = versions.entry(stream_id.clone()).or_default();

            let mut batch = BTreeSet::new();
            for event in &events {
                if known.contains(&event.version) || !batch.insert(event.version) {
                    return Err(EventStoreError::VersionConflict {
                        stream_id,
                        version: event.version,
                    });
                }
            }

            let count = events.len();
            let mut buffer = String::new();
            for event in events {
                let stored = StoredEvent {
                    stream_id: stream_id.clone(),
                    event,
                };
                buffer.push_str(&serde_json::to_string(&stored)?);
                buffer.push('\n');
            }

            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;

            let on_disk = file.metadata().await?.len();
            if on_disk != *len {
                tracing::warn!(on_disk, expected = *len, "Event log has an unexpected tail");
                file.set_len(*len).await?;
            }

            let written = async {
                file.write_all(buffer.as_bytes()).await?;
                file.sync_data().await
            }
            .await;
            if let Err(error) = written {
                if let Err(cut) = file.set_len(*len).await {
                    tracing::error!(error = %cut, "Could not cut failed append off event log");
                }
                return Err(error.into());
            }

            *len += buffer.len() as u64;
            known.extend(batch);
            EventLogMetrics::record_append(count, start.elapsed());
            tracing::debug!(stream = %stream_id, count, "Appended events");

            Ok(known.last().copied().unwrap_or(Version::INITIAL))
        })
    }

    fn load_events(
        &self,
        stream_id: StreamId,
        from_version: Option<Version>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SerializedEvent>, EventStoreError>> + Send + '_>>
    {
        Box::pin(async move {
            // Hold the writer lock so a half-written append is never observed.
            let _guard = self.index.lock().await;
            let from = from_version.unwrap_or(Version::INITIAL);

            let log = read_log(&self.path).await?;
            let mut events: Vec<SerializedEvent> = log
                .events
                .into_iter()
                .filter(|stored| stored.stream_id == stream_id && stored.event.version >= from)
                .map(|stored| stored.event)
                .collect();
            events.sort_by_key(|e| e.version);

            EventLogMetrics::record_load(events.len());
            Ok(events)
        })
    }
}

/// Rebuild the portal state from its stream.
///
/// Events are decoded back into [`PortalAction`]s and reduced in version
/// order; the resulting state carries the version of the last event so new
/// events continue the sequence.
///
/// # Errors
///
/// Returns an error if the log cannot be read or an event cannot be decoded.
pub async fn replay(
    store: &dyn EventStore,
    env: &PortalEnvironment,
) -> Result<PortalState, EventStoreError> {
    let events = store.load_events(env.stream_id.clone(), None).await?;
    let reducer = PortalReducer::new();
    let mut state = PortalState::new();

    for serialized in &events {
        let action: PortalAction = serialized.decode().map_err(|error| {
            EventStoreError::SerializationError(format!(
                "{} (version {}): {error}",
                serialized.event_type, serialized.version
            ))
        })?;

        let effects = reducer.reduce(&mut state, action, env);
        if !effects.is_empty() {
            tracing::warn!(version = %serialized.version, "Replayed event produced effects");
        }
        state.version = serialized.version;
    }

    tracing::info!(
        events = events.len(),
        version = %state.version,
        event_count = state.events.len(),
        od_requests = state.od_requests.len(),
        "Portal state rebuilt"
    );

    Ok(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn event(version: u64) -> SerializedEvent {
        SerializedEvent::new(
            Version::new(version),
            "Test.v1".to_string(),
            json!({"n": version}),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn appends_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log").join("events.jsonl");
        let stream = StreamId::new("s");

        let store = FileEventStore::open(&path).await.unwrap();
        store
            .append_events(stream.clone(), vec![event(2), event(1)])
            .await
            .unwrap();
        store.append_events(stream.clone(), vec![event(3)]).await.unwrap();
        drop(store);

        let reopened = FileEventStore::open(&path).await.unwrap();
        let versions: Vec<u64> = reopened
            .load_events(stream.clone(), None)
            .await
            .unwrap()
            .iter()
            .map(|e| e.version.value())
            .collect();
        assert_eq!(versions, vec![1, 2, 3]);

        let tail = reopened
            .load_events(stream, Some(Version::new(3)))
            .await
            .unwrap();
        assert_eq!(tail.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_versions_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileEventStore::open(dir.path().join("events.jsonl"))
            .await
            .unwrap();
        let stream = StreamId::new("s");

        store.append_events(stream.clone(), vec![event(1)]).await.unwrap();
        let result = store.append_events(stream.clone(), vec![event(1)]).await;
        assert!(matches!(result, Err(EventStoreError::VersionConflict { .. })));

        let result = store
            .append_events(stream.clone(), vec![event(2), event(2)])
            .await;
        assert!(matches!(result, Err(EventStoreError::VersionConflict { .. })));

        assert_eq!(store.load_events(stream, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn streams_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileEventStore::open(dir.path().join("events.jsonl"))
            .await
            .unwrap();

        store
            .append_events(StreamId::new("a"), vec![event(1)])
            .await
            .unwrap();
        store
            .append_events(StreamId::new("b"), vec![event(1)])
            .await
            .unwrap();

        let a = store.load_events(StreamId::new("a"), None).await.unwrap();
        assert_eq!(a.len(), 1);
        assert!(
            store
                .load_events(StreamId::new("c"), None)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn truncated_last_line_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        let store = FileEventStore::open(&path).await.unwrap();
        store
            .append_events(StreamId::new("s"), vec![event(1)])
            .await
            .unwrap();
        drop(store);

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .await
            .unwrap();
        file.write_all(b"{\"stream_id\":\"s\",\"vers").await.unwrap();
        drop(file);

        let reopened = FileEventStore::open(&path).await.unwrap();
        reopened
            .append_events(StreamId::new("s"), vec![event(2)])
            .await
            .unwrap();

        let events = reopened
            .load_events(StreamId::new("s"), None)
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn partial_write_on_live_store_does_not_poison_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let stream = StreamId::new("s");

        let store = FileEventStore::open(&path).await.unwrap();
        store.append_events(stream.clone(), vec![event(1)]).await.unwrap();

        // Bytes left behind by a write that failed halfway.
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .await
            .unwrap();
        file.write_all(b"{\"stream_id\":\"s\",\"vers").await.unwrap();
        drop(file);

        store.append_events(stream.clone(), vec![event(2)]).await.unwrap();
        assert_eq!(store.load_events(stream.clone(), None).await.unwrap().len(), 2);
        drop(store);

        let reopened = FileEventStore::open(&path).await.unwrap();
        let versions: Vec<u64> = reopened
            .load_events(stream, None)
            .await
            .unwrap()
            .iter()
            .map(|e| e.version.value())
            .collect();
        assert_eq!(versions, vec![1, 2]);

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.ends_with('\n'));
    }

    #[tokio::test]
    async fn corrupt_line_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        tokio::fs::write(&path, "not json\n").await.unwrap();

        let result = FileEventStore::open(&path).await;
        assert!(matches!(result, Err(EventStoreError::SerializationError(_))));
    }
}
