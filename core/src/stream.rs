//! Event stream identification and versioning types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for `StreamId` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid stream ID: {0}")]
pub struct ParseStreamIdError(String);

/// Identifier of one event stream.
///
/// The portal writes everything to a single `"campus-portal"` stream; the
/// type keeps stream names from being confused with other strings.
///
/// # Examples
///
/// ```
/// use campus_core::stream::StreamId;
///
/// let stream_id = StreamId::new("campus-portal");
/// assert_eq!(stream_id.as_str(), "campus-portal");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamId(String);

impl StreamId {
    /// Create a new `StreamId` from a trusted string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the stream ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StreamId {
    type Err = ParseStreamIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ParseStreamIdError("Stream ID cannot be empty".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

/// Position of an event inside its stream.
///
/// `Version::INITIAL` (0) means "no events yet"; the first event is version 1.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// Version of an empty stream.
    pub const INITIAL: Self = Self(0);

    /// Wrap a raw version number.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw version number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The version that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stream_id_is_rejected() {
        assert!("   ".parse::<StreamId>().is_err());
        assert_eq!(
            "campus-portal".parse::<StreamId>().ok(),
            Some(StreamId::new("campus-portal"))
        );
    }

    #[test]
    fn versions_advance_from_initial() {
        let first = Version::INITIAL.next();
        assert_eq!(first.value(), 1);
        assert!(first.next() > first);
        assert_eq!(Version::default(), Version::INITIAL);
    }
}
