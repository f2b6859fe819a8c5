//! Event types for the trigram sensor.
//!
//! Key identifiers are opaque tokens - the engine never interprets them, it
//! only compares and hashes them.

use serde::{Deserialize, Serialize};

/// An opaque key identifier (e.g. `"KeyA"`, `"Space"`, `"Tab"`).
///
/// The engine treats identifiers as atomic tokens. Any non-empty string is a
/// valid identifier, including ones containing the `,` separator used in the
/// persisted string form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(String);

impl KeyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KeyId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for KeyId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A single key-press notification delivered by the host.
///
/// Ephemeral: consumed by the window tracker on arrival, never stored beyond
/// the current 3-event window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Which key was pressed
    pub key: KeyId,
    /// Monotonic timestamp in milliseconds, sub-millisecond resolution
    pub timestamp_ms: f64,
}

impl KeyEvent {
    pub fn new(key: impl Into<KeyId>, timestamp_ms: f64) -> Self {
        Self {
            key: key.into(),
            timestamp_ms,
        }
    }

    /// Validate an event before it enters the pipeline.
    ///
    /// Invalid events are dropped and reported as diagnostics; the window is
    /// never mutated by them.
    pub fn validate(self) -> Result<Self, InvalidEventError> {
        if self.key.as_str().is_empty() {
            return Err(InvalidEventError::EmptyKey);
        }
        if !self.timestamp_ms.is_finite() || self.timestamp_ms < 0.0 {
            return Err(InvalidEventError::BadTimestamp(self.timestamp_ms));
        }
        Ok(self)
    }
}

/// Errors for malformed key events.
#[derive(Debug)]
pub enum InvalidEventError {
    /// The event line was not a valid event object
    Malformed(String),
    /// The key identifier was empty
    EmptyKey,
    /// The timestamp was negative, NaN, or infinite
    BadTimestamp(f64),
}

impl std::fmt::Display for InvalidEventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidEventError::Malformed(e) => write!(f, "malformed event: {e}"),
            InvalidEventError::EmptyKey => write!(f, "event has an empty key identifier"),
            InvalidEventError::BadTimestamp(t) => write!(f, "event has invalid timestamp {t}"),
        }
    }
}

impl std::error::Error for InvalidEventError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_validation() {
        assert!(KeyEvent::new("KeyA", 12.5).validate().is_ok());
        assert!(matches!(
            KeyEvent::new("", 12.5).validate(),
            Err(InvalidEventError::EmptyKey)
        ));
        assert!(matches!(
            KeyEvent::new("KeyA", f64::NAN).validate(),
            Err(InvalidEventError::BadTimestamp(_))
        ));
        assert!(matches!(
            KeyEvent::new("KeyA", -1.0).validate(),
            Err(InvalidEventError::BadTimestamp(_))
        ));
    }

    #[test]
    fn test_key_id_roundtrip() {
        let id = KeyId::new("KeyA");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"KeyA\"");
        let back: KeyId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
