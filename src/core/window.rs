//! Sliding window over the most recent key events.
//!
//! The tracker keeps the last three key presses and emits a completed trigram
//! every time the window is full, sliding by one event per press. The first
//! two events of a session never produce a trigram; that is expected, not an
//! error.

use crate::collector::types::{KeyEvent, KeyId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// The ordered identity of three consecutive key presses.
///
/// Order matters: `(a, b, c)` and `(c, b, a)` are distinct trigrams. Used
/// directly as a map key; the `a,b,c` string form exists only at the
/// persistence boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrigramKey([KeyId; 3]);

impl TrigramKey {
    pub fn new(first: KeyId, second: KeyId, third: KeyId) -> Self {
        Self([first, second, third])
    }

    pub fn keys(&self) -> &[KeyId; 3] {
        &self.0
    }

    /// Stable string form used as the key in the persisted store:
    /// the three identifiers joined by `,`.
    pub fn storage_key(&self) -> String {
        format!("{},{},{}", self.0[0], self.0[1], self.0[2])
    }
}

impl std::fmt::Display for TrigramKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{}", self.0[0], self.0[1], self.0[2])
    }
}

/// A trigram emitted by a full window.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTrigram {
    /// Identity of the three presses, in order
    pub key: TrigramKey,
    /// Elapsed time between the first and third press, in milliseconds
    pub span_ms: f64,
}

/// Tracks the most recent up-to-3 key events.
#[derive(Debug, Default)]
pub struct WindowTracker {
    window: VecDeque<KeyEvent>,
}

impl WindowTracker {
    pub fn new() -> Self {
        Self {
            window: VecDeque::with_capacity(4),
        }
    }

    /// Process one key press.
    ///
    /// Appends the event, evicts the oldest once the window would exceed
    /// three, and returns the completed trigram whenever exactly three
    /// events remain. The only side effect is the window mutation.
    pub fn on_key_event(&mut self, event: KeyEvent) -> Option<CompletedTrigram> {
        self.window.push_back(event);
        if self.window.len() > 3 {
            self.window.pop_front();
        }

        if self.window.len() == 3 {
            let key = TrigramKey::new(
                self.window[0].key.clone(),
                self.window[1].key.clone(),
                self.window[2].key.clone(),
            );
            let span_ms = self.window[2].timestamp_ms - self.window[0].timestamp_ms;
            Some(CompletedTrigram { key, span_ms })
        } else {
            None
        }
    }

    /// Number of events currently held (0..=3).
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}
