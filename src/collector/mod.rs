//! Event ingress for the trigram sensor.
//!
//! The engine itself is source-agnostic: anything that produces `KeyEvent`s
//! in chronological order can drive it. This module provides the event types
//! and a JSONL replay source used by the CLI and tests.

pub mod replay;
pub mod types;

// Re-export commonly used types
pub use replay::{parse_event_line, ReplaySource};
pub use types::{InvalidEventError, KeyEvent, KeyId};
