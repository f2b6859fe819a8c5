//! Core functionality of the trigram sensor.
//!
//! This module contains:
//! - The sliding window tracker emitting completed trigrams
//! - Per-trigram latency aggregation with the delay filter
//! - The merge-and-save policy against the durable store
//! - The capture pipeline tying them together

pub mod aggregate;
pub mod persist;
pub mod pipeline;
pub mod window;

// Re-export commonly used types
pub use aggregate::{render_compact, render_persisted, SessionStore, TrigramAggregator, TrigramOutcome};
pub use persist::{
    load_persisted, DurableStore, Existing, FsStore, MemoryStore, PersistError, PersistenceMerger,
    SaveOutcome, SkipReason, StorageError, STORE_KEY,
};
pub use pipeline::{CapturePipeline, EventOutcome};
pub use window::{CompletedTrigram, TrigramKey, WindowTracker};
