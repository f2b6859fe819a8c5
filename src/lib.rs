//! Trigram Sensor - keystroke trigram latency capture for typing-rhythm
//! research.
//!
//! This library captures fine-grained timing between consecutive keystrokes,
//! groups them into overlapping triples ("trigrams"), and accumulates
//! per-trigram latency samples which are merged into a durable JSON store.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Trigram Sensor                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌────────────┐   ┌────────────────┐        │
//! │  │  Collector │──▶│   Window   │──▶│   Aggregator   │        │
//! │  │  (JSONL)   │   │  (last 3)  │   │ (delay filter) │        │
//! │  └────────────┘   └────────────┘   └────────────────┘        │
//! │         │                                  │                  │
//! │         ▼                                  ▼                  │
//! │  ┌────────────┐                    ┌────────────────┐        │
//! │  │Transparency│                    │  Persistence   │        │
//! │  │    Log     │                    │    Merger      │        │
//! │  └────────────┘                    └────────────────┘        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every key-press event flows through the window tracker, which emits a
//! completed trigram once three events are held; the aggregator appends the
//! trigram's span to the session map when it beats the delay threshold; a
//! designated trigger key, rate-limited by a cooldown, merges the session's
//! samples into the durable store without overwriting previously persisted
//! sequences.
//!
//! # Example
//!
//! ```
//! use trigram_sensor::{
//!     collector::KeyEvent,
//!     core::{CapturePipeline, MemoryStore},
//!     transparency::create_shared_log,
//! };
//!
//! let mut pipeline = CapturePipeline::new(
//!     750.0,          // max trigram delay (ms)
//!     5000.0,         // save cooldown (ms)
//!     "Tab".into(),   // save trigger key
//!     MemoryStore::new(),
//!     create_shared_log(),
//! );
//!
//! pipeline.on_key_event(KeyEvent::new("KeyA", 0.0));
//! pipeline.on_key_event(KeyEvent::new("KeyB", 100.0));
//! pipeline.on_key_event(KeyEvent::new("KeyC", 300.0));
//! assert_eq!(pipeline.aggregator().sample_count(), 1);
//! ```

pub mod collector;
pub mod config;
pub mod core;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use collector::{InvalidEventError, KeyEvent, KeyId, ReplaySource};
pub use config::Config;
pub use core::{
    CapturePipeline, CompletedTrigram, DurableStore, FsStore, MemoryStore, PersistError,
    PersistenceMerger, SaveOutcome, SessionStore, SkipReason, TrigramAggregator, TrigramKey,
    TrigramOutcome, WindowTracker,
};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
