//! The capture pipeline context object.
//!
//! Owns the window tracker, the aggregator, the persistence merger, and the
//! durable store, and threads every key event through them in order. All
//! session state lives here; there are no ambient singletons.

use crate::collector::types::{KeyEvent, KeyId};
use crate::core::aggregate::{render_compact, TrigramAggregator, TrigramOutcome};
use crate::core::persist::{DurableStore, PersistError, PersistenceMerger, SaveOutcome};
use crate::core::window::WindowTracker;
use crate::transparency::SharedTransparencyLog;
use uuid::Uuid;

/// What happened while processing one key event.
#[derive(Debug)]
pub struct EventOutcome {
    /// Completed trigram, if the window was full
    pub trigram: Option<TrigramOutcome>,
    /// Save attempt result, if the event carried the trigger key
    pub save: Option<Result<SaveOutcome, PersistError>>,
}

/// One capture session: tracker, aggregator, and merger wired together over a
/// durable store.
pub struct CapturePipeline<S: DurableStore> {
    session_id: Uuid,
    tracker: WindowTracker,
    aggregator: TrigramAggregator,
    merger: PersistenceMerger,
    store: S,
    save_trigger: KeyId,
    log: SharedTransparencyLog,
    last_event_ms: f64,
}

impl<S: DurableStore> CapturePipeline<S> {
    pub fn new(
        threshold_ms: f64,
        cooldown_ms: f64,
        save_trigger: KeyId,
        store: S,
        log: SharedTransparencyLog,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            tracker: WindowTracker::new(),
            aggregator: TrigramAggregator::new(threshold_ms),
            merger: PersistenceMerger::new(cooldown_ms),
            store,
            save_trigger,
            log,
            last_event_ms: 0.0,
        }
    }

    /// Unique id for this capture session.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Process one key-press event.
    ///
    /// The event enters the window first (the trigger key is an ordinary key
    /// press too), then the save attempt runs with the event's timestamp as
    /// `now`. After a successful save the session map is drained: its samples
    /// now live durably, and keeping them would re-merge (and duplicate) them
    /// on the next save cycle. A failed save keeps them for retry.
    pub fn on_key_event(&mut self, event: KeyEvent) -> EventOutcome {
        self.log.record_key_event();
        let now_ms = event.timestamp_ms;
        self.last_event_ms = now_ms;
        let triggered = event.key == self.save_trigger;

        let trigram = self.tracker.on_key_event(event).map(|completed| {
            let outcome = self.aggregator.record(completed);
            match outcome {
                TrigramOutcome::Recorded { .. } => self.log.record_trigram_recorded(),
                TrigramOutcome::Rejected { .. } => self.log.record_trigram_rejected(),
            }
            outcome
        });

        let save = if triggered {
            let result =
                self.merger
                    .maybe_save(&mut self.store, self.aggregator.snapshot(), now_ms, true);
            match &result {
                Ok(SaveOutcome::Saved) => {
                    self.log.record_save_completed();
                    self.aggregator.clear();
                }
                Ok(SaveOutcome::Skipped(_)) => self.log.record_save_skipped(),
                Err(_) => {}
            }
            Some(result)
        } else {
            None
        };

        EventOutcome { trigram, save }
    }

    /// End-of-session merge, bypassing the trigger and cooldown gate.
    ///
    /// No-op when the session map is empty.
    pub fn finish(&mut self) -> Result<(), PersistError> {
        if self.aggregator.snapshot().is_empty() {
            return Ok(());
        }
        self.merger
            .flush(&mut self.store, self.aggregator.snapshot(), self.last_event_ms)?;
        self.log.record_save_completed();
        self.aggregator.clear();
        Ok(())
    }

    /// Compact human-readable rendering of the current session map.
    pub fn render_session(&self) -> String {
        render_compact(self.aggregator.snapshot())
    }

    pub fn aggregator(&self) -> &TrigramAggregator {
        &self.aggregator
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the pipeline and hand back its durable store.
    pub fn into_store(self) -> S {
        self.store
    }
}
