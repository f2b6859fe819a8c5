//! End-to-end tests: JSONL events in, persisted JSON out.

use std::io::Cursor;
use trigram_sensor::{
    collector::{KeyEvent, ReplaySource},
    core::{
        load_persisted, CapturePipeline, MemoryStore, PersistenceMerger, SaveOutcome, STORE_KEY,
    },
    transparency::create_shared_log,
};

fn pipeline_with(store: MemoryStore) -> CapturePipeline<MemoryStore> {
    CapturePipeline::new(750.0, 5000.0, "Tab".into(), store, create_shared_log())
}

#[test]
fn fast_trigram_is_recorded() {
    // Events (A, t=0), (B, t=100), (C, t=300) with threshold 750 produce one
    // sample of 300ms for (A,B,C).
    let mut pipeline = pipeline_with(MemoryStore::new());
    pipeline.on_key_event(KeyEvent::new("A", 0.0));
    pipeline.on_key_event(KeyEvent::new("B", 100.0));
    pipeline.on_key_event(KeyEvent::new("C", 300.0));

    assert_eq!(pipeline.render_session(), "{\n    \"A,B,C\": [300]\n}");
}

#[test]
fn slow_trigram_is_filtered() {
    // Same events with threshold 200: rejected, session stays empty.
    let mut pipeline =
        CapturePipeline::new(200.0, 5000.0, "Tab".into(), MemoryStore::new(), create_shared_log());
    pipeline.on_key_event(KeyEvent::new("A", 0.0));
    pipeline.on_key_event(KeyEvent::new("B", 100.0));
    pipeline.on_key_event(KeyEvent::new("C", 300.0));

    assert_eq!(pipeline.render_session(), "{\n}");
}

#[test]
fn merge_prepends_session_samples() {
    // Persisted {"A,B,C": [50]} + session {"A,B,C": [300]} merges to
    // {"A,B,C": [300, 50]}: session data ahead of previously persisted data.
    let mut store = MemoryStore::new();
    store.seed(STORE_KEY, r#"{"A,B,C": [50.0]}"#);

    let mut pipeline = pipeline_with(store);
    pipeline.on_key_event(KeyEvent::new("A", 6000.0));
    pipeline.on_key_event(KeyEvent::new("B", 6100.0));
    pipeline.on_key_event(KeyEvent::new("C", 6300.0));
    let outcome = pipeline.on_key_event(KeyEvent::new("Tab", 6400.0));
    assert!(matches!(outcome.save, Some(Ok(SaveOutcome::Saved))));

    let persisted = load_persisted(pipeline.store()).unwrap();
    assert_eq!(persisted["A,B,C"], vec![300.0, 50.0]);
}

#[test]
fn reset_clears_persisted_but_not_session() {
    let mut store = MemoryStore::new();
    store.seed(STORE_KEY, r#"{"A,B,C": [50.0]}"#);

    let mut pipeline = pipeline_with(store);
    pipeline.on_key_event(KeyEvent::new("A", 0.0));
    pipeline.on_key_event(KeyEvent::new("B", 100.0));
    pipeline.on_key_event(KeyEvent::new("C", 300.0));

    let mut outside = MemoryStore::new();
    outside.seed(STORE_KEY, r#"{"A,B,C": [50.0]}"#);
    PersistenceMerger::reset(&mut outside).unwrap();
    assert_eq!(outside.get(STORE_KEY), Some("{}"));

    // The in-memory session is unaffected by a reset of the durable store.
    assert_eq!(pipeline.aggregator().sample_count(), 1);
}

#[test]
fn replay_stream_end_to_end() {
    let input = "\
{\"key\": \"A\", \"timestamp_ms\": 6000.0}\n\
{\"key\": \"B\", \"timestamp_ms\": 6100.0}\n\
not an event\n\
{\"key\": \"C\", \"timestamp_ms\": 6300.0}\n\
{\"key\": \"Tab\", \"timestamp_ms\": 6400.0}\n";

    let source = ReplaySource::spawn(Cursor::new(input.to_string()));
    let log = create_shared_log();
    let mut pipeline =
        CapturePipeline::new(750.0, 5000.0, "Tab".into(), MemoryStore::new(), log.clone());

    let mut invalid = 0;
    for item in source.receiver().iter() {
        match item {
            Ok(event) => {
                pipeline.on_key_event(event);
            }
            Err(_) => {
                log.record_invalid_event();
                invalid += 1;
            }
        }
    }

    // The malformed line was dropped without disturbing the window: the
    // A,B,C trigram still completes and Tab persists it.
    assert_eq!(invalid, 1);
    let persisted = load_persisted(pipeline.store()).unwrap();
    assert_eq!(persisted["A,B,C"], vec![300.0]);
    assert_eq!(persisted["B,C,Tab"], vec![300.0]);

    let stats = log.stats();
    assert_eq!(stats.key_events, 4);
    assert_eq!(stats.invalid_events, 1);
    assert_eq!(stats.trigrams_recorded, 2);
    assert_eq!(stats.saves_completed, 1);
}

#[test]
fn multiple_sessions_accumulate_without_loss() {
    // Session one persists, session two merges on top; nothing from session
    // one is lost or duplicated.
    let mut store = MemoryStore::new();

    {
        let mut pipeline = pipeline_with(std::mem::take(&mut store));
        pipeline.on_key_event(KeyEvent::new("A", 0.0));
        pipeline.on_key_event(KeyEvent::new("B", 100.0));
        pipeline.on_key_event(KeyEvent::new("C", 250.0));
        pipeline.finish().unwrap();
        store = pipeline.into_store();
    }

    {
        let mut pipeline = pipeline_with(store);
        pipeline.on_key_event(KeyEvent::new("A", 0.0));
        pipeline.on_key_event(KeyEvent::new("B", 80.0));
        pipeline.on_key_event(KeyEvent::new("C", 200.0));
        pipeline.finish().unwrap();

        let persisted = load_persisted(pipeline.store()).unwrap();
        // New session's sample sits ahead of the older persisted one.
        assert_eq!(persisted["A,B,C"], vec![200.0, 250.0]);
    }
}
