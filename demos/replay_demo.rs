//! Demonstration of the trigram capture pipeline.
//!
//! This example shows how to:
//! 1. Build a capture pipeline over an in-memory store
//! 2. Feed it key events
//! 3. Observe recorded and filtered trigrams
//! 4. Trigger a merge-and-save and inspect the persisted data
//!
//! Run with: cargo run --example replay_demo

use trigram_sensor::{
    collector::KeyEvent,
    core::{load_persisted, render_persisted, CapturePipeline, MemoryStore, TrigramOutcome},
    transparency::create_shared_log,
};

fn main() {
    println!("Trigram Sensor - Replay Demo");
    println!("============================");
    println!();

    let log = create_shared_log();
    let mut pipeline = CapturePipeline::new(
        750.0,        // delay threshold (ms)
        5000.0,       // save cooldown (ms)
        "Tab".into(), // save trigger key
        MemoryStore::new(),
        log.clone(),
    );
    println!("Session ID: {}", pipeline.session_id());
    println!();

    // A short burst of fast typing, one slow trigram, then the trigger key
    // late enough that the cooldown since session start has elapsed.
    let events = [
        KeyEvent::new("KeyT", 6000.0),
        KeyEvent::new("KeyH", 6080.0),
        KeyEvent::new("KeyE", 6170.0),
        KeyEvent::new("Space", 6300.0),
        KeyEvent::new("KeyQ", 8500.0), // long hesitation
        KeyEvent::new("KeyU", 8580.0),
        KeyEvent::new("KeyI", 8660.0),
        KeyEvent::new("Tab", 8800.0),
    ];

    for event in events {
        let label = format!("{} @ {}ms", event.key, event.timestamp_ms);
        let outcome = pipeline.on_key_event(event);

        match &outcome.trigram {
            Some(TrigramOutcome::Recorded { key, span_ms }) => {
                println!("  {label}: recorded [{key}] span {span_ms}ms");
            }
            Some(TrigramOutcome::Rejected { key, span_ms }) => {
                println!("  {label}: filtered [{key}] span {span_ms}ms");
            }
            None => {
                println!("  {label}: window filling");
            }
        }

        if let Some(save) = outcome.save {
            match save {
                Ok(result) => println!("  {label}: save -> {result:?}"),
                Err(e) => println!("  {label}: save failed: {e}"),
            }
        }
    }

    println!();
    println!("Persisted store after the trigger:");
    let persisted = load_persisted(pipeline.store()).expect("in-memory read cannot fail");
    println!("{}", render_persisted(&persisted));

    println!();
    println!("{}", log.summary());
}
