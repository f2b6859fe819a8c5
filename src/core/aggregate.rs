//! Per-trigram latency aggregation for the current session.
//!
//! Completed trigrams arrive from the window tracker; those under the delay
//! threshold are appended to the session map in capture order. Rejections are
//! ordinary filtering, reported to the caller as a diagnostic outcome rather
//! than an error.

use crate::core::window::{CompletedTrigram, TrigramKey};
use std::collections::HashMap;

/// The session's in-memory mapping from trigram identity to latency samples.
///
/// Sample order is capture order. The map grows monotonically for the
/// session's duration; it never shrinks except through [`TrigramAggregator::clear`].
pub type SessionStore = HashMap<TrigramKey, Vec<f64>>;

/// Result of offering one completed trigram to the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub enum TrigramOutcome {
    /// The span was below the threshold and was appended
    Recorded { key: TrigramKey, span_ms: f64 },
    /// The span met or exceeded the threshold; nothing was mutated
    Rejected { key: TrigramKey, span_ms: f64 },
}

/// Accumulates latency samples per trigram, applying the delay filter.
#[derive(Debug)]
pub struct TrigramAggregator {
    samples: SessionStore,
    threshold_ms: f64,
}

impl TrigramAggregator {
    pub fn new(threshold_ms: f64) -> Self {
        Self {
            samples: SessionStore::new(),
            threshold_ms,
        }
    }

    /// Offer a completed trigram.
    ///
    /// Appends the span iff it is strictly below the threshold.
    pub fn record(&mut self, trigram: CompletedTrigram) -> TrigramOutcome {
        let CompletedTrigram { key, span_ms } = trigram;
        if span_ms < self.threshold_ms {
            self.samples.entry(key.clone()).or_default().push(span_ms);
            TrigramOutcome::Recorded { key, span_ms }
        } else {
            TrigramOutcome::Rejected { key, span_ms }
        }
    }

    /// Read-only view of everything recorded so far.
    ///
    /// All key events are processed on a single execution path, so the view
    /// is never torn: it reflects every sample recorded before the call and
    /// none after.
    pub fn snapshot(&self) -> &SessionStore {
        &self.samples
    }

    /// Clear the session map. Does not touch the durable store.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn threshold_ms(&self) -> f64 {
        self.threshold_ms
    }

    /// Total number of samples across all trigrams.
    pub fn sample_count(&self) -> usize {
        self.samples.values().map(Vec::len).sum()
    }
}

/// Render a session store as compact, human-readable text.
///
/// One line per trigram with its samples inline, keys sorted for stable
/// output:
///
/// ```text
/// {
///     "KeyA,KeyB,KeyC": [123.4, 98.1],
///     "KeyB,KeyC,KeyD": [210.0]
/// }
/// ```
///
/// Purely observational - not meant for round-trip parsing.
pub fn render_compact(store: &SessionStore) -> String {
    let mut entries: Vec<(String, &Vec<f64>)> = store
        .iter()
        .map(|(key, samples)| (key.storage_key(), samples))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    render_lines(&entries)
}

/// Render a parsed persisted store in the same compact form.
pub fn render_persisted(store: &std::collections::BTreeMap<String, Vec<f64>>) -> String {
    let entries: Vec<(String, &Vec<f64>)> = store
        .iter()
        .map(|(key, samples)| (key.clone(), samples))
        .collect();
    render_lines(&entries)
}

fn render_lines(entries: &[(String, &Vec<f64>)]) -> String {
    let mut out = String::from("{\n");
    for (i, (key, samples)) in entries.iter().enumerate() {
        let rendered: Vec<String> = samples.iter().map(|s| format!("{s}")).collect();
        out.push_str(&format!("    \"{key}\": [{}]", rendered.join(", ")));
        if i + 1 < entries.len() {
            out.push(',');
        }
        out.push('\n');
    }
    out.push('}');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::window::TrigramKey;

    fn abc() -> TrigramKey {
        TrigramKey::new("KeyA".into(), "KeyB".into(), "KeyC".into())
    }

    fn trigram(span_ms: f64) -> CompletedTrigram {
        CompletedTrigram { key: abc(), span_ms }
    }

    #[test]
    fn test_record_below_threshold() {
        let mut agg = TrigramAggregator::new(750.0);
        let outcome = agg.record(trigram(300.0));

        assert!(matches!(outcome, TrigramOutcome::Recorded { .. }));
        assert_eq!(agg.snapshot()[&abc()], vec![300.0]);
    }

    #[test]
    fn test_reject_at_or_above_threshold() {
        let mut agg = TrigramAggregator::new(200.0);
        let outcome = agg.record(trigram(300.0));

        assert!(matches!(outcome, TrigramOutcome::Rejected { span_ms, .. } if span_ms == 300.0));
        assert!(agg.snapshot().is_empty());

        // Exactly at threshold is also rejected (strictly-below filter).
        let outcome = agg.record(trigram(200.0));
        assert!(matches!(outcome, TrigramOutcome::Rejected { .. }));
        assert!(agg.snapshot().is_empty());
    }

    #[test]
    fn test_samples_append_in_capture_order() {
        let mut agg = TrigramAggregator::new(750.0);
        agg.record(trigram(300.0));
        agg.record(trigram(150.0));
        agg.record(trigram(420.5));

        assert_eq!(agg.snapshot()[&abc()], vec![300.0, 150.0, 420.5]);
        assert_eq!(agg.sample_count(), 3);
    }

    #[test]
    fn test_clear_empties_session_only() {
        let mut agg = TrigramAggregator::new(750.0);
        agg.record(trigram(300.0));
        agg.clear();
        assert!(agg.snapshot().is_empty());
    }

    #[test]
    fn test_render_compact() {
        let mut agg = TrigramAggregator::new(750.0);
        agg.record(trigram(300.0));
        agg.record(trigram(98.1));

        let text = render_compact(agg.snapshot());
        assert_eq!(text, "{\n    \"KeyA,KeyB,KeyC\": [300, 98.1]\n}");
    }

    #[test]
    fn test_render_compact_empty() {
        assert_eq!(render_compact(&SessionStore::new()), "{\n}");
    }

    #[test]
    fn test_render_persisted() {
        let mut store = std::collections::BTreeMap::new();
        store.insert("KeyA,KeyB,KeyC".to_string(), vec![123.4, 98.1]);
        let text = render_persisted(&store);
        assert_eq!(text, "{\n    \"KeyA,KeyB,KeyC\": [123.4, 98.1]\n}");
    }
}
