//! Session transparency log.
//!
//! Tracks and exposes statistics about the capture session: how many events
//! arrived, how many trigrams were recorded or filtered, and how saves went.
//! No key identifiers or latencies are stored here, only counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Transparency statistics for the current session.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Number of key events processed
    key_events: AtomicU64,
    /// Number of malformed events dropped
    invalid_events: AtomicU64,
    /// Number of trigram samples recorded
    trigrams_recorded: AtomicU64,
    /// Number of trigrams filtered out by the delay threshold
    trigrams_rejected: AtomicU64,
    /// Number of completed merge-and-save cycles
    saves_completed: AtomicU64,
    /// Number of skipped save attempts (no trigger counts excluded)
    saves_skipped: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl TransparencyLog {
    /// Create a new transparency log.
    pub fn new() -> Self {
        Self {
            key_events: AtomicU64::new(0),
            invalid_events: AtomicU64::new(0),
            trigrams_recorded: AtomicU64::new(0),
            trigrams_rejected: AtomicU64::new(0),
            saves_completed: AtomicU64::new(0),
            saves_skipped: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a transparency log with persistence.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        // Try to load existing stats
        if let Err(e) = log.load() {
            eprintln!("Note: Could not load previous transparency stats: {e}");
        }

        log
    }

    pub fn record_key_event(&self) {
        self.key_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_event(&self) {
        self.invalid_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trigram_recorded(&self) {
        self.trigrams_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trigram_rejected(&self) {
        self.trigrams_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_save_completed(&self) {
        self.saves_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_save_skipped(&self) {
        self.saves_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            key_events: self.key_events.load(Ordering::Relaxed),
            invalid_events: self.invalid_events.load(Ordering::Relaxed),
            trigrams_recorded: self.trigrams_recorded.load(Ordering::Relaxed),
            trigrams_rejected: self.trigrams_rejected.load(Ordering::Relaxed),
            saves_completed: self.saves_completed.load(Ordering::Relaxed),
            saves_skipped: self.saves_skipped.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds() as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Key events processed: {}\n\
             - Invalid events dropped: {}\n\
             - Trigram samples recorded: {}\n\
             - Trigrams filtered (too slow): {}\n\
             - Saves completed: {}\n\
             - Saves skipped: {}\n\
             - Session duration: {} seconds",
            stats.key_events,
            stats.invalid_events,
            stats.trigrams_recorded,
            stats.trigrams_rejected,
            stats.saves_completed,
            stats.saves_skipped,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                key_events: stats.key_events,
                invalid_events: stats.invalid_events,
                trigrams_recorded: stats.trigrams_recorded,
                trigrams_rejected: stats.trigrams_rejected,
                saves_completed: stats.saves_completed,
                saves_skipped: stats.saves_skipped,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load stats from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.key_events.store(persisted.key_events, Ordering::Relaxed);
                self.invalid_events
                    .store(persisted.invalid_events, Ordering::Relaxed);
                self.trigrams_recorded
                    .store(persisted.trigrams_recorded, Ordering::Relaxed);
                self.trigrams_rejected
                    .store(persisted.trigrams_rejected, Ordering::Relaxed);
                self.saves_completed
                    .store(persisted.saves_completed, Ordering::Relaxed);
                self.saves_skipped
                    .store(persisted.saves_skipped, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.key_events.store(0, Ordering::Relaxed);
        self.invalid_events.store(0, Ordering::Relaxed);
        self.trigrams_recorded.store(0, Ordering::Relaxed);
        self.trigrams_rejected.store(0, Ordering::Relaxed);
        self.saves_completed.store(0, Ordering::Relaxed);
        self.saves_skipped.store(0, Ordering::Relaxed);
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub key_events: u64,
    pub invalid_events: u64,
    pub trigrams_recorded: u64,
    pub trigrams_rejected: u64,
    pub saves_completed: u64,
    pub saves_skipped: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    key_events: u64,
    invalid_events: u64,
    trigrams_recorded: u64,
    trigrams_rejected: u64,
    saves_completed: u64,
    saves_skipped: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

/// Create a new shared transparency log.
pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}

/// Create a new shared transparency log with persistence.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedTransparencyLog {
    Arc::new(TransparencyLog::with_persistence(path))
}
