//! Merge-and-save of session samples into the durable store.
//!
//! The durable medium is a key-value collaborator holding one logical entry,
//! `"trigram_data"`, whose value is a flat JSON mapping from the `a,b,c`
//! trigram string form to an array of millisecond latencies. Saves are gated
//! by an external trigger and a cooldown; the merge is computed fully in
//! memory and written as a single atomic replace, so a failed save never
//! corrupts previously persisted content.

use crate::core::aggregate::SessionStore;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

/// The single logical storage key used by the engine.
pub const STORE_KEY: &str = "trigram_data";

/// Errors from the durable storage collaborator.
#[derive(Debug)]
pub enum StorageError {
    Io(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "storage IO error: {e}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// The durable key-value storage seam.
///
/// Both operations are synchronous from the engine's perspective. `read`
/// distinguishes an absent key from a failed read so a transient failure is
/// never mistaken for an empty store.
pub trait DurableStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// File-backed store: each logical key maps to `<dir>/<key>.json`.
///
/// Writes go to a temp file first and are moved into place with a rename, so
/// the visible file is always a complete serialization.
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl DurableStore for FsStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StorageError::Io(e.to_string()))?;

        let tmp_path = self.dir.join(format!("{key}.json.tmp"));
        let mut tmp =
            std::fs::File::create(&tmp_path).map_err(|e| StorageError::Io(e.to_string()))?;
        tmp.write_all(value.as_bytes())
            .map_err(|e| StorageError::Io(e.to_string()))?;
        tmp.sync_all().map_err(|e| StorageError::Io(e.to_string()))?;
        drop(tmp);

        std::fs::rename(&tmp_path, self.path_for(key))
            .map_err(|e| StorageError::Io(e.to_string()))
    }
}

/// In-memory store for tests and demos, with write-failure injection and
/// operation counters.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: std::collections::HashMap<String, String>,
    /// When set, every write fails
    pub fail_writes: bool,
    reads: std::cell::Cell<u64>,
    writes: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a logical key with raw content.
    pub fn seed(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Total read operations performed.
    pub fn read_count(&self) -> u64 {
        self.reads.get()
    }

    /// Total successful write operations performed.
    pub fn write_count(&self) -> u64 {
        self.writes
    }
}

impl DurableStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.reads.set(self.reads.get() + 1);
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Io("injected write failure".to_string()));
        }
        self.entries.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }
}

/// Errors surfaced by a save attempt.
///
/// Fatal to that attempt only: session data stays in memory and the save is
/// retried on the next qualifying trigger.
#[derive(Debug)]
pub enum PersistError {
    Storage(StorageError),
    Serialize(String),
}

impl std::fmt::Display for PersistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistError::Storage(e) => write!(f, "persistence failed: {e}"),
            PersistError::Serialize(e) => write!(f, "could not serialize store: {e}"),
        }
    }
}

impl std::error::Error for PersistError {}

impl From<StorageError> for PersistError {
    fn from(e: StorageError) -> Self {
        PersistError::Storage(e)
    }
}

/// Why a save attempt was skipped without performing any I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The trigger condition did not hold
    NoTrigger,
    /// The cooldown since the last successful save has not elapsed
    Cooldown,
    /// A save is already in flight
    SaveInFlight,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoTrigger => write!(f, "no-trigger"),
            SkipReason::Cooldown => write!(f, "cooldown"),
            SkipReason::SaveInFlight => write!(f, "save-in-flight"),
        }
    }
}

/// Outcome of a qualifying-or-not save attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Skipped(SkipReason),
}

/// Classification of the persisted value for one trigram at merge time.
///
/// Explicit three-way split: an absent key, a present-but-unusable value, and
/// usable data are distinct cases.
#[derive(Debug, Clone, PartialEq)]
pub enum Existing {
    /// The key does not occur in the persisted store
    Missing,
    /// The key occurs but its value holds no usable samples
    Empty,
    /// The key occurs with at least one numeric sample
    Present(Vec<f64>),
}

/// Merge one trigram's session samples with its persisted samples.
///
/// Both-present order is session samples first, then previously persisted
/// samples. That ordering looks backwards relative to capture chronology but
/// existing data files depend on it, so it is preserved exactly.
pub fn merge_samples(new: &[f64], existing: Existing) -> Vec<f64> {
    match existing {
        Existing::Missing | Existing::Empty => new.to_vec(),
        Existing::Present(old) => {
            let mut merged = Vec::with_capacity(new.len() + old.len());
            merged.extend_from_slice(new);
            merged.extend(old);
            merged
        }
    }
}

/// Parse raw persisted content into a normalized mapping.
///
/// Fails soft: absent or unparseable content yields an empty mapping and is
/// never reported to the caller. Per entry, a non-array value or an array
/// with no numeric elements normalizes to an empty sequence; non-numeric
/// elements inside an otherwise numeric array are dropped.
pub fn parse_persisted(raw: Option<&str>) -> BTreeMap<String, Vec<f64>> {
    let Some(raw) = raw else {
        return BTreeMap::new();
    };

    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => return BTreeMap::new(),
    };

    let Some(object) = value.as_object() else {
        return BTreeMap::new();
    };

    object
        .iter()
        .map(|(key, value)| {
            let samples = value
                .as_array()
                .map(|items| items.iter().filter_map(|v| v.as_f64()).collect())
                .unwrap_or_default();
            (key.clone(), samples)
        })
        .collect()
}

/// Load and parse the persisted store. Read failures propagate; parse
/// failures do not.
pub fn load_persisted<S: DurableStore>(store: &S) -> Result<BTreeMap<String, Vec<f64>>, PersistError> {
    let raw = store.read(STORE_KEY)?;
    Ok(parse_persisted(raw.as_deref()))
}

/// Rate-limited merge-and-save of session samples into the durable store.
#[derive(Debug)]
pub struct PersistenceMerger {
    cooldown_ms: f64,
    /// Timestamp of the last successful save, 0 at session start
    last_save_ms: f64,
    in_flight: bool,
}

impl PersistenceMerger {
    pub fn new(cooldown_ms: f64) -> Self {
        Self {
            cooldown_ms,
            last_save_ms: 0.0,
            in_flight: false,
        }
    }

    /// Attempt a merge-and-save.
    ///
    /// Runs only when `triggered` holds, the cooldown since the last
    /// successful save has elapsed, and no save is already in flight; skipped
    /// attempts perform no I/O and leave all state unchanged. The save clock
    /// advances only after the write succeeds, so a failed write is retried
    /// on the next qualifying trigger.
    pub fn maybe_save<S: DurableStore>(
        &mut self,
        store: &mut S,
        snapshot: &SessionStore,
        now_ms: f64,
        triggered: bool,
    ) -> Result<SaveOutcome, PersistError> {
        if !triggered {
            return Ok(SaveOutcome::Skipped(SkipReason::NoTrigger));
        }
        if self.in_flight {
            return Ok(SaveOutcome::Skipped(SkipReason::SaveInFlight));
        }
        if now_ms - self.last_save_ms < self.cooldown_ms {
            return Ok(SaveOutcome::Skipped(SkipReason::Cooldown));
        }

        self.in_flight = true;
        let result = self.merge_and_write(store, snapshot, now_ms);
        self.in_flight = false;
        result.map(|_| SaveOutcome::Saved)
    }

    /// Merge-and-save bypassing the trigger and cooldown gate.
    ///
    /// Used at end of session so samples captured after the last triggered
    /// save still reach the durable store.
    pub fn flush<S: DurableStore>(
        &mut self,
        store: &mut S,
        snapshot: &SessionStore,
        now_ms: f64,
    ) -> Result<(), PersistError> {
        self.in_flight = true;
        let result = self.merge_and_write(store, snapshot, now_ms);
        self.in_flight = false;
        result
    }

    fn merge_and_write<S: DurableStore>(
        &mut self,
        store: &mut S,
        snapshot: &SessionStore,
        now_ms: f64,
    ) -> Result<(), PersistError> {
        let raw = store.read(STORE_KEY)?;
        let mut merged = parse_persisted(raw.as_deref());

        for (key, samples) in snapshot {
            if samples.is_empty() {
                continue;
            }
            let storage_key = key.storage_key();
            let existing = match merged.remove(&storage_key) {
                None => Existing::Missing,
                Some(old) if old.is_empty() => Existing::Empty,
                Some(old) => Existing::Present(old),
            };
            merged.insert(storage_key, merge_samples(samples, existing));
        }

        let body =
            serde_json::to_string(&merged).map_err(|e| PersistError::Serialize(e.to_string()))?;
        store.write(STORE_KEY, &body)?;
        self.last_save_ms = now_ms;
        Ok(())
    }

    /// Overwrite the persisted store with an empty mapping. Idempotent; no
    /// merge; the session map is untouched.
    pub fn reset<S: DurableStore>(store: &mut S) -> Result<(), PersistError> {
        store.write(STORE_KEY, "{}")?;
        Ok(())
    }

    /// Timestamp of the last successful save (0 if none yet).
    pub fn last_save_ms(&self) -> f64 {
        self.last_save_ms
    }

    pub fn cooldown_ms(&self) -> f64 {
        self.cooldown_ms
    }
}
