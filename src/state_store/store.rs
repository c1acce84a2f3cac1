//! Timestamped keyed store for zone sequences
//!
//! Every entry remembers the wall-clock time of its last write. A periodic
//! sweep removes entries that have been idle for longer than the TTL, which
//! is the only thing reclaiming objects that vanish without a `Deleted`
//! event.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ZoneSequence;
use crate::utils::{Clock, SystemClock};

/// Idle time after which an object's state is evicted
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Interval between two eviction sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3 * 60);

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A stored sequence together with its last write time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub key: String,
    pub last_write_ms: i64,
    pub sequence: ZoneSequence,
}

/// Keyed store of zone sequences with per-key last-write times
///
/// Implementations are owned by a single partition worker, so no method
/// needs interior locking.
pub trait SequenceStore: Send {
    /// Current sequence for `key`, if any
    fn get(&self, key: &str) -> StoreResult<Option<ZoneSequence>>;

    /// Store `sequence` under `key` and refresh its last write time
    fn put(&mut self, key: &str, sequence: ZoneSequence) -> StoreResult<()>;

    /// Remove the entry for `key`, returning it if present
    fn delete(&mut self, key: &str) -> StoreResult<Option<ZoneSequence>>;

    /// Remove every entry idle for longer than `ttl`, returning the evicted keys
    fn sweep_expired(&mut self, ttl: Duration) -> StoreResult<Vec<String>>;

    /// Number of live entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory store backed by a `HashMap`
pub struct InMemorySequenceStore {
    entries: HashMap<String, StoreEntry>,
    clock: Arc<dyn Clock>,
}

impl InMemorySequenceStore {
    /// Create an empty store driven by the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store driven by `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            clock,
        }
    }

    /// Insert a previously persisted entry, keeping its last write time
    pub fn restore(&mut self, entry: StoreEntry) {
        self.entries.insert(entry.key.clone(), entry);
    }

    /// Last write time of `key` in epoch millis
    pub fn last_write(&self, key: &str) -> Option<i64> {
        self.entries.get(key).map(|e| e.last_write_ms)
    }

    /// Iterate over all entries
    pub fn entries(&self) -> impl Iterator<Item = &StoreEntry> {
        self.entries.values()
    }

    /// Consume the store, returning its entries
    pub fn into_entries(self) -> Vec<StoreEntry> {
        self.entries.into_values().collect()
    }
}

impl Default for InMemorySequenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceStore for InMemorySequenceStore {
    fn get(&self, key: &str) -> StoreResult<Option<ZoneSequence>> {
        Ok(self.entries.get(key).map(|e| e.sequence.clone()))
    }

    fn put(&mut self, key: &str, sequence: ZoneSequence) -> StoreResult<()> {
        let entry = StoreEntry {
            key: key.to_string(),
            last_write_ms: self.clock.now_millis(),
            sequence,
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> StoreResult<Option<ZoneSequence>> {
        Ok(self.entries.remove(key).map(|e| e.sequence))
    }

    fn sweep_expired(&mut self, ttl: Duration) -> StoreResult<Vec<String>> {
        let now = self.clock.now_millis();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);

        let expired: Vec<String> = self
            .entries
            .values()
            .filter(|e| now.saturating_sub(e.last_write_ms) > ttl_ms)
            .map(|e| e.key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
        }

        Ok(expired)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
