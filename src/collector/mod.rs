//! Zone sequence collector
//!
//! Binds the reconciliation rules to a keyed store: read the object's
//! sequence, reconcile the event against an owned copy, write the result
//! back with a single store call and hand out the emitted snapshots.
//!
//! ```text
//! ZoneEvent ──► store.get(key) ──► reconcile() ──► Put / Delete / Keep
//!                                        │
//!                                        └──► emitted snapshots ──► TurnDetector
//! ```

mod reconcile;

use std::time::Duration;

use thiserror::Error;

use crate::state_store::{SequenceStore, StoreError};
use crate::types::{SequenceError, ZoneEvent, ZoneSequence};

pub use reconcile::{reconcile, StoreAction, Transition, DEFAULT_COLLAPSE_GAP};

/// Result type for collector operations
pub type CollectorResult<T> = Result<T, CollectorError>;

/// Errors that abort the processing of one event
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("sequence error: {0}")]
    Sequence(#[from] SequenceError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Reconciles zone events into per-object zone sequences
pub struct ZoneSequenceCollector<S: SequenceStore> {
    store: S,
    collapse_gap: Duration,
}

impl<S: SequenceStore> ZoneSequenceCollector<S> {
    /// Create a collector over `store` with the default collapse gap
    pub fn new(store: S) -> Self {
        Self::with_collapse_gap(store, DEFAULT_COLLAPSE_GAP)
    }

    pub fn with_collapse_gap(store: S, collapse_gap: Duration) -> Self {
        Self {
            store,
            collapse_gap,
        }
    }

    /// Process one event, returning the snapshots it produced in order
    ///
    /// The store is only touched after the transition has been computed,
    /// so a failing event leaves the stored sequence unchanged.
    pub fn collect(&mut self, event: &ZoneEvent) -> CollectorResult<Vec<ZoneSequence>> {
        let key = event.object_id.as_str();
        let current = self.store.get(key)?;
        let transition = reconcile(current, event, self.collapse_gap)?;

        match transition.action {
            StoreAction::Put(sequence) => self.store.put(key, sequence)?,
            StoreAction::Delete => {
                self.store.delete(key)?;
            }
            StoreAction::Keep => {}
        }

        Ok(transition.emitted)
    }

    /// Evict objects idle for longer than `ttl`
    pub fn sweep_expired(&mut self, ttl: Duration) -> CollectorResult<Vec<String>> {
        Ok(self.store.sweep_expired(ttl)?)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consume the collector, returning its store
    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_store::{InMemorySequenceStore, StoreResult};

    /// Store whose writes always fail
    struct BrokenStore {
        inner: InMemorySequenceStore,
    }

    impl SequenceStore for BrokenStore {
        fn get(&self, key: &str) -> StoreResult<Option<ZoneSequence>> {
            self.inner.get(key)
        }

        fn put(&mut self, _key: &str, _sequence: ZoneSequence) -> StoreResult<()> {
            Err(StoreError::Unavailable("disk full".to_string()))
        }

        fn delete(&mut self, key: &str) -> StoreResult<Option<ZoneSequence>> {
            self.inner.delete(key)
        }

        fn sweep_expired(&mut self, ttl: Duration) -> StoreResult<Vec<String>> {
            self.inner.sweep_expired(ttl)
        }

        fn len(&self) -> usize {
            self.inner.len()
        }
    }

    #[test]
    fn test_collect_persists_sequence() {
        let mut collector = ZoneSequenceCollector::new(InMemorySequenceStore::new());

        let emitted = collector.collect(&ZoneEvent::entered("7", "zone01", 1_000)).unwrap();

        assert_eq!(emitted.len(), 1);
        let stored = collector.store().get("7").unwrap().unwrap();
        assert_eq!(stored, emitted[0]);
    }

    #[test]
    fn test_deleted_removes_entry() {
        let mut collector = ZoneSequenceCollector::new(InMemorySequenceStore::new());
        collector.collect(&ZoneEvent::entered("7", "zone01", 1_000)).unwrap();

        let emitted = collector.collect(&ZoneEvent::deleted("7", 2_000)).unwrap();

        assert_eq!(emitted.len(), 1);
        assert!(collector.store().is_empty());
    }

    #[test]
    fn test_store_failure_is_terminal_for_event() {
        let mut inner = InMemorySequenceStore::new();
        inner.put("7", ZoneSequence::empty("7")).unwrap();
        let mut collector = ZoneSequenceCollector::new(BrokenStore { inner });

        let result = collector.collect(&ZoneEvent::entered("7", "zone01", 1_000));

        assert!(matches!(result, Err(CollectorError::Store(StoreError::Unavailable(_)))));
        assert!(collector.store().get("7").unwrap().unwrap().is_empty());
    }
}
