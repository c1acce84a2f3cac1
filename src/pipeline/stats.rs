//! Pipeline counters shared by all partition workers

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::types::ObjectTurn;

/// Number of most recent turns kept for the status API
const RECENT_TURNS: usize = 100;

/// Live counters updated by the partition workers
pub struct PipelineStats {
    events: AtomicU64,
    rejected: AtomicU64,
    snapshots: AtomicU64,
    turns: AtomicU64,
    deleted: AtomicU64,
    evicted: AtomicU64,
    /// Live objects per partition
    live_objects: RwLock<Vec<usize>>,
    recent_turns: Mutex<VecDeque<ObjectTurn>>,
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub events: u64,
    pub rejected: u64,
    pub snapshots: u64,
    pub turns: u64,
    pub deleted: u64,
    pub evicted: u64,
    pub live_objects: usize,
    pub partitions: Vec<usize>,
}

impl PipelineStats {
    pub fn new(partitions: usize) -> Self {
        Self {
            events: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            snapshots: AtomicU64::new(0),
            turns: AtomicU64::new(0),
            deleted: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
            live_objects: RwLock::new(vec![0; partitions]),
            recent_turns: Mutex::new(VecDeque::with_capacity(RECENT_TURNS)),
        }
    }

    pub fn record_event(&self) {
        self.events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshots(&self, count: usize) {
        self.snapshots.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_deleted(&self) {
        self.deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evicted(&self, count: usize) {
        self.evicted.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_turn(&self, turn: &ObjectTurn) {
        self.turns.fetch_add(1, Ordering::Relaxed);

        let mut recent = self.recent_turns.lock();
        if recent.len() == RECENT_TURNS {
            recent.pop_front();
        }
        recent.push_back(turn.clone());
    }

    /// Publish the number of live objects of one partition
    pub fn set_live_objects(&self, partition: usize, count: usize) {
        if let Some(slot) = self.live_objects.write().get_mut(partition) {
            *slot = count;
        }
    }

    /// Most recent turns, oldest first
    pub fn recent_turns(&self) -> Vec<ObjectTurn> {
        self.recent_turns.lock().iter().cloned().collect()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let partitions = self.live_objects.read().clone();
        StatsSnapshot {
            events: self.events.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            snapshots: self.snapshots.load(Ordering::Relaxed),
            turns: self.turns.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            live_objects: partitions.iter().sum(),
            partitions,
        }
    }
}
