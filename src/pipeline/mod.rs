//! Partitioned event pipeline
//!
//! Events are routed by a stable hash of their object id to one of N
//! partition workers. A worker exclusively owns its store shard, so the
//! events of one object are processed in order by exactly one task while
//! different partitions run in parallel.
//!
//! ```text
//!              ┌──────────────┐    ┌──────────────────────────┐
//! ZoneEvent ──►│ route(hash)  │───►│ partition 0: collector   │──┐
//!              │              │───►│ partition 1: collector   │──┼──► PipelineOutput
//!              └──────────────┘    │ ...        + sweep timer │──┘    (sequences, turns)
//!                                  └──────────────────────────┘
//! ```

mod partition;
mod stats;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::collector::ZoneSequenceCollector;
use crate::config::PipelineConfig;
use crate::state_store::{InMemorySequenceStore, StoreEntry};
use crate::types::{ObjectTurn, ZoneEvent, ZoneSequence};
use crate::utils::{Clock, SystemClock};

use partition::{PartitionWorker, WorkerSettings};
pub use stats::{PipelineStats, StatsSnapshot};

/// Shortest sweep period a worker runs with
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Records produced by the pipeline, serialized as the bare inner record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PipelineOutput {
    /// A zone sequence snapshot (only with `emit_sequences`)
    Sequence(ZoneSequence),
    /// A detected turn
    Turn(ObjectTurn),
}

impl PipelineOutput {
    /// Serialize to a single JSON line
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        match self {
            PipelineOutput::Sequence(sequence) => sequence.to_json_line(),
            PipelineOutput::Turn(turn) => turn.to_json_line(),
        }
    }
}

/// Errors surfaced by the pipeline handle
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("partition {0} is no longer accepting events")]
    Closed(usize),
}

/// Partition index of an object key
pub fn partition_for(key: &str, partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % partitions.max(1) as u64) as usize
}

/// Handle to the running partition workers
pub struct Pipeline {
    senders: Vec<mpsc::Sender<ZoneEvent>>,
    workers: Vec<JoinHandle<InMemorySequenceStore>>,
    stats: Arc<PipelineStats>,
}

impl Pipeline {
    /// Spawn the workers, seeding their stores with `restored` entries
    ///
    /// The returned receiver must be drained; workers wait for room in the
    /// output channel.
    pub fn start(
        config: &PipelineConfig,
        restored: Vec<StoreEntry>,
    ) -> (Self, mpsc::Receiver<PipelineOutput>) {
        Self::start_with_clock(config, restored, Arc::new(SystemClock))
    }

    /// Like `start`, with the stores driven by `clock`
    pub fn start_with_clock(
        config: &PipelineConfig,
        restored: Vec<StoreEntry>,
        clock: Arc<dyn Clock>,
    ) -> (Self, mpsc::Receiver<PipelineOutput>) {
        let partitions = config.partitions.max(1);
        let stats = Arc::new(PipelineStats::new(partitions));
        let (output_tx, output_rx) = mpsc::channel(config.channel_capacity.max(1));
        let settings = WorkerSettings {
            ttl: config.ttl,
            sweep_interval: config.sweep_interval.max(MIN_SWEEP_INTERVAL),
            emit_sequences: config.emit_sequences,
        };

        let mut stores: Vec<InMemorySequenceStore> = (0..partitions)
            .map(|_| InMemorySequenceStore::with_clock(clock.clone()))
            .collect();
        let restored_count = restored.len();
        for entry in restored {
            stores[partition_for(&entry.key, partitions)].restore(entry);
        }

        let mut senders = Vec::with_capacity(partitions);
        let mut workers = Vec::with_capacity(partitions);
        for (id, store) in stores.into_iter().enumerate() {
            let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
            let collector = ZoneSequenceCollector::with_collapse_gap(store, config.collapse_gap);
            let worker = PartitionWorker::new(
                id,
                collector,
                settings.clone(),
                output_tx.clone(),
                stats.clone(),
            );
            senders.push(tx);
            workers.push(tokio::spawn(worker.run(rx)));
        }

        info!(partitions, restored = restored_count, "pipeline started");

        let pipeline = Self {
            senders,
            workers,
            stats,
        };
        (pipeline, output_rx)
    }

    /// Route an event to the partition owning its object
    pub async fn submit(&self, event: ZoneEvent) -> Result<(), PipelineError> {
        let partition = partition_for(&event.object_id, self.senders.len());
        self.senders[partition]
            .send(event)
            .await
            .map_err(|_| PipelineError::Closed(partition))
    }

    pub fn partitions(&self) -> usize {
        self.senders.len()
    }

    pub fn stats(&self) -> Arc<PipelineStats> {
        self.stats.clone()
    }

    /// Stop accepting events, let the workers drain their queues and
    /// return the remaining store entries
    pub async fn shutdown(self) -> Vec<StoreEntry> {
        drop(self.senders);

        let mut entries = Vec::new();
        for (id, result) in join_all(self.workers).await.into_iter().enumerate() {
            match result {
                Ok(store) => entries.extend(store.into_entries()),
                Err(e) => error!(partition = id, error = %e, "partition worker failed"),
            }
        }

        info!(entries = entries.len(), "pipeline stopped");
        entries
    }
}
