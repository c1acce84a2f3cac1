//! Partition worker
//!
//! Each worker owns one store shard and processes the events of its keys
//! strictly in arrival order. The idle sweep runs in the same `select!`
//! loop, so it never interleaves with an update of the same key.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use super::stats::PipelineStats;
use super::PipelineOutput;
use crate::collector::ZoneSequenceCollector;
use crate::state_store::{InMemorySequenceStore, SequenceStore};
use crate::turn::TurnDetector;
use crate::types::{ZoneEvent, ZoneRelation};

/// Settings shared by all workers
#[derive(Debug, Clone)]
pub(crate) struct WorkerSettings {
    pub ttl: Duration,
    pub sweep_interval: Duration,
    pub emit_sequences: bool,
}

pub(crate) struct PartitionWorker {
    id: usize,
    collector: ZoneSequenceCollector<InMemorySequenceStore>,
    detector: TurnDetector,
    settings: WorkerSettings,
    output: mpsc::Sender<PipelineOutput>,
    output_closed: bool,
    stats: Arc<PipelineStats>,
}

impl PartitionWorker {
    pub fn new(
        id: usize,
        collector: ZoneSequenceCollector<InMemorySequenceStore>,
        settings: WorkerSettings,
        output: mpsc::Sender<PipelineOutput>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            id,
            collector,
            detector: TurnDetector::new(),
            settings,
            output,
            output_closed: false,
            stats,
        }
    }

    /// Run until the input channel closes, then hand back the store shard
    pub async fn run(mut self, mut rx: mpsc::Receiver<ZoneEvent>) -> InMemorySequenceStore {
        let period = self.settings.sweep_interval;
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.publish_live_objects();

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    self.sweep();
                }

                event = rx.recv() => {
                    match event {
                        Some(e) => self.handle(e).await,
                        None => break,
                    }
                }
            }
        }

        debug!(partition = self.id, "partition worker stopped");
        self.collector.into_store()
    }

    async fn handle(&mut self, event: ZoneEvent) {
        self.stats.record_event();

        let snapshots = match self.collector.collect(&event) {
            Ok(snapshots) => snapshots,
            Err(e) => {
                error!(partition = self.id, event = %event, error = %e, "event rejected");
                self.stats.record_rejected();
                return;
            }
        };

        if event.relation == ZoneRelation::Deleted {
            self.stats.record_deleted();
        }
        self.stats.record_snapshots(snapshots.len());
        self.publish_live_objects();

        for sequence in snapshots {
            let turn = self.detector.detect(&sequence);

            if self.settings.emit_sequences {
                self.publish(PipelineOutput::Sequence(sequence)).await;
            }
            if let Some(turn) = turn {
                if self.publish(PipelineOutput::Turn(turn.clone())).await {
                    self.stats.record_turn(&turn);
                }
            }
        }
    }

    /// Send one record downstream, false once the receiver is gone
    async fn publish(&mut self, record: PipelineOutput) -> bool {
        if self.output_closed {
            return false;
        }
        if self.output.send(record).await.is_err() {
            debug!(partition = self.id, "output receiver closed, dropping records");
            self.output_closed = true;
            return false;
        }
        true
    }

    fn sweep(&mut self) {
        match self.collector.sweep_expired(self.settings.ttl) {
            Ok(evicted) if !evicted.is_empty() => {
                info!(
                    partition = self.id,
                    count = evicted.len(),
                    "evicted idle objects: {}",
                    evicted.join(", ")
                );
                self.stats.record_evicted(evicted.len());
            }
            Ok(_) => {}
            Err(e) => error!(partition = self.id, error = %e, "sweep failed"),
        }
        self.publish_live_objects();
    }

    fn publish_live_objects(&self) {
        self.stats.set_live_objects(self.id, self.collector.store().len());
    }
}
