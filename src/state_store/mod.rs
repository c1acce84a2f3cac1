//! Per-key timestamped state store
//!
//! - `SequenceStore`: keyed get/put/delete plus the idle sweep
//! - `InMemorySequenceStore`: the shard owned by each partition worker
//! - `SnapshotManager`: persists shards across restarts
//!
//! # Lifecycle of an entry
//!
//! ```text
//! ┌──────────┐  put   ┌───────────┐  Deleted event  ┌─────────┐
//! │ (absent) │──────►│   live    │────────────────►│ removed │
//! └──────────┘        │ last_write│                 └─────────┘
//!                     └─────┬─────┘
//!                           │ idle > ttl at sweep tick
//!                           ▼
//!                      ┌─────────┐
//!                      │ evicted │
//!                      └─────────┘
//! ```

mod snapshot;
mod store;

pub use snapshot::{SnapshotError, SnapshotManager, SnapshotMeta, SnapshotResult};
pub use store::{
    InMemorySequenceStore, SequenceStore, StoreEntry, StoreError, StoreResult, DEFAULT_SWEEP_INTERVAL,
    DEFAULT_TTL,
};
