//! Zone Turns
//!
//! Turns a stream of zone-crossing events from an object tracker into
//! per-object zone histories and classifies the maneuver each object makes
//! through an intersection.
//!
//! # Modules
//!
//! - `types`: Core records (ZoneEvent, ZoneTravel, ZoneSequence, ObjectTurn)
//! - `collector`: Per-object zone history reconciliation
//! - `turn`: Signature based turn classification
//! - `state_store`: Timestamped per-key store, TTL sweep and snapshots
//! - `pipeline`: Partitioned workers, routing and counters
//! - `server`: JSON-lines stdin/stdout front end
//! - `api`: HTTP status endpoints
//! - `config`: Environment driven configuration
//! - `utils`: Clocks and atomic file writes
//!
//! # Example
//!
//! ```
//! use zone_turns::{InMemorySequenceStore, TurnDetector, ZoneEvent, ZoneSequenceCollector};
//!
//! let mut collector = ZoneSequenceCollector::new(InMemorySequenceStore::new());
//! let detector = TurnDetector::new();
//!
//! let mut turns = Vec::new();
//! for event in [
//!     ZoneEvent::entered("7", "zone01", 1_000),
//!     ZoneEvent::left("7", "zone01", 2_000),
//!     ZoneEvent::entered("7", "zone03", 9_000),
//! ] {
//!     for snapshot in collector.collect(&event).unwrap() {
//!         turns.extend(detector.detect(&snapshot));
//!     }
//! }
//! assert_eq!(turns.len(), 1);
//! assert_eq!(turns[0].turn.to_string(), "right");
//! ```

pub mod api;
pub mod collector;
pub mod config;
pub mod pipeline;
pub mod server;
pub mod state_store;
pub mod turn;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use collector::{CollectorError, ZoneSequenceCollector};
pub use config::{ConfigError, PipelineConfig};
pub use pipeline::{Pipeline, PipelineOutput, PipelineStats};
pub use server::TurnServer;
pub use state_store::{InMemorySequenceStore, SequenceStore, SnapshotManager, StoreEntry};
pub use turn::TurnDetector;
pub use types::{
    ObjectTurn, SequenceError, Turn, TurnResult, ZoneEvent, ZoneRelation, ZoneSequence,
    ZoneTravel,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
