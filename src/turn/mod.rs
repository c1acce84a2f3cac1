//! Turn detection
//!
//! Stateless classification of zone sequence snapshots. The ordered zone
//! ids of a snapshot form a signature such as `[zone01-zone03)`, which is
//! looked up in a fixed table of intersection maneuvers.
//!
//! The table only holds open-terminal signatures. The collector emits the
//! open snapshot before closing any travel, so every qualifying zone pair
//! is reported once per object.

mod signatures;

use std::collections::HashMap;

use tracing::debug;

use crate::types::{ObjectTurn, Turn, ZoneSequence};

pub use signatures::default_table;

/// Maps zone sequence snapshots to turns
pub struct TurnDetector {
    table: &'static HashMap<&'static str, Turn>,
}

impl TurnDetector {
    /// Detector for the default five-zone intersection
    pub fn new() -> Self {
        Self::with_table(default_table())
    }

    /// Detector over a custom signature table
    pub fn with_table(table: &'static HashMap<&'static str, Turn>) -> Self {
        Self { table }
    }

    /// Signature of a snapshot, `None` when it has no visits
    pub fn signature(sequence: &ZoneSequence) -> Option<String> {
        let last = sequence.last_travel()?;
        let terminal = if last.is_closed() { ']' } else { ')' };
        Some(format!("[{}{}", sequence.zone_ids().join("-"), terminal))
    }

    /// Classify a snapshot, yielding at most one turn
    pub fn detect(&self, sequence: &ZoneSequence) -> Option<ObjectTurn> {
        let signature = Self::signature(sequence)?;
        let turn = self.table.get(signature.as_str())?;
        debug!(object = %sequence.object_id, %signature, %turn, "turn detected");
        Some(ObjectTurn::new(sequence.object_id.clone(), *turn))
    }
}

impl Default for TurnDetector {
    fn default() -> Self {
        Self::new()
    }
}
