//! Data types for the zone turn detector
//!
//! This module contains the core records flowing through the pipeline:
//! input events, the per-object zone history and the detected turns.

mod object_turn;
mod zone_event;
mod zone_sequence;
mod zone_travel;

pub use object_turn::{ObjectTurn, Turn};
pub use zone_event::{EventParseError, ZoneEvent, ZoneRelation};
pub use zone_sequence::{SequenceError, ZoneSequence};
pub use zone_travel::ZoneTravel;

/// Result type for top-level operations
pub type TurnResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;
