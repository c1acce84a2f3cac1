//! A single stay of an object inside a zone

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// One continuous stay of a tracked object inside a zone.
///
/// A travel is created open when the object enters the zone (observed or
/// synthesized) and is closed exactly once when the object leaves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneTravel {
    /// Zone identifier
    #[serde(rename = "zone")]
    pub zone_id: String,

    /// Event time (epoch millis) the object entered the zone
    pub enter_ts: i64,

    /// Event time (epoch millis) the object left the zone, if it did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leave_ts: Option<i64>,

    /// Frame index of the entering observation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enter_frame: Option<i64>,

    /// Frame index of the leaving observation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leave_frame: Option<i64>,
}

impl ZoneTravel {
    /// Create an open travel for `zone_id` starting at `ts`
    pub fn open(zone_id: impl Into<String>, ts: i64, frame: Option<i64>) -> Self {
        Self {
            zone_id: zone_id.into(),
            enter_ts: ts,
            leave_ts: None,
            enter_frame: frame,
            leave_frame: None,
        }
    }

    /// Whether the object is still considered inside the zone
    pub fn is_open(&self) -> bool {
        !self.is_closed()
    }

    /// Whether a definitive leave time has been recorded
    pub fn is_closed(&self) -> bool {
        matches!(self.leave_ts, Some(ts) if ts > 0)
    }

    /// Close the travel at `ts`.
    ///
    /// A travel is closed at most once; closing it again is a logic error
    /// in the caller.
    pub fn close(&mut self, ts: i64, frame: Option<i64>) -> &mut Self {
        debug_assert!(self.is_open(), "travel in {} closed twice", self.zone_id);
        self.leave_ts = Some(ts);
        self.leave_frame = frame;
        self
    }

    /// Take over the leave time and frame of a later travel in the same zone
    pub(crate) fn extend_to(&mut self, later: &ZoneTravel) {
        self.leave_ts = later.leave_ts;
        self.leave_frame = later.leave_frame;
    }

    /// Length of the stay, or `None` while the travel is open
    pub fn duration(&self) -> Option<TimeDelta> {
        match self.leave_ts {
            Some(leave) if leave > 0 => Some(TimeDelta::milliseconds(leave - self.enter_ts)),
            _ => None,
        }
    }

    /// Value copy for hand-off across snapshot boundaries
    pub fn duplicate(&self) -> Self {
        self.clone()
    }
}

impl std::fmt::Display for ZoneTravel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.duration() {
            Some(stay) => write!(
                f,
                "{}[{}:{:.1}s]",
                self.zone_id,
                self.enter_ts,
                stay.num_milliseconds() as f64 / 1000.0
            ),
            None => write!(f, "{}[{}:?]", self.zone_id, self.enter_ts),
        }
    }
}
