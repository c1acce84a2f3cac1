//! Reconciled zone history of one tracked object

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ZoneTravel;

/// Errors raised by index-based sequence queries
///
/// These indicate a logic defect in the caller, never a data-quality
/// problem in the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("invalid travel index: {0}")]
    InvalidIndex(usize),
    #[error("invalid travel index pair: {from}, {to}")]
    InvalidIndexPair { from: usize, to: usize },
    #[error("travel {0} is still open")]
    OpenTravel(usize),
}

/// Ordered history of zone travels for one object
///
/// Insertion order equals temporal order. Only the last travel may be
/// open. Once `closed` is set the sequence is retired and no longer
/// stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSequence {
    /// Tracked object identifier
    pub object_id: String,

    /// Travels in visiting order
    #[serde(default)]
    pub visits: Vec<ZoneTravel>,

    /// Set once the object was permanently retired
    #[serde(default)]
    pub closed: bool,
}

impl ZoneSequence {
    /// Create a sequence with no visits
    pub fn empty(object_id: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            visits: Vec::new(),
            closed: false,
        }
    }

    /// Create a sequence starting with `first`
    pub fn from(object_id: impl Into<String>, first: ZoneTravel) -> Self {
        Self {
            object_id: object_id.into(),
            visits: vec![first],
            closed: false,
        }
    }

    pub fn visit_count(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    pub fn visit(&self, index: usize) -> Option<&ZoneTravel> {
        self.visits.get(index)
    }

    pub fn last_travel(&self) -> Option<&ZoneTravel> {
        self.visits.last()
    }

    pub fn last_travel_mut(&mut self) -> Option<&mut ZoneTravel> {
        self.visits.last_mut()
    }

    /// Zone ids in visiting order
    pub fn zone_ids(&self) -> Vec<&str> {
        self.visits.iter().map(|t| t.zone_id.as_str()).collect()
    }

    /// Append a travel.
    ///
    /// The caller guarantees that every travel already in the sequence is
    /// closed; this is not re-validated here.
    pub fn append(&mut self, travel: ZoneTravel) {
        self.visits.push(travel);
    }

    /// Mark the sequence permanently closed
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Remove travel `index`, extending the preceding travel so that it
    /// ends where the removed one ended
    pub fn collapse_to_previous(&mut self, index: usize) -> Result<(), SequenceError> {
        if index == 0 || index >= self.visits.len() {
            return Err(SequenceError::InvalidIndex(index));
        }

        let removed = self.visits.remove(index);
        self.visits[index - 1].extend_to(&removed);
        Ok(())
    }

    /// Gap between the leave of travel `from` and the enter of travel `to`
    pub fn inter_travel_gap(&self, from: usize, to: usize) -> Result<TimeDelta, SequenceError> {
        if from >= to || to >= self.visits.len() {
            return Err(SequenceError::InvalidIndexPair { from, to });
        }

        let leave = self.visits[from]
            .leave_ts
            .filter(|_| self.visits[from].is_closed())
            .ok_or(SequenceError::OpenTravel(from))?;
        Ok(TimeDelta::milliseconds(self.visits[to].enter_ts - leave))
    }

    /// Stay length of travel `index`, `None` while it is open
    pub fn travel_duration(&self, index: usize) -> Result<Option<TimeDelta>, SequenceError> {
        self.visits
            .get(index)
            .map(ZoneTravel::duration)
            .ok_or(SequenceError::InvalidIndex(index))
    }

    /// Deep copy handed to downstream consumers
    pub fn duplicate(&self) -> Self {
        Self {
            object_id: self.object_id.clone(),
            visits: self.visits.iter().map(ZoneTravel::duplicate).collect(),
            // snapshots always describe a live object
            closed: false,
        }
    }

    /// Serialize to a single JSON line
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Display for ZoneSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: ", self.object_id)?;
        for (i, travel) in self.visits.iter().enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            write!(f, "{}", travel)?;
        }
        if self.closed {
            f.write_str("-END")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed(zone: &str, enter: i64, leave: i64) -> ZoneTravel {
        let mut travel = ZoneTravel::open(zone, enter, None);
        travel.close(leave, None);
        travel
    }

    fn sample() -> ZoneSequence {
        let mut seq = ZoneSequence::from("cam1/7", closed("zone01", 1_000, 2_000));
        seq.append(closed("zone02", 2_500, 4_000));
        seq.append(ZoneTravel::open("zone03", 6_000, None));
        seq
    }

    #[test]
    fn test_empty_sequence() {
        let seq = ZoneSequence::empty("obj");
        assert!(seq.is_empty());
        assert_eq!(seq.last_travel(), None);
        assert!(!seq.closed);
    }

    #[test]
    fn test_zone_ids_in_order() {
        assert_eq!(sample().zone_ids(), vec!["zone01", "zone02", "zone03"]);
    }

    #[test]
    fn test_inter_travel_gap() {
        let seq = sample();
        assert_eq!(seq.inter_travel_gap(0, 1), Ok(TimeDelta::milliseconds(500)));
        assert_eq!(seq.inter_travel_gap(0, 2), Ok(TimeDelta::milliseconds(4_000)));
    }

    #[test]
    fn test_inter_travel_gap_invalid_indices() {
        let seq = sample();
        assert_eq!(
            seq.inter_travel_gap(1, 1),
            Err(SequenceError::InvalidIndexPair { from: 1, to: 1 })
        );
        assert_eq!(
            seq.inter_travel_gap(2, 1),
            Err(SequenceError::InvalidIndexPair { from: 2, to: 1 })
        );
        assert_eq!(
            seq.inter_travel_gap(0, 3),
            Err(SequenceError::InvalidIndexPair { from: 0, to: 3 })
        );
    }

    #[test]
    fn test_travel_duration() {
        let seq = sample();
        assert_eq!(seq.travel_duration(1), Ok(Some(TimeDelta::milliseconds(1_500))));
        assert_eq!(seq.travel_duration(2), Ok(None));
        assert_eq!(seq.travel_duration(3), Err(SequenceError::InvalidIndex(3)));
    }

    #[test]
    fn test_collapse_to_previous() {
        let mut seq = ZoneSequence::from("obj", closed("zone01", 1_000, 2_000));
        let mut later = ZoneTravel::open("zone01", 3_000, Some(90));
        later.close(5_000, Some(150));
        seq.append(later);

        seq.collapse_to_previous(1).unwrap();

        assert_eq!(seq.visit_count(), 1);
        let merged = seq.visit(0).unwrap();
        assert_eq!(merged.enter_ts, 1_000);
        assert_eq!(merged.leave_ts, Some(5_000));
        assert_eq!(merged.leave_frame, Some(150));
    }

    #[test]
    fn test_collapse_rejects_first_index() {
        let mut seq = sample();
        assert_eq!(seq.collapse_to_previous(0), Err(SequenceError::InvalidIndex(0)));
        assert_eq!(seq.visit_count(), 3);
    }

    #[test]
    fn test_duplicate_is_deep() {
        let original = sample();
        let mut copy = original.duplicate();
        copy.last_travel_mut().unwrap().close(7_000, None);

        assert!(original.last_travel().unwrap().is_open());
        assert!(copy.last_travel().unwrap().is_closed());
    }

    #[test]
    fn test_display() {
        let mut seq = sample();
        assert_eq!(
            seq.to_string(),
            "cam1/7: zone01[1000:1.0s]-zone02[2500:1.5s]-zone03[6000:?]"
        );

        seq.close();
        assert!(seq.to_string().ends_with("-END"));
    }
}
