//! Event reconciliation
//!
//! A pure transition `(current sequence, event) -> (store action, emitted
//! snapshots)`. The rules repair the last travel of the sequence depending
//! on whether it is open, closed or absent and whether its zone matches
//! the event's zone, synthesizing the transitions the tracker missed.

use std::time::Duration;

use chrono::TimeDelta;
use tracing::{debug, info, warn};

use crate::types::{SequenceError, ZoneEvent, ZoneRelation, ZoneSequence, ZoneTravel};

/// Default gap below which two visits of the same zone are merged
pub const DEFAULT_COLLAPSE_GAP: Duration = Duration::from_secs(3);

/// What to do with the stored entry once the event is processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// Write the new sequence (refreshes the entry's TTL clock)
    Put(ZoneSequence),
    /// Remove the entry
    Delete,
    /// Leave the store untouched
    Keep,
}

/// Outcome of reconciling one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub action: StoreAction,
    /// Snapshots in the order the logical transitions happened
    pub emitted: Vec<ZoneSequence>,
}

impl Transition {
    fn keep() -> Self {
        Self {
            action: StoreAction::Keep,
            emitted: Vec::new(),
        }
    }

    fn put(sequence: ZoneSequence, mut emitted: Vec<ZoneSequence>) -> Self {
        emitted.push(sequence.duplicate());
        Self {
            action: StoreAction::Put(sequence),
            emitted,
        }
    }
}

/// Reconcile `event` against the object's current sequence
pub fn reconcile(
    current: Option<ZoneSequence>,
    event: &ZoneEvent,
    collapse_gap: Duration,
) -> Result<Transition, SequenceError> {
    let collapse_gap = TimeDelta::from_std(collapse_gap).unwrap_or(TimeDelta::MAX);
    debug!(object = %event.object_id, event = %event, "reconciling zone event");

    match event.relation {
        ZoneRelation::Entered => Ok(on_entered(start(current, event), event)),
        ZoneRelation::Left => on_left(start(current, event), event, collapse_gap),
        ZoneRelation::Through => Ok(on_through(start(current, event), event)),
        ZoneRelation::Deleted => Ok(on_deleted(current, event)),
    }
}

/// Reuse a non-empty sequence or start a fresh one
fn start(current: Option<ZoneSequence>, event: &ZoneEvent) -> ZoneSequence {
    match current {
        Some(seq) if !seq.is_empty() => seq,
        _ => ZoneSequence::empty(event.object_id.clone()),
    }
}

fn open_travel(event: &ZoneEvent) -> ZoneTravel {
    ZoneTravel::open(event.zone_id.clone(), event.timestamp, event.frame_index)
}

fn on_entered(mut seq: ZoneSequence, event: &ZoneEvent) -> Transition {
    let mut emitted = Vec::new();

    if let Some(last) = seq.last_travel_mut().filter(|t| t.is_open()) {
        warn!(
            object = %event.object_id,
            zone = %event.zone_id,
            current_zone = %last.zone_id,
            "see ENTERED({}), but already in the zone({})",
            event.zone_id,
            last.zone_id
        );
        if last.zone_id == event.zone_id {
            return Transition::keep();
        }
        last.close(event.timestamp, event.frame_index);
        emitted.push(seq.duplicate());
    }

    seq.append(open_travel(event));
    Transition::put(seq, emitted)
}

fn on_left(
    mut seq: ZoneSequence,
    event: &ZoneEvent,
    collapse_gap: TimeDelta,
) -> Result<Transition, SequenceError> {
    let mut emitted = Vec::new();

    match seq.last_travel_mut() {
        Some(last) if last.is_open() => {
            if last.zone_id != event.zone_id {
                warn!(
                    object = %event.object_id,
                    zone = %event.zone_id,
                    current_zone = %last.zone_id,
                    "see LEFT({}), but in the zone({}) now",
                    event.zone_id,
                    last.zone_id
                );
                last.close(event.timestamp, event.frame_index);
                emitted.push(seq.duplicate());

                seq.append(open_travel(event));
                emitted.push(seq.duplicate());
            }
        }
        _ => {
            warn!(
                object = %event.object_id,
                zone = %event.zone_id,
                "see LEFT({}), but is not in any zone now",
                event.zone_id
            );
            seq.append(open_travel(event));
            emitted.push(seq.duplicate());
        }
    }

    if let Some(last) = seq.last_travel_mut() {
        last.close(event.timestamp, event.frame_index);
    }

    collapse_flicker(&mut seq, collapse_gap)?;
    Ok(Transition::put(seq, emitted))
}

/// Merge the last travel into the previous one when both are in the same
/// zone and separated by less than `collapse_gap`
fn collapse_flicker(seq: &mut ZoneSequence, collapse_gap: TimeDelta) -> Result<(), SequenceError> {
    let count = seq.visit_count();
    if count < 2 {
        return Ok(());
    }

    let (prev, last) = (&seq.visits[count - 2], &seq.visits[count - 1]);
    if prev.zone_id != last.zone_id {
        return Ok(());
    }

    let gap = seq.inter_travel_gap(count - 2, count - 1)?;
    if gap < collapse_gap {
        info!(
            object = %seq.object_id,
            zone = %seq.visits[count - 1].zone_id,
            "collapse two consequent travels (gap={:.1}s): {}, {}",
            gap.num_milliseconds() as f64 / 1000.0,
            seq.visits[count - 2],
            seq.visits[count - 1]
        );
        seq.collapse_to_previous(count - 1)?;
    }

    Ok(())
}

fn on_through(mut seq: ZoneSequence, event: &ZoneEvent) -> Transition {
    let mut emitted = Vec::new();

    if let Some(last) = seq.last_travel_mut().filter(|t| t.is_open()) {
        warn!(
            object = %event.object_id,
            zone = %event.zone_id,
            current_zone = %last.zone_id,
            "see THROUGH({}), but already in the zone({})",
            event.zone_id,
            last.zone_id
        );
        last.close(event.timestamp, event.frame_index);
        let same_zone = last.zone_id == event.zone_id;
        if same_zone {
            // the crossing already completed with this close
            return Transition {
                emitted: vec![seq.duplicate()],
                action: StoreAction::Put(seq),
            };
        }
        emitted.push(seq.duplicate());
    }

    seq.append(open_travel(event));
    emitted.push(seq.duplicate());

    if let Some(last) = seq.last_travel_mut() {
        last.close(event.timestamp, event.frame_index);
    }
    Transition::put(seq, emitted)
}

fn on_deleted(current: Option<ZoneSequence>, event: &ZoneEvent) -> Transition {
    let mut emitted = Vec::new();

    if let Some(mut seq) = current.filter(|s| !s.is_empty()) {
        let mut closed_travel = false;
        if let Some(last) = seq.last_travel_mut().filter(|t| t.is_open()) {
            warn!(
                object = %event.object_id,
                zone = %last.zone_id,
                "object({}) was disappeared without left zone({})",
                event.object_id,
                last.zone_id
            );
            last.close(event.timestamp, event.frame_index);
            closed_travel = true;
        }
        seq.close();
        debug!(object = %event.object_id, sequence = %seq, "object retired");

        // the retired sequence is handed out as is, keeping `closed`
        if closed_travel {
            emitted.push(seq);
        }
    }

    Transition {
        action: StoreAction::Delete,
        emitted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBJ: &str = "obj-1";

    fn run(events: &[ZoneEvent]) -> (Option<ZoneSequence>, Vec<Vec<ZoneSequence>>) {
        let mut current = None;
        let mut all_emitted = Vec::new();
        for event in events {
            let transition = reconcile(current.clone(), event, DEFAULT_COLLAPSE_GAP).unwrap();
            match transition.action {
                StoreAction::Put(seq) => current = Some(seq),
                StoreAction::Delete => current = None,
                StoreAction::Keep => {}
            }
            all_emitted.push(transition.emitted);
        }
        (current, all_emitted)
    }

    #[test]
    fn test_entered_starts_sequence() {
        let (seq, emitted) = run(&[ZoneEvent::entered(OBJ, "zone01", 1_000)]);
        let seq = seq.unwrap();

        assert_eq!(seq.zone_ids(), vec!["zone01"]);
        assert!(seq.last_travel().unwrap().is_open());
        assert_eq!(emitted[0].len(), 1);
    }

    #[test]
    fn test_duplicate_entered_is_ignored() {
        let (once, _) = run(&[ZoneEvent::entered(OBJ, "zone01", 1_000)]);
        let (twice, emitted) = run(&[
            ZoneEvent::entered(OBJ, "zone01", 1_000),
            ZoneEvent::entered(OBJ, "zone01", 1_500),
        ]);

        assert_eq!(once, twice);
        assert!(emitted[1].is_empty());
    }

    #[test]
    fn test_duplicate_entered_keeps_store() {
        let seq = ZoneSequence::from(OBJ, ZoneTravel::open("zone01", 1_000, None));
        let transition =
            reconcile(Some(seq), &ZoneEvent::entered(OBJ, "zone01", 1_200), DEFAULT_COLLAPSE_GAP)
                .unwrap();

        assert_eq!(transition.action, StoreAction::Keep);
    }

    #[test]
    fn test_entered_other_zone_closes_open_travel() {
        let (seq, emitted) = run(&[
            ZoneEvent::entered(OBJ, "zone01", 1_000),
            ZoneEvent::entered(OBJ, "zone02", 4_000),
        ]);
        let seq = seq.unwrap();

        assert_eq!(emitted[1].len(), 2);
        assert_eq!(emitted[1][0].zone_ids(), vec!["zone01"]);
        assert!(emitted[1][0].last_travel().unwrap().is_closed());
        assert_eq!(seq.zone_ids(), vec!["zone01", "zone02"]);
        assert_eq!(seq.visits[0].leave_ts, Some(4_000));
        assert!(seq.visits[1].is_open());
    }

    #[test]
    fn test_left_closes_open_travel() {
        let (seq, emitted) = run(&[
            ZoneEvent::entered(OBJ, "zone01", 1_000),
            ZoneEvent::left(OBJ, "zone01", 2_000),
        ]);
        let seq = seq.unwrap();

        assert_eq!(emitted[1].len(), 1);
        assert_eq!(seq.visits[0].duration(), Some(TimeDelta::milliseconds(1_000)));
    }

    #[test]
    fn test_left_without_entered_synthesizes_travel() {
        let (seq, emitted) = run(&[ZoneEvent::left(OBJ, "zone02", 5_000)]);
        let seq = seq.unwrap();

        assert_eq!(emitted[0].len(), 2);
        assert!(emitted[0][0].last_travel().unwrap().is_open());
        assert!(emitted[0][1].last_travel().unwrap().is_closed());
        assert_eq!(seq.visits[0].enter_ts, 5_000);
        assert_eq!(seq.visits[0].leave_ts, Some(5_000));
    }

    #[test]
    fn test_left_other_zone_recovers() {
        let (seq, emitted) = run(&[
            ZoneEvent::entered(OBJ, "zoneA", 1_000),
            ZoneEvent::left(OBJ, "zoneB", 9_000),
        ]);
        let seq = seq.unwrap();
        let snapshots = &emitted[1];

        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[0].zone_ids(), vec!["zoneA"]);
        assert!(snapshots[0].visits[0].is_closed());
        assert_eq!(snapshots[1].zone_ids(), vec!["zoneA", "zoneB"]);
        assert!(snapshots[1].visits[1].is_open());
        assert!(snapshots[2].visits[1].is_closed());
        assert_eq!(seq.zone_ids(), vec!["zoneA", "zoneB"]);
        assert!(seq.visits.iter().all(ZoneTravel::is_closed));
    }

    #[test]
    fn test_collapse_merges_short_reentry() {
        let (seq, _) = run(&[
            ZoneEvent::entered(OBJ, "zone01", 10_000),
            ZoneEvent::left(OBJ, "zone01", 12_000),
            ZoneEvent::entered(OBJ, "zone01", 13_500),
            ZoneEvent::left(OBJ, "zone01", 15_000),
        ]);
        let seq = seq.unwrap();

        assert_eq!(seq.visit_count(), 1);
        assert_eq!(seq.visits[0].enter_ts, 10_000);
        assert_eq!(seq.visits[0].leave_ts, Some(15_000));
    }

    #[test]
    fn test_no_collapse_for_long_gap() {
        let (seq, _) = run(&[
            ZoneEvent::entered(OBJ, "zone01", 10_000),
            ZoneEvent::left(OBJ, "zone01", 12_000),
            ZoneEvent::entered(OBJ, "zone01", 15_000),
            ZoneEvent::left(OBJ, "zone01", 16_000),
        ]);

        assert_eq!(seq.unwrap().visit_count(), 2);
    }

    #[test]
    fn test_no_collapse_across_other_zone() {
        let (seq, _) = run(&[
            ZoneEvent::entered(OBJ, "zoneX", 500),
            ZoneEvent::left(OBJ, "zoneX", 1_000),
            ZoneEvent::through(OBJ, "zoneY", 2_000),
            ZoneEvent::entered(OBJ, "zoneX", 2_500),
            ZoneEvent::left(OBJ, "zoneX", 3_000),
        ]);

        assert_eq!(seq.unwrap().zone_ids(), vec!["zoneX", "zoneY", "zoneX"]);
    }

    #[test]
    fn test_through_emits_open_then_closed() {
        let (seq, emitted) = run(&[ZoneEvent::through(OBJ, "zone03", 7_000)]);
        let seq = seq.unwrap();

        assert_eq!(emitted[0].len(), 2);
        assert!(emitted[0][0].visits[0].is_open());
        assert!(emitted[0][1].visits[0].is_closed());
        assert_eq!(seq.visits[0].duration(), Some(TimeDelta::zero()));
    }

    #[test]
    fn test_through_while_open_elsewhere() {
        let (seq, emitted) = run(&[
            ZoneEvent::entered(OBJ, "zone01", 1_000),
            ZoneEvent::through(OBJ, "zone02", 3_000),
        ]);

        assert_eq!(emitted[1].len(), 3);
        assert_eq!(seq.unwrap().zone_ids(), vec!["zone01", "zone02"]);
    }

    #[test]
    fn test_through_same_open_zone_only_closes() {
        let (seq, emitted) = run(&[
            ZoneEvent::entered(OBJ, "zone01", 1_000),
            ZoneEvent::through(OBJ, "zone01", 3_000),
        ]);
        let seq = seq.unwrap();

        assert_eq!(emitted[1].len(), 1);
        assert_eq!(seq.visit_count(), 1);
        assert_eq!(seq.visits[0].leave_ts, Some(3_000));
    }

    #[test]
    fn test_deleted_closes_open_travel() {
        let seq = ZoneSequence::from(OBJ, ZoneTravel::open("zone02", 1_000, None));
        let transition =
            reconcile(Some(seq), &ZoneEvent::deleted(OBJ, 8_000), DEFAULT_COLLAPSE_GAP).unwrap();

        assert_eq!(transition.action, StoreAction::Delete);
        assert_eq!(transition.emitted.len(), 1);
        assert_eq!(transition.emitted[0].visits[0].leave_ts, Some(8_000));
        assert!(transition.emitted[0].closed);
        assert!(transition.emitted[0].to_string().ends_with("-END"));
    }

    #[test]
    fn test_deleted_after_left_emits_nothing() {
        let (seq, emitted) = run(&[
            ZoneEvent::entered(OBJ, "zone01", 1_000),
            ZoneEvent::left(OBJ, "zone01", 2_000),
            ZoneEvent::deleted(OBJ, 3_000),
        ]);

        assert!(seq.is_none());
        assert!(emitted[2].is_empty());
    }

    #[test]
    fn test_deleted_unknown_object() {
        let transition =
            reconcile(None, &ZoneEvent::deleted(OBJ, 8_000), DEFAULT_COLLAPSE_GAP).unwrap();

        assert_eq!(transition.action, StoreAction::Delete);
        assert!(transition.emitted.is_empty());
    }

    #[test]
    fn test_emitted_snapshots_are_independent() {
        let (_, emitted) = run(&[ZoneEvent::through(OBJ, "zone03", 7_000)]);
        // the first snapshot must not observe the later close
        assert!(emitted[0][0].visits[0].is_open());
    }
}
