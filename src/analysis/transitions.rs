// src/analysis/transitions.rs
//
// Transition building: pairs consecutive real-geofence dwells of one vehicle
// into moves. In-transit dwells between them are skipped here — their time is
// reported by the travel analysis, not folded into the move. `duration_s` is
// the stay in the origin geofence, tagged with the shift that stay started in.

use super::shift::ShiftSchedule;
use crate::types::{Dwell, Transition};

/// Emits one transition per adjacent pair of non-transit dwells.
///
/// Self-transitions (same label twice, a noisy re-entry or an extended stay
/// split by the segmenter) are emitted as-is; whether they are folded away is
/// the consolidation pass's decision, not this builder's.
pub fn build_transitions(dwells: &[Dwell], schedule: &ShiftSchedule) -> Vec<Transition> {
    let real: Vec<&Dwell> = dwells.iter().filter(|d| !d.is_transit()).collect();

    real.windows(2)
        .map(|pair| {
            let (origin, destination) = (pair[0], pair[1]);
            let tag = schedule.tag(origin.entry_time);
            Transition {
                vehicle: origin.vehicle.clone(),
                origin: origin.geofence.clone(),
                destination: destination.geofence.clone(),
                entry_time: origin.entry_time,
                exit_time: origin.exit_time,
                duration_s: origin.duration_s(),
                shift: tag.shift,
                shift_date: tag.shift_date,
                consolidated_stays: 0,
            }
        })
        .collect()
}

/// Folds self-transitions (A→A) into the most recent preceding real move of
/// the same vehicle, extending that move's stay window. A self-transition
/// with no preceding real move is kept untouched.
///
/// Input must be sorted by (vehicle, entry_time); output preserves that order.
pub fn consolidate_self_transitions(transitions: Vec<Transition>) -> Vec<Transition> {
    let mut kept: Vec<Transition> = Vec::with_capacity(transitions.len());

    for transition in transitions {
        if transition.is_self_transition() {
            let anchor = kept
                .iter_mut()
                .rev()
                .take_while(|t| t.vehicle == transition.vehicle)
                .find(|t| !t.is_self_transition());

            if let Some(anchor) = anchor {
                anchor.exit_time = transition.exit_time;
                anchor.duration_s =
                    (anchor.exit_time - anchor.entry_time).num_milliseconds() as f64 / 1000.0;
                anchor.consolidated_stays += 1;
                continue;
            }
        }
        kept.push(transition);
    }

    kept
}
