// src/analysis/cycles.rs
//
// Cycle detection: stitches adjacent classified transitions into complete
// round trips. Two closing rules:
//   A. Load opened from a stock, immediately answered by a Return that ends
//      at a stock                              → LoadCycle
//   B. Dump, immediately answered by a Return that ends at a module/pile
//                                              → DumpCycle
// A transition opens at most one cycle, so cycles never overlap.

use crate::taxonomy::GeofenceTaxonomy;
use crate::types::{ClassifiedTransition, Cycle, CycleKind, Process};
use tracing::info;

fn closes_load_cycle(
    opening: &ClassifiedTransition,
    closing: &ClassifiedTransition,
    taxonomy: &GeofenceTaxonomy,
) -> bool {
    opening.process == Process::Load
        && taxonomy.is_stock(&opening.transition.origin)
        && closing.process == Process::Return
        && taxonomy.is_stock(&closing.transition.destination)
}

fn closes_dump_cycle(
    opening: &ClassifiedTransition,
    closing: &ClassifiedTransition,
    taxonomy: &GeofenceTaxonomy,
) -> bool {
    opening.process == Process::Dump
        && closing.process == Process::Return
        && taxonomy.is_module_like(&closing.transition.destination)
}

/// Scans classified transitions (sorted by vehicle, entry_time) for adjacent
/// pairs that close a round trip. Cycle ids are sequential over the run.
pub fn detect_cycles(
    classified: &[ClassifiedTransition],
    taxonomy: &GeofenceTaxonomy,
) -> Vec<Cycle> {
    let mut cycles = Vec::new();
    let mut i = 0;

    while i + 1 < classified.len() {
        let opening = &classified[i];
        let closing = &classified[i + 1];

        if opening.transition.vehicle != closing.transition.vehicle {
            i += 1;
            continue;
        }

        let kind = if closes_load_cycle(opening, closing, taxonomy) {
            Some(CycleKind::LoadCycle)
        } else if closes_dump_cycle(opening, closing, taxonomy) {
            Some(CycleKind::DumpCycle)
        } else {
            None
        };

        match kind {
            Some(kind) => {
                let start_time = opening.transition.entry_time;
                let end_time = closing.transition.exit_time;
                cycles.push(Cycle {
                    cycle_id: cycles.len() as u64,
                    vehicle: opening.transition.vehicle.clone(),
                    kind,
                    start_time,
                    end_time,
                    total_duration_s: (end_time - start_time).num_milliseconds() as f64 / 1000.0,
                    opening_origin: opening.transition.origin.clone(),
                    closing_destination: closing.transition.destination.clone(),
                });
                // The closing half cannot open another cycle.
                i += 2;
            }
            None => i += 1,
        }
    }

    if !cycles.is_empty() {
        info!("Detected {} complete cycle(s)", cycles.len());
    }
    cycles
}
