// src/analysis/classifier.rs
//
// Sequence-aware process classification. Each transition gets a process
// category from (origin role, destination role, previous category) — a
// first-order rule set: return moves only count when they immediately
// follow the load/dump they undo. An unrelated move in between breaks the
// link and the return degrades to OTHER. That memory length is deliberate
// and matches observed site reporting; do not widen it here.

use crate::taxonomy::GeofenceTaxonomy;
use crate::types::{ClassifiedTransition, Process, Transition};

/// Rules in priority order, first match wins:
/// 1. either endpoint non-operational        → Other
/// 2. stock → module/pile                    → Load
/// 3. module/pile → dump                     → Dump
/// 4. dump → module/pile after a Dump        → Return (else Other)
/// 5. module/pile → stock after a Load       → Return (else Other)
/// 6. anything else                          → Other
fn classify_one(
    transition: &Transition,
    previous: Option<Process>,
    taxonomy: &GeofenceTaxonomy,
) -> Process {
    let origin = transition.origin.as_str();
    let destination = transition.destination.as_str();

    if taxonomy.is_non_operational(origin) || taxonomy.is_non_operational(destination) {
        return Process::Other;
    }
    if taxonomy.is_stock(origin) && taxonomy.is_module_like(destination) {
        return Process::Load;
    }
    if taxonomy.is_module_like(origin) && taxonomy.is_dump(destination) {
        return Process::Dump;
    }
    if taxonomy.is_dump(origin) && taxonomy.is_module_like(destination) {
        return if previous == Some(Process::Dump) {
            Process::Return
        } else {
            Process::Other
        };
    }
    if taxonomy.is_module_like(origin) && taxonomy.is_stock(destination) {
        return if previous == Some(Process::Load) {
            Process::Return
        } else {
            Process::Other
        };
    }
    Process::Other
}

/// Classifies transitions in stream order. Input must be sorted by
/// (vehicle, entry_time); the previous-category context resets at each
/// vehicle boundary.
pub fn classify_transitions(
    transitions: &[Transition],
    taxonomy: &GeofenceTaxonomy,
) -> Vec<ClassifiedTransition> {
    let mut classified = Vec::with_capacity(transitions.len());
    let mut previous: Option<Process> = None;
    let mut previous_vehicle: Option<&str> = None;

    for transition in transitions {
        if previous_vehicle != Some(transition.vehicle.as_str()) {
            previous = None;
            previous_vehicle = Some(transition.vehicle.as_str());
        }

        let process = classify_one(transition, previous, taxonomy);
        previous = Some(process);
        classified.push(ClassifiedTransition {
            transition: transition.clone(),
            process,
        });
    }

    classified
}
