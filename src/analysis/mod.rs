// src/analysis/mod.rs
//
// Analysis stages, in pipeline order:
//
//   GPS events ─┬─> dwell ──> transitions ──> classifier ──> cycles
//               │                 │
//               │               shift (tagging, used by transitions/travel)
//               ├─> travel
//               └─> zones
//
//   classified + travel ──> metrics
//
// Every stage is a pure function over sorted slices; the orchestrator in
// pipeline/ owns sequencing and per-vehicle grouping.

pub mod classifier;
pub mod cycles;
pub mod dwell;
pub mod metrics;
pub mod shift;
pub mod transitions;
pub mod travel;
pub mod zones;

pub use classifier::classify_transitions;
pub use cycles::detect_cycles;
pub use dwell::segment_dwells;
pub use shift::ShiftSchedule;
pub use transitions::{build_transitions, consolidate_self_transitions};
pub use travel::{count_unknown_endpoints, extract_travel_intervals};
pub use zones::{extract_episodes, propose_zones, CandidateZone, StationaryEpisode};
