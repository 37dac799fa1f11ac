// src/pipeline/orchestrator.rs
//
// Runs the whole analysis over one normalized event batch. Stages are pure;
// this module owns sequencing, per-vehicle grouping, and the quality report.
// Same events + same config always produce the same output.

use crate::analysis::{
    self,
    metrics::{self, DailyProductivity, HourlyProduction, VehicleDwellMetrics, VehicleTravelMetrics},
    zones::{CandidateZone, StationaryEpisode},
    ShiftSchedule,
};
use crate::ingest::group_by_vehicle;
use crate::taxonomy::GeofenceTaxonomy;
use crate::types::{ClassifiedTransition, Config, Cycle, Dwell, GpsEvent, TravelInterval};
use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

/// Data-quality findings surfaced alongside the result tables.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QualityReport {
    pub unclassified_labels: Vec<String>,
    pub taxonomy_operationally_empty: bool,
    pub travel_unknown_origins: usize,
    pub travel_unknown_destinations: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct PipelineOutput {
    pub taxonomy: GeofenceTaxonomy,
    pub dwells: Vec<Dwell>,
    pub classified: Vec<ClassifiedTransition>,
    pub cycles: Vec<Cycle>,
    pub travel: Vec<TravelInterval>,
    pub episodes: Vec<StationaryEpisode>,
    pub candidate_zones: Vec<CandidateZone>,
    pub vehicle_dwell_metrics: Vec<VehicleDwellMetrics>,
    pub vehicle_travel_metrics: Vec<VehicleTravelMetrics>,
    pub hourly_production: Vec<HourlyProduction>,
    pub daily_productivity: Vec<DailyProductivity>,
    pub quality: QualityReport,
}

/// Full pipeline over a sorted, normalized event batch.
pub fn run(events: &[GpsEvent], config: &Config) -> Result<PipelineOutput> {
    if events.is_empty() {
        info!("No events to analyze");
        return Ok(PipelineOutput::default());
    }

    let schedule = ShiftSchedule::from_config(&config.shift)?;
    let taxonomy = GeofenceTaxonomy::from_labels(events.iter().map(|e| e.geofence.as_str()));
    if taxonomy.is_operationally_empty() {
        warn!("No operational geofence recognized; every move will classify as OTHER");
    }

    let mut dwells = Vec::new();
    let mut transitions = Vec::new();
    let mut travel = Vec::new();
    let mut episodes = Vec::new();
    let mut zone_candidate_points = 0;

    for (vehicle, stream) in group_by_vehicle(events) {
        let vehicle_dwells =
            analysis::segment_dwells(stream, config.pipeline.noise_threshold_seconds);
        let mut vehicle_transitions = analysis::build_transitions(&vehicle_dwells, &schedule);
        if config.pipeline.consolidate_self_transitions {
            vehicle_transitions = analysis::consolidate_self_transitions(vehicle_transitions);
        }

        info!(
            "{}: {} pings -> {} dwells, {} transitions",
            vehicle,
            stream.len(),
            vehicle_dwells.len(),
            vehicle_transitions.len()
        );

        dwells.extend(vehicle_dwells);
        transitions.append(&mut vehicle_transitions);
        travel.extend(analysis::extract_travel_intervals(
            stream,
            &schedule,
            config.travel.min_travel_seconds,
        ));
        let (vehicle_episodes, candidate_points) =
            analysis::extract_episodes(stream, &config.zones);
        episodes.extend(vehicle_episodes);
        zone_candidate_points += candidate_points;
    }

    let classified = analysis::classify_transitions(&transitions, &taxonomy);
    let cycles = analysis::detect_cycles(&classified, &taxonomy);
    let candidate_zones = analysis::propose_zones(&episodes, zone_candidate_points, &config.zones);

    let (travel_unknown_origins, travel_unknown_destinations) =
        analysis::count_unknown_endpoints(&travel);
    let quality = QualityReport {
        unclassified_labels: taxonomy.unclassified.iter().cloned().collect(),
        taxonomy_operationally_empty: taxonomy.is_operationally_empty(),
        travel_unknown_origins,
        travel_unknown_destinations,
    };

    Ok(PipelineOutput {
        vehicle_dwell_metrics: metrics::vehicle_dwell_metrics(&classified),
        vehicle_travel_metrics: metrics::vehicle_travel_metrics(&travel),
        hourly_production: metrics::hourly_production(&classified),
        daily_productivity: metrics::daily_productivity(&classified),
        taxonomy,
        dwells,
        classified,
        cycles,
        travel,
        episodes,
        candidate_zones,
        quality,
    })
}
