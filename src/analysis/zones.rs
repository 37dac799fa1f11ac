// src/analysis/zones.rs
//
// Unmapped-zone discovery. Trucks that repeatedly sit still outside every
// geofence are probably using a real location the site map doesn't cover.
// Two stages: per-vehicle stationary episodes from slow in-transit pings,
// then density clustering of episode centroids into candidate zones.

use crate::types::{GpsEvent, ZonesConfig};
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info};

const METERS_PER_DEGREE: f64 = 111_000.0;
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A continuous slow-speed stay of one vehicle outside every geofence.
#[derive(Debug, Clone, Serialize)]
pub struct StationaryEpisode {
    pub vehicle: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub duration_minutes: f64,
    pub centroid_lat: f64,
    pub centroid_lon: f64,
    /// Spatial spread of the episode's pings, in metres.
    pub radius_m: f64,
    pub point_count: usize,
    pub mean_speed_kmh: f64,
}

/// A cluster of stationary episodes proposed as a missing geofence.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateZone {
    pub zone_id: u64,
    pub centroid_lat: f64,
    pub centroid_lon: f64,
    pub radius_m: f64,
    pub episode_count: usize,
    pub total_dwell_minutes: f64,
    pub total_points: usize,
    pub vehicles: Vec<String>,
    pub first_seen: NaiveDateTime,
    pub last_seen: NaiveDateTime,
}

pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Extracts stationary episodes from one vehicle's sorted event stream.
/// Also returns the raw candidate-ping count, which feeds the fleet-wide
/// evidence gate in [`propose_zones`] — pings discarded by the episode
/// filters still count as evidence.
///
/// A candidate ping is in transit, has coordinates, and is slow (missing
/// speed counts as slow; site exports drop the field when a truck is
/// parked). A gap longer than `episode_gap_seconds` splits the run.
pub fn extract_episodes(
    events: &[GpsEvent],
    config: &ZonesConfig,
) -> (Vec<StationaryEpisode>, usize) {
    let candidates: Vec<&GpsEvent> = events
        .iter()
        .filter(|e| {
            e.in_transit()
                && e.latitude.is_some()
                && e.longitude.is_some()
                && e.speed_kmh.map_or(true, |s| s <= config.speed_threshold_kmh)
        })
        .collect();
    let candidate_count = candidates.len();

    let mut episodes = Vec::new();
    let mut run: Vec<&GpsEvent> = Vec::new();

    for candidate in candidates {
        if let Some(last) = run.last() {
            let gap = (candidate.timestamp - last.timestamp).num_milliseconds() as f64 / 1000.0;
            if gap > config.episode_gap_seconds {
                close_run(&run, config, &mut episodes);
                run.clear();
            }
        }
        run.push(candidate);
    }
    close_run(&run, config, &mut episodes);

    if !episodes.is_empty() {
        debug!(
            "{}: {} stationary episode(s) outside geofences",
            events[0].vehicle,
            episodes.len()
        );
    }
    (episodes, candidate_count)
}

fn close_run(run: &[&GpsEvent], config: &ZonesConfig, episodes: &mut Vec<StationaryEpisode>) {
    if run.len() < config.min_episode_points {
        return;
    }
    let start = run[0].timestamp;
    let end = run[run.len() - 1].timestamp;
    let duration_minutes = (end - start).num_milliseconds() as f64 / 60_000.0;
    if duration_minutes < config.min_episode_minutes {
        return;
    }

    let lats: Vec<f64> = run.iter().map(|e| e.latitude.unwrap_or(0.0)).collect();
    let lons: Vec<f64> = run.iter().map(|e| e.longitude.unwrap_or(0.0)).collect();
    let centroid_lat = lats.iter().sum::<f64>() / lats.len() as f64;
    let centroid_lon = lons.iter().sum::<f64>() / lons.len() as f64;
    let radius_m =
        (sample_std(&lats).powi(2) + sample_std(&lons).powi(2)).sqrt() * METERS_PER_DEGREE;

    let speeds: Vec<f64> = run.iter().filter_map(|e| e.speed_kmh).collect();
    let mean_speed_kmh = if speeds.is_empty() {
        0.0
    } else {
        speeds.iter().sum::<f64>() / speeds.len() as f64
    };

    episodes.push(StationaryEpisode {
        vehicle: run[0].vehicle.clone(),
        start_time: start,
        end_time: end,
        duration_minutes,
        centroid_lat,
        centroid_lon,
        radius_m,
        point_count: run.len(),
        mean_speed_kmh,
    });
}

/// Clusters the fleet's stationary episodes into candidate zones, sorted
/// by total dwell time descending.
///
/// `candidate_points` is the fleet-wide raw candidate-ping count from
/// episode extraction. The gate runs on that number, not on the points
/// surviving inside kept episodes: a thin episode backed by plenty of raw
/// slow pings is still evidence.
pub fn propose_zones(
    episodes: &[StationaryEpisode],
    candidate_points: usize,
    config: &ZonesConfig,
) -> Vec<CandidateZone> {
    if candidate_points < config.min_total_points {
        debug!(
            "Only {} slow off-geofence ping(s) fleet-wide, below the {} needed to propose zones",
            candidate_points, config.min_total_points
        );
        return Vec::new();
    }

    let mut zones: Vec<CandidateZone> = cluster_episodes(episodes, config.clustering_radius_m)
        .into_iter()
        .map(|members| build_zone(&members))
        .collect();

    zones.sort_by(|a, b| {
        b.total_dwell_minutes
            .partial_cmp(&a.total_dwell_minutes)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for (i, zone) in zones.iter_mut().enumerate() {
        zone.zone_id = i as u64;
    }

    info!("Proposed {} candidate zone(s)", zones.len());
    zones
}

/// Single-linkage clustering over episode centroids: two episodes join the
/// same cluster when their centroids lie within `radius_m` of each other,
/// directly or through a chain of neighbours.
fn cluster_episodes(episodes: &[StationaryEpisode], radius_m: f64) -> Vec<Vec<&StationaryEpisode>> {
    let mut cluster_of: Vec<Option<usize>> = vec![None; episodes.len()];
    let mut clusters: Vec<Vec<&StationaryEpisode>> = Vec::new();

    for i in 0..episodes.len() {
        if cluster_of[i].is_some() {
            continue;
        }
        let id = clusters.len();
        clusters.push(Vec::new());

        let mut stack = vec![i];
        cluster_of[i] = Some(id);
        while let Some(current) = stack.pop() {
            clusters[id].push(&episodes[current]);
            for next in 0..episodes.len() {
                if cluster_of[next].is_some() {
                    continue;
                }
                let d = haversine_m(
                    episodes[current].centroid_lat,
                    episodes[current].centroid_lon,
                    episodes[next].centroid_lat,
                    episodes[next].centroid_lon,
                );
                if d <= radius_m {
                    cluster_of[next] = Some(id);
                    stack.push(next);
                }
            }
        }
    }

    clusters
}

fn build_zone(members: &[&StationaryEpisode]) -> CandidateZone {
    let total_dwell_minutes: f64 = members.iter().map(|e| e.duration_minutes).sum();

    // Duration-weighted centroid: long stays anchor the zone.
    let weight = if total_dwell_minutes > 0.0 {
        total_dwell_minutes
    } else {
        members.len() as f64
    };
    let (mut centroid_lat, mut centroid_lon) = (0.0, 0.0);
    for member in members {
        let w = if total_dwell_minutes > 0.0 {
            member.duration_minutes
        } else {
            1.0
        };
        centroid_lat += member.centroid_lat * w / weight;
        centroid_lon += member.centroid_lon * w / weight;
    }

    // A singleton passes through with its own spread; a merged zone spans
    // the farthest member centroid.
    let radius_m = if members.len() == 1 {
        members[0].radius_m
    } else {
        members
            .iter()
            .map(|m| haversine_m(centroid_lat, centroid_lon, m.centroid_lat, m.centroid_lon))
            .fold(0.0f64, f64::max)
    };

    let mut vehicles: Vec<String> = members.iter().map(|m| m.vehicle.clone()).collect();
    vehicles.sort();
    vehicles.dedup();

    CandidateZone {
        zone_id: 0,
        centroid_lat,
        centroid_lon,
        radius_m,
        episode_count: members.len(),
        total_dwell_minutes,
        total_points: members.iter().map(|m| m.point_count).sum(),
        vehicles,
        first_seen: members.iter().map(|m| m.start_time).min().unwrap(),
        last_seen: members.iter().map(|m| m.end_time).max().unwrap(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn ping(h: u32, min: u32, lat: f64, lon: f64, speed: f64) -> GpsEvent {
        GpsEvent {
            vehicle: "Truck-01".to_string(),
            timestamp: ts(h, min),
            geofence: String::new(),
            latitude: Some(lat),
            longitude: Some(lon),
            speed_kmh: Some(speed),
        }
    }

    fn stationary_run(h: u32, lat: f64, lon: f64, count: u32) -> Vec<GpsEvent> {
        (0..count).map(|i| ping(h, i * 3, lat, lon, 1.0)).collect()
    }

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude is ~111.2 km.
        let d = haversine_m(-24.0, -69.0, -23.0, -69.0);
        assert!((d - 111_195.0).abs() < 100.0, "got {d}");
        assert_eq!(haversine_m(-24.0, -69.0, -24.0, -69.0), 0.0);
    }

    #[test]
    fn test_episode_extraction_basic() {
        let events = stationary_run(10, -24.1, -69.2, 5);
        let (episodes, candidates) = extract_episodes(&events, &ZonesConfig::default());

        assert_eq!(candidates, 5);
        assert_eq!(episodes.len(), 1);
        let e = &episodes[0];
        assert_eq!(e.point_count, 5);
        assert_eq!(e.duration_minutes, 12.0);
        assert!((e.centroid_lat - (-24.1)).abs() < 1e-9);
        assert_eq!(e.radius_m, 0.0);
        assert_eq!(e.mean_speed_kmh, 1.0);
    }

    #[test]
    fn test_fast_and_geofenced_pings_are_not_candidates() {
        let mut events = stationary_run(10, -24.1, -69.2, 5);
        for e in &mut events[..2] {
            e.speed_kmh = Some(40.0);
        }
        // 3 slow points left but only 6 minutes, below the episode minimum
        let (episodes, candidates) = extract_episodes(&events, &ZonesConfig::default());
        assert!(episodes.is_empty());
        assert_eq!(candidates, 3);

        let mut inside = stationary_run(10, -24.1, -69.2, 5);
        for e in &mut inside {
            e.geofence = "Stock 1".to_string();
        }
        let (episodes, candidates) = extract_episodes(&inside, &ZonesConfig::default());
        assert!(episodes.is_empty());
        assert_eq!(candidates, 0);
    }

    #[test]
    fn test_missing_speed_counts_as_slow() {
        let mut events = stationary_run(10, -24.1, -69.2, 5);
        for e in &mut events {
            e.speed_kmh = None;
        }
        let (episodes, _) = extract_episodes(&events, &ZonesConfig::default());
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].mean_speed_kmh, 0.0);
    }

    #[test]
    fn test_time_gap_splits_episodes() {
        let mut events = stationary_run(10, -24.1, -69.2, 5);
        events.extend(stationary_run(11, -24.1, -69.2, 5));
        // 10:12 to 11:00 is a 48-minute gap, well past the 300 s limit
        let (episodes, _) = extract_episodes(&events, &ZonesConfig::default());
        assert_eq!(episodes.len(), 2);
    }

    #[test]
    fn test_short_episodes_are_dropped_but_still_counted() {
        let events: Vec<GpsEvent> = (0..3).map(|i| ping(10, i * 4, -24.1, -69.2, 1.0)).collect();
        // 3 points but 8 minutes total, under the 10-minute floor
        let (episodes, candidates) = extract_episodes(&events, &ZonesConfig::default());
        assert!(episodes.is_empty());
        assert_eq!(candidates, 3);
    }

    fn episode(vehicle: &str, h: u32, lat: f64, lon: f64, minutes: f64) -> StationaryEpisode {
        StationaryEpisode {
            vehicle: vehicle.to_string(),
            start_time: ts(h, 0),
            end_time: ts(h, minutes as u32),
            duration_minutes: minutes,
            centroid_lat: lat,
            centroid_lon: lon,
            radius_m: 2.0,
            point_count: 6,
            mean_speed_kmh: 1.0,
        }
    }

    #[test]
    fn test_nearby_episodes_merge_into_one_zone() {
        // ~5.5 m apart in latitude, inside the 10 m clustering radius
        let episodes = vec![
            episode("Truck-01", 10, -24.10000, -69.2, 30.0),
            episode("Truck-02", 12, -24.10005, -69.2, 10.0),
        ];
        let zones = propose_zones(&episodes, 20, &ZonesConfig::default());

        assert_eq!(zones.len(), 1);
        let zone = &zones[0];
        assert_eq!(zone.episode_count, 2);
        assert_eq!(zone.total_dwell_minutes, 40.0);
        assert_eq!(zone.vehicles, vec!["Truck-01", "Truck-02"]);
        assert_eq!(zone.first_seen, ts(10, 0));
        assert_eq!(zone.last_seen, ts(12, 10));
        // Weighted centroid sits closer to the 30-minute episode
        assert!((zone.centroid_lat - (-24.10000)).abs() < (zone.centroid_lat - (-24.10005)).abs());
    }

    #[test]
    fn test_distant_episodes_stay_separate() {
        let episodes = vec![
            episode("Truck-01", 10, -24.10, -69.2, 30.0),
            episode("Truck-01", 12, -24.20, -69.2, 10.0),
        ];
        let zones = propose_zones(&episodes, 20, &ZonesConfig::default());
        assert_eq!(zones.len(), 2);
        // Sorted by dwell time descending, ids sequential
        assert!(zones[0].total_dwell_minutes >= zones[1].total_dwell_minutes);
        assert_eq!(zones[0].zone_id, 0);
        assert_eq!(zones[1].zone_id, 1);
    }

    #[test]
    fn test_gate_runs_on_raw_candidate_pings() {
        // Only 6 points survived into the episode, but 12 raw slow pings
        // were seen fleet-wide: enough evidence, the zone is proposed.
        let mut lone = episode("Truck-01", 10, -24.1, -69.2, 30.0);
        lone.point_count = 6;
        let zones = propose_zones(std::slice::from_ref(&lone), 12, &ZonesConfig::default());
        assert_eq!(zones.len(), 1);

        // The same episode with too few raw pings behind it proposes nothing.
        assert!(propose_zones(&[lone], 6, &ZonesConfig::default()).is_empty());
    }

    #[test]
    fn test_zone_radius_reaches_farthest_member() {
        let episodes = vec![
            episode("Truck-01", 10, -24.10000, -69.2, 20.0),
            episode("Truck-01", 12, -24.10005, -69.2, 20.0),
        ];
        let zones = propose_zones(&episodes, 20, &ZonesConfig::default());
        // Equal weights put the centroid midway; ~2.8 m to either member
        assert!(zones[0].radius_m > 2.0 && zones[0].radius_m < 4.0);
    }

    #[test]
    fn test_singleton_zone_passes_through() {
        let mut lone = episode("Truck-01", 10, -24.1, -69.2, 30.0);
        lone.point_count = 12;
        let zones = propose_zones(&[lone.clone()], 12, &ZonesConfig::default());

        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].episode_count, 1);
        assert_eq!(zones[0].total_points, lone.point_count);
        assert_eq!(zones[0].radius_m, lone.radius_m);
        assert_eq!(zones[0].centroid_lat, lone.centroid_lat);
    }
}
