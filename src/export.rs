// src/export.rs
//
// Result export: one CSV per table plus a JSON run summary, all under the
// configured output directory. Row structs are flat, export-only shapes so
// the CSV headers stay stable even when the internal types grow fields.

use crate::analysis::ShiftSchedule;
use crate::pipeline::PipelineOutput;
use crate::types::{ShiftTag, Transition};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
struct TransitionRow<'a> {
    vehicle: &'a str,
    origin: &'a str,
    destination: &'a str,
    entry_time: String,
    exit_time: String,
    duration_s: f64,
    process: &'static str,
    shift: &'static str,
    shift_date: String,
    shift_description: String,
    consolidated_stays: u32,
}

impl<'a> TransitionRow<'a> {
    fn new(transition: &'a Transition, process: &'static str, schedule: &ShiftSchedule) -> Self {
        let tag = ShiftTag {
            shift: transition.shift,
            shift_date: transition.shift_date,
        };
        Self {
            vehicle: &transition.vehicle,
            origin: &transition.origin,
            destination: &transition.destination,
            entry_time: transition.entry_time.format(TIME_FORMAT).to_string(),
            exit_time: transition.exit_time.format(TIME_FORMAT).to_string(),
            duration_s: transition.duration_s,
            process,
            shift: transition.shift.as_str(),
            shift_date: transition.shift_date.format("%Y-%m-%d").to_string(),
            shift_description: schedule.describe(tag),
            consolidated_stays: transition.consolidated_stays,
        }
    }
}

#[derive(Debug, Serialize)]
struct DwellRow<'a> {
    vehicle: &'a str,
    geofence: &'a str,
    entry_time: String,
    exit_time: String,
    duration_s: f64,
}

#[derive(Debug, Serialize)]
struct CycleRow<'a> {
    cycle_id: u64,
    vehicle: &'a str,
    kind: &'static str,
    start_time: String,
    end_time: String,
    total_duration_s: f64,
    opening_origin: &'a str,
    closing_destination: &'a str,
}

#[derive(Debug, Serialize)]
struct TravelRow<'a> {
    vehicle: &'a str,
    origin: &'a str,
    destination: &'a str,
    start_time: String,
    end_time: String,
    duration_s: f64,
    shift: &'static str,
    shift_date: String,
}

#[derive(Debug, Serialize)]
struct ZoneRow {
    zone_id: u64,
    centroid_lat: f64,
    centroid_lon: f64,
    radius_m: f64,
    episode_count: usize,
    total_dwell_minutes: f64,
    total_points: usize,
    vehicles: String,
    first_seen: String,
    last_seen: String,
}

fn write_csv<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut count = 0;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

/// Writes every result table plus `summary.json` into `output_dir`,
/// creating the directory if needed.
pub fn export_all(
    output: &PipelineOutput,
    schedule: &ShiftSchedule,
    output_dir: &str,
) -> Result<()> {
    let dir = PathBuf::from(output_dir);
    fs::create_dir_all(&dir).with_context(|| format!("creating output dir {output_dir}"))?;

    let n = write_csv(
        &dir.join("transitions.csv"),
        output.classified.iter().map(|c| {
            TransitionRow::new(&c.transition, c.process.as_str(), schedule)
        }),
    )?;
    info!("Wrote {n} transition(s)");

    let n = write_csv(
        &dir.join("dwells.csv"),
        output.dwells.iter().map(|d| DwellRow {
            vehicle: &d.vehicle,
            geofence: if d.is_transit() { "(in transit)" } else { &d.geofence },
            entry_time: d.entry_time.format(TIME_FORMAT).to_string(),
            exit_time: d.exit_time.format(TIME_FORMAT).to_string(),
            duration_s: d.duration_s(),
        }),
    )?;
    info!("Wrote {n} dwell(s)");

    let n = write_csv(
        &dir.join("cycles.csv"),
        output.cycles.iter().map(|c| CycleRow {
            cycle_id: c.cycle_id,
            vehicle: &c.vehicle,
            kind: c.kind.as_str(),
            start_time: c.start_time.format(TIME_FORMAT).to_string(),
            end_time: c.end_time.format(TIME_FORMAT).to_string(),
            total_duration_s: c.total_duration_s,
            opening_origin: &c.opening_origin,
            closing_destination: &c.closing_destination,
        }),
    )?;
    info!("Wrote {n} cycle(s)");

    let n = write_csv(
        &dir.join("travel.csv"),
        output.travel.iter().map(|t| TravelRow {
            vehicle: &t.vehicle,
            origin: &t.origin,
            destination: &t.destination,
            start_time: t.start_time.format(TIME_FORMAT).to_string(),
            end_time: t.end_time.format(TIME_FORMAT).to_string(),
            duration_s: t.duration_s,
            shift: t.shift.as_str(),
            shift_date: t.shift_date.format("%Y-%m-%d").to_string(),
        }),
    )?;
    info!("Wrote {n} travel interval(s)");

    let n = write_csv(
        &dir.join("candidate_zones.csv"),
        output.candidate_zones.iter().map(|z| ZoneRow {
            zone_id: z.zone_id,
            centroid_lat: z.centroid_lat,
            centroid_lon: z.centroid_lon,
            radius_m: z.radius_m,
            episode_count: z.episode_count,
            total_dwell_minutes: z.total_dwell_minutes,
            total_points: z.total_points,
            vehicles: z.vehicles.join(";"),
            first_seen: z.first_seen.format(TIME_FORMAT).to_string(),
            last_seen: z.last_seen.format(TIME_FORMAT).to_string(),
        }),
    )?;
    info!("Wrote {n} candidate zone(s)");

    write_csv(
        &dir.join("vehicle_dwell_metrics.csv"),
        output.vehicle_dwell_metrics.iter(),
    )?;
    write_csv(
        &dir.join("vehicle_travel_metrics.csv"),
        output.vehicle_travel_metrics.iter(),
    )?;
    write_csv(&dir.join("hourly_production.csv"), output.hourly_production.iter())?;
    write_csv(
        &dir.join("daily_productivity.csv"),
        output.daily_productivity.iter(),
    )?;

    let summary = serde_json::json!({
        "taxonomy": output.taxonomy,
        "quality": output.quality,
        "counts": {
            "dwells": output.dwells.len(),
            "transitions": output.classified.len(),
            "cycles": output.cycles.len(),
            "travel_intervals": output.travel.len(),
            "stationary_episodes": output.episodes.len(),
            "candidate_zones": output.candidate_zones.len(),
        },
    });
    let summary_path = dir.join("summary.json");
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)
        .with_context(|| format!("writing {}", summary_path.display()))?;
    info!("Wrote run summary to {}", summary_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Config, GpsEvent};
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn ping(h: u32, min: u32, geofence: &str) -> GpsEvent {
        GpsEvent {
            vehicle: "Truck-01".to_string(),
            timestamp: ts(h, min),
            geofence: geofence.to_string(),
            latitude: None,
            longitude: None,
            speed_kmh: None,
        }
    }

    #[test]
    fn test_export_writes_all_tables() {
        let events = vec![
            ping(8, 0, "Stock 1"),
            ping(8, 10, "Stock 1"),
            ping(8, 20, "Módulo 1"),
            ping(8, 40, "Módulo 1"),
            ping(8, 50, "Stock 1"),
            ping(9, 0, "Stock 1"),
        ];
        let config = Config::default();
        let output = crate::pipeline::run(&events, &config).unwrap();
        let schedule = ShiftSchedule::from_config(&config.shift).unwrap();

        let dir = std::env::temp_dir().join("haul-analytics-export-test");
        let _ = fs::remove_dir_all(&dir);
        export_all(&output, &schedule, dir.to_str().unwrap()).unwrap();

        for name in [
            "transitions.csv",
            "dwells.csv",
            "cycles.csv",
            "travel.csv",
            "candidate_zones.csv",
            "vehicle_dwell_metrics.csv",
            "vehicle_travel_metrics.csv",
            "hourly_production.csv",
            "daily_productivity.csv",
            "summary.json",
        ] {
            assert!(dir.join(name).exists(), "{name} missing");
        }

        let transitions = fs::read_to_string(dir.join("transitions.csv")).unwrap();
        assert!(transitions.contains("shift_description"));
        assert!(transitions.contains("LOAD"));
        assert!(transitions.contains("Day shift 15-01-2025 (08:00-19:59)"));

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.join("summary.json")).unwrap()).unwrap();
        assert_eq!(summary["counts"]["transitions"], 2);

        let _ = fs::remove_dir_all(&dir);
    }
}
