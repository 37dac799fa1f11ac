// src/analysis/metrics.rs
//
// Aggregate reporting over the classified tables: per-vehicle dwell and
// travel statistics, hourly production counts, and daily productivity.
// All grouping goes through BTreeMap so the output ordering is stable
// across runs.

use crate::types::{ClassifiedTransition, Process, TravelInterval};
use chrono::{NaiveDate, Timelike};
use serde::Serialize;
use std::collections::BTreeMap;

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleDwellMetrics {
    pub vehicle: String,
    pub trips: usize,
    pub load_trips: usize,
    pub dump_trips: usize,
    pub return_trips: usize,
    pub other_trips: usize,
    pub mean_duration_s: f64,
    pub std_duration_s: f64,
    pub min_duration_s: f64,
    pub max_duration_s: f64,
}

pub fn vehicle_dwell_metrics(classified: &[ClassifiedTransition]) -> Vec<VehicleDwellMetrics> {
    let mut by_vehicle: BTreeMap<&str, Vec<&ClassifiedTransition>> = BTreeMap::new();
    for c in classified {
        by_vehicle.entry(&c.transition.vehicle).or_default().push(c);
    }

    by_vehicle
        .into_iter()
        .map(|(vehicle, trips)| {
            let durations: Vec<f64> = trips.iter().map(|c| c.transition.duration_s).collect();
            let count_of = |p: Process| trips.iter().filter(|c| c.process == p).count();
            VehicleDwellMetrics {
                vehicle: vehicle.to_string(),
                trips: trips.len(),
                load_trips: count_of(Process::Load),
                dump_trips: count_of(Process::Dump),
                return_trips: count_of(Process::Return),
                other_trips: count_of(Process::Other),
                mean_duration_s: mean(&durations),
                std_duration_s: sample_std(&durations),
                min_duration_s: durations.iter().copied().fold(f64::INFINITY, f64::min),
                max_duration_s: durations.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleTravelMetrics {
    pub vehicle: String,
    pub intervals: usize,
    pub mean_duration_s: f64,
    pub std_duration_s: f64,
    pub min_duration_s: f64,
    pub max_duration_s: f64,
    pub total_travel_minutes: f64,
}

pub fn vehicle_travel_metrics(intervals: &[TravelInterval]) -> Vec<VehicleTravelMetrics> {
    let mut by_vehicle: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for t in intervals {
        by_vehicle.entry(&t.vehicle).or_default().push(t.duration_s);
    }

    by_vehicle
        .into_iter()
        .map(|(vehicle, durations)| VehicleTravelMetrics {
            vehicle: vehicle.to_string(),
            intervals: durations.len(),
            mean_duration_s: mean(&durations),
            std_duration_s: sample_std(&durations),
            min_duration_s: durations.iter().copied().fold(f64::INFINITY, f64::min),
            max_duration_s: durations.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            total_travel_minutes: durations.iter().sum::<f64>() / 60.0,
        })
        .collect()
}

/// Production counts for one wall-clock hour, floored from entry_time.
#[derive(Debug, Clone, Serialize)]
pub struct HourlyProduction {
    pub date: NaiveDate,
    pub hour: u32,
    pub loads: usize,
    pub dumps: usize,
}

pub fn hourly_production(classified: &[ClassifiedTransition]) -> Vec<HourlyProduction> {
    let mut by_hour: BTreeMap<(NaiveDate, u32), (usize, usize)> = BTreeMap::new();
    for c in classified {
        let key = (c.transition.entry_time.date(), c.transition.entry_time.hour());
        match c.process {
            Process::Load => by_hour.entry(key).or_default().0 += 1,
            Process::Dump => by_hour.entry(key).or_default().1 += 1,
            _ => {}
        }
    }

    by_hour
        .into_iter()
        .map(|((date, hour), (loads, dumps))| HourlyProduction {
            date,
            hour,
            loads,
            dumps,
        })
        .collect()
}

/// One vehicle-day of productivity: share of active hours spent on load
/// moves. Active time is the sum of classified move durations.
#[derive(Debug, Clone, Serialize)]
pub struct DailyProductivity {
    pub date: NaiveDate,
    pub vehicle: String,
    pub active_hours: f64,
    pub load_hours: f64,
    pub productivity_pct: f64,
}

pub fn daily_productivity(classified: &[ClassifiedTransition]) -> Vec<DailyProductivity> {
    let mut by_day: BTreeMap<(NaiveDate, &str), (f64, f64)> = BTreeMap::new();
    for c in classified {
        let key = (c.transition.entry_time.date(), c.transition.vehicle.as_str());
        let entry = by_day.entry(key).or_default();
        entry.0 += c.transition.duration_s;
        if c.process == Process::Load {
            entry.1 += c.transition.duration_s;
        }
    }

    by_day
        .into_iter()
        .map(|((date, vehicle), (active_s, load_s))| DailyProductivity {
            date,
            vehicle: vehicle.to_string(),
            active_hours: active_s / 3600.0,
            load_hours: load_s / 3600.0,
            productivity_pct: if active_s > 0.0 {
                load_s / active_s * 100.0
            } else {
                0.0
            },
        })
        .collect()
}
