// src/ingest.rs
//
// Event normalizer: turns a raw CSV export into typed, time-sorted GpsEvent
// records partitioned by vehicle. Column headers are matched tolerantly
// (accents and case stripped) because site exports are not consistent.
// A row with an unparseable timestamp is dropped and counted, never fatal;
// the only fatal condition is a missing required column.

use crate::taxonomy::normalize;
use crate::types::GpsEvent;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Timestamp formats tried in order. Site exports have shipped all of these.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("input is missing required column(s): {0:?}")]
    MissingColumns(Vec<String>),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub rows_read: u64,
    pub rows_kept: u64,
    pub rows_dropped_bad_timestamp: u64,
    pub vehicles: u64,
}

/// Column indices resolved from the header row.
#[derive(Debug, Clone)]
struct ColumnMap {
    vehicle: usize,
    timestamp: usize,
    geofence: usize,
    latitude: Option<usize>,
    longitude: Option<usize>,
    speed: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, IngestError> {
        let normalized: Vec<String> = headers.iter().map(normalize).collect();

        let find = |keys: &[&str]| -> Option<usize> {
            normalized
                .iter()
                .position(|h| keys.iter().any(|k| h.contains(k)))
        };

        let vehicle = find(&["vehic"]);
        let timestamp = find(&["tiempo", "time"]);
        let geofence = find(&["geocerca", "geofence"]);

        let mut missing = Vec::new();
        if vehicle.is_none() {
            missing.push("vehicle".to_string());
        }
        if timestamp.is_none() {
            missing.push("event time".to_string());
        }
        if geofence.is_none() {
            missing.push("geofence".to_string());
        }
        if !missing.is_empty() {
            return Err(IngestError::MissingColumns(missing));
        }

        Ok(Self {
            vehicle: vehicle.unwrap(),
            timestamp: timestamp.unwrap(),
            geofence: geofence.unwrap(),
            latitude: find(&["latitud", "lat"]),
            longitude: find(&["longitud", "lon"]),
            speed: find(&["velocidad", "speed"]),
        })
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn parse_optional_f64(record: &csv::StringRecord, idx: Option<usize>) -> Option<f64> {
    idx.and_then(|i| record.get(i))
        .and_then(|v| v.trim().parse::<f64>().ok())
}

/// Reads and normalizes a CSV dataset from any reader. Output is sorted by
/// (vehicle, timestamp) so downstream stages can work on contiguous
/// per-vehicle runs.
pub fn read_events<R: Read>(reader: R) -> Result<(Vec<GpsEvent>, IngestReport)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers().context("reading CSV header row")?;
    let columns = ColumnMap::resolve(headers)?;

    let mut events = Vec::new();
    let mut report = IngestReport::default();

    for record in csv_reader.records() {
        let record = record.context("reading CSV record")?;
        report.rows_read += 1;

        let raw_ts = record.get(columns.timestamp).unwrap_or("");
        let timestamp = match parse_timestamp(raw_ts) {
            Some(ts) => ts,
            None => {
                report.rows_dropped_bad_timestamp += 1;
                debug!("dropping row {}: bad timestamp {:?}", report.rows_read, raw_ts);
                continue;
            }
        };

        let vehicle = record
            .get(columns.vehicle)
            .unwrap_or("")
            .trim()
            .to_string();
        let geofence = record
            .get(columns.geofence)
            .unwrap_or("")
            .trim()
            .to_string();

        events.push(GpsEvent {
            vehicle,
            timestamp,
            geofence,
            latitude: parse_optional_f64(&record, columns.latitude),
            longitude: parse_optional_f64(&record, columns.longitude),
            speed_kmh: parse_optional_f64(&record, columns.speed),
        });
    }

    events.sort_by(|a, b| {
        a.vehicle
            .cmp(&b.vehicle)
            .then(a.timestamp.cmp(&b.timestamp))
    });

    report.rows_kept = events.len() as u64;
    report.vehicles = group_by_vehicle(&events).len() as u64;

    if report.rows_dropped_bad_timestamp > 0 {
        warn!(
            "Dropped {} of {} rows with unparseable timestamps",
            report.rows_dropped_bad_timestamp, report.rows_read
        );
    }
    info!(
        "Ingested {} events for {} vehicle(s)",
        report.rows_kept, report.vehicles
    );

    Ok((events, report))
}

pub fn read_events_from_path(path: &Path) -> Result<(Vec<GpsEvent>, IngestReport)> {
    let file =
        File::open(path).with_context(|| format!("opening dataset {}", path.display()))?;
    read_events(file)
}

/// Splits a (vehicle, timestamp)-sorted event slice into contiguous
/// per-vehicle runs without copying.
pub fn group_by_vehicle(events: &[GpsEvent]) -> Vec<(&str, &[GpsEvent])> {
    let mut groups = Vec::new();
    let mut start = 0;
    for i in 1..=events.len() {
        if i == events.len() || events[i].vehicle != events[start].vehicle {
            groups.push((events[start].vehicle.as_str(), &events[start..i]));
            start = i;
        }
    }
    groups
}
