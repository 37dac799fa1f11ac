// src/types.rs

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub shift: ShiftConfig,
    #[serde(default)]
    pub zones: ZonesConfig,
    #[serde(default)]
    pub travel: TravelConfig,
    #[serde(default)]
    pub io: IoConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Same-label intervals shorter than this are GPS jitter, not a stay.
    pub noise_threshold_seconds: f64,
    /// Fold same-label transitions into the preceding real move.
    pub consolidate_self_transitions: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            noise_threshold_seconds: 60.0,
            consolidate_self_transitions: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftConfig {
    /// Local wall-clock start of the day shift, "HH:MM".
    pub day_start: String,
    /// Local wall-clock start of the night shift, "HH:MM".
    pub night_start: String,
}

impl Default for ShiftConfig {
    fn default() -> Self {
        Self {
            day_start: "08:00".to_string(),
            night_start: "20:00".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZonesConfig {
    pub speed_threshold_kmh: f64,
    pub min_episode_minutes: f64,
    pub episode_gap_seconds: f64,
    pub min_episode_points: usize,
    pub min_total_points: usize,
    pub clustering_radius_m: f64,
}

impl Default for ZonesConfig {
    fn default() -> Self {
        Self {
            speed_threshold_kmh: 5.0,
            min_episode_minutes: 10.0,
            episode_gap_seconds: 300.0,
            min_episode_points: 3,
            min_total_points: 10,
            clustering_radius_m: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelConfig {
    pub min_travel_seconds: f64,
}

impl Default for TravelConfig {
    fn default() -> Self {
        Self {
            min_travel_seconds: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoConfig {
    pub input_dir: String,
    pub output_dir: String,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            input_dir: "./data".to_string(),
            output_dir: "./output".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ============================================================================
// DOMAIN RECORDS
// ============================================================================

/// One raw GPS ping after normalization. Immutable; the whole pipeline
/// reads these and never writes them back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpsEvent {
    pub vehicle: String,
    pub timestamp: NaiveDateTime,
    /// Trimmed geofence label. Empty string means "between geofences".
    pub geofence: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed_kmh: Option<f64>,
}

impl GpsEvent {
    pub fn in_transit(&self) -> bool {
        self.geofence.is_empty()
    }
}

/// A continuous stay of one vehicle in one geofence (or in transit,
/// when the label is empty).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dwell {
    pub vehicle: String,
    pub geofence: String,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
}

impl Dwell {
    pub fn duration_s(&self) -> f64 {
        (self.exit_time - self.entry_time).num_milliseconds() as f64 / 1000.0
    }

    pub fn is_transit(&self) -> bool {
        self.geofence.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shift {
    Day,
    Night,
}

impl Shift {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "DAY",
            Self::Night => "NIGHT",
        }
    }
}

/// Which shift an instant belongs to, and the calendar date the shift
/// started on (night shifts roll over midnight).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShiftTag {
    pub shift: Shift,
    pub shift_date: NaiveDate,
}

/// A move between two temporally adjacent geofence stays of one vehicle.
/// `duration_s` is time spent in the origin geofence, not travel time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub vehicle: String,
    pub origin: String,
    pub destination: String,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub duration_s: f64,
    pub shift: Shift,
    pub shift_date: NaiveDate,
    /// Same-label stays folded into this move by consolidation.
    pub consolidated_stays: u32,
}

impl Transition {
    pub fn is_self_transition(&self) -> bool {
        self.origin == self.destination
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Process {
    Load,
    Dump,
    Return,
    Other,
}

impl Process {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "LOAD",
            Self::Dump => "DUMP",
            Self::Return => "RETURN",
            Self::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedTransition {
    #[serde(flatten)]
    pub transition: Transition,
    pub process: Process,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CycleKind {
    LoadCycle,
    DumpCycle,
}

impl CycleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoadCycle => "LOAD_CYCLE",
            Self::DumpCycle => "DUMP_CYCLE",
        }
    }
}

/// Two adjacent classified transitions that close a round trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cycle {
    pub cycle_id: u64,
    pub vehicle: String,
    pub kind: CycleKind,
    /// Entry time of the opening transition.
    pub start_time: NaiveDateTime,
    /// Exit time of the closing transition.
    pub end_time: NaiveDateTime,
    pub total_duration_s: f64,
    pub opening_origin: String,
    pub closing_destination: String,
}

/// Sentinel endpoint for travel intervals whose surrounding geofence
/// could not be determined from the stream.
pub const UNKNOWN_ENDPOINT: &str = "UNKNOWN";

/// A run of consecutive in-transit pings: time spent between geofences.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TravelInterval {
    pub vehicle: String,
    pub origin: String,
    pub destination: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub duration_s: f64,
    pub shift: Shift,
    pub shift_date: NaiveDate,
}
