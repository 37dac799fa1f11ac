// src/analysis/travel.rs
//
// Travel extraction: runs of consecutive in-transit pings become travel
// intervals. Endpoints come from the surrounding stream — the last real
// label before the run and the first after it. A run at either edge of the
// stream gets the UNKNOWN sentinel for the missing side.

use super::shift::ShiftSchedule;
use crate::types::{GpsEvent, TravelInterval, UNKNOWN_ENDPOINT};
use tracing::debug;

/// Extracts travel intervals from one vehicle's sorted event stream.
///
/// A run is kept only when it has at least two pings and spans at least
/// `min_travel_seconds` (a single ping has no measurable duration).
pub fn extract_travel_intervals(
    events: &[GpsEvent],
    schedule: &ShiftSchedule,
    min_travel_seconds: f64,
) -> Vec<TravelInterval> {
    let mut intervals = Vec::new();
    let mut run_start: Option<usize> = None;
    let mut dropped = 0u64;

    for (i, event) in events.iter().enumerate() {
        if event.in_transit() {
            run_start.get_or_insert(i);
            continue;
        }
        if let Some(start) = run_start.take() {
            push_run(
                events,
                start,
                i,
                schedule,
                min_travel_seconds,
                &mut intervals,
                &mut dropped,
            );
        }
    }
    if let Some(start) = run_start {
        push_run(
            events,
            start,
            events.len(),
            schedule,
            min_travel_seconds,
            &mut intervals,
            &mut dropped,
        );
    }

    if dropped > 0 {
        debug!(
            "{}: dropped {} sub-threshold travel run(s)",
            events[0].vehicle, dropped
        );
    }
    intervals
}

fn push_run(
    events: &[GpsEvent],
    start: usize,
    end: usize,
    schedule: &ShiftSchedule,
    min_travel_seconds: f64,
    intervals: &mut Vec<TravelInterval>,
    dropped: &mut u64,
) {
    let run = &events[start..end];
    if run.len() < 2 {
        *dropped += 1;
        return;
    }

    let start_time = run[0].timestamp;
    let end_time = run[run.len() - 1].timestamp;
    let duration_s = (end_time - start_time).num_milliseconds() as f64 / 1000.0;
    if duration_s < min_travel_seconds {
        *dropped += 1;
        return;
    }

    let origin = if start > 0 {
        events[start - 1].geofence.clone()
    } else {
        UNKNOWN_ENDPOINT.to_string()
    };
    let destination = if end < events.len() {
        events[end].geofence.clone()
    } else {
        UNKNOWN_ENDPOINT.to_string()
    };

    let tag = schedule.tag(start_time);
    intervals.push(TravelInterval {
        vehicle: run[0].vehicle.clone(),
        origin,
        destination,
        start_time,
        end_time,
        duration_s,
        shift: tag.shift,
        shift_date: tag.shift_date,
    });
}

/// (unknown origins, unknown destinations) across a set of intervals.
/// Surfaced in the run's quality report.
pub fn count_unknown_endpoints(intervals: &[TravelInterval]) -> (usize, usize) {
    let origins = intervals
        .iter()
        .filter(|t| t.origin == UNKNOWN_ENDPOINT)
        .count();
    let destinations = intervals
        .iter()
        .filter(|t| t.destination == UNKNOWN_ENDPOINT)
        .count();
    (origins, destinations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Shift, ShiftConfig};
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(min: u32, sec: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(8, min, sec)
            .unwrap()
    }

    fn event(min: u32, sec: u32, geofence: &str) -> GpsEvent {
        GpsEvent {
            vehicle: "Truck-01".to_string(),
            timestamp: ts(min, sec),
            geofence: geofence.to_string(),
            latitude: None,
            longitude: None,
            speed_kmh: None,
        }
    }

    fn schedule() -> ShiftSchedule {
        ShiftSchedule::from_config(&ShiftConfig::default()).unwrap()
    }

    #[test]
    fn test_interval_between_two_geofences() {
        let events = vec![
            event(0, 0, "Stock 1"),
            event(2, 0, ""),
            event(4, 0, ""),
            event(6, 0, "Módulo 1"),
        ];
        let intervals = extract_travel_intervals(&events, &schedule(), 30.0);

        assert_eq!(intervals.len(), 1);
        let t = &intervals[0];
        assert_eq!(t.origin, "Stock 1");
        assert_eq!(t.destination, "Módulo 1");
        assert_eq!(t.start_time, ts(2, 0));
        assert_eq!(t.end_time, ts(4, 0));
        assert_eq!(t.duration_s, 120.0);
        assert_eq!(t.shift, Shift::Day);
    }

    #[test]
    fn test_edge_runs_get_unknown_endpoints() {
        let events = vec![
            event(0, 0, ""),
            event(2, 0, ""),
            event(4, 0, "Stock 1"),
            event(6, 0, ""),
            event(8, 0, ""),
        ];
        let intervals = extract_travel_intervals(&events, &schedule(), 30.0);

        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].origin, UNKNOWN_ENDPOINT);
        assert_eq!(intervals[0].destination, "Stock 1");
        assert_eq!(intervals[1].origin, "Stock 1");
        assert_eq!(intervals[1].destination, UNKNOWN_ENDPOINT);
        assert_eq!(count_unknown_endpoints(&intervals), (1, 1));
    }

    #[test]
    fn test_single_ping_run_is_dropped() {
        let events = vec![
            event(0, 0, "Stock 1"),
            event(2, 0, ""),
            event(4, 0, "Módulo 1"),
        ];
        assert!(extract_travel_intervals(&events, &schedule(), 30.0).is_empty());
    }

    #[test]
    fn test_minimum_duration_is_inclusive() {
        let make = |gap_s: u32| {
            vec![
                event(0, 0, "Stock 1"),
                event(1, 0, ""),
                event(1, gap_s, ""),
                event(5, 0, "Módulo 1"),
            ]
        };
        assert_eq!(
            extract_travel_intervals(&make(30), &schedule(), 30.0).len(),
            1
        );
        assert!(extract_travel_intervals(&make(29), &schedule(), 30.0).is_empty());
    }

    #[test]
    fn test_no_transit_pings_no_intervals() {
        let events = vec![event(0, 0, "Stock 1"), event(5, 0, "Módulo 1")];
        assert!(extract_travel_intervals(&events, &schedule(), 30.0).is_empty());
        assert!(extract_travel_intervals(&[], &schedule(), 30.0).is_empty());
    }
}
