// src/analysis/dwell.rs
//
// Dwell segmentation: converts one vehicle's time-ordered ping stream into
// clean "occupied geofence G from T1 to T2" intervals. GPS jitter shows up
// as very short same-label runs; anything under the noise threshold is
// discarded silently. In-transit runs (empty label) are segmented the same
// way and retained — the transition builder skips them, the travel and
// zone analyses consume them.

use crate::types::{Dwell, GpsEvent};
use tracing::debug;

/// Single pass over one vehicle's sorted events.
///
/// A dwell closes when the label changes (including to/from the empty
/// in-transit sentinel) or the stream ends; it is kept only when its
/// duration reaches `noise_threshold_s`. The threshold is inclusive: a
/// dwell of exactly the threshold survives.
pub fn segment_dwells(events: &[GpsEvent], noise_threshold_s: f64) -> Vec<Dwell> {
    let mut dwells = Vec::new();
    let Some(first) = events.first() else {
        return dwells;
    };

    let mut current_label = first.geofence.as_str();
    let mut entry_time = first.timestamp;
    let mut discarded = 0u64;

    let mut close = |label: &str,
                     entry: chrono::NaiveDateTime,
                     exit: chrono::NaiveDateTime,
                     dwells: &mut Vec<Dwell>,
                     discarded: &mut u64| {
        let duration_s = (exit - entry).num_milliseconds() as f64 / 1000.0;
        if duration_s >= noise_threshold_s {
            dwells.push(Dwell {
                vehicle: first.vehicle.clone(),
                geofence: label.to_string(),
                entry_time: entry,
                exit_time: exit,
            });
        } else {
            *discarded += 1;
        }
    };

    for event in &events[1..] {
        if event.geofence != current_label {
            close(
                current_label,
                entry_time,
                event.timestamp,
                &mut dwells,
                &mut discarded,
            );
            current_label = event.geofence.as_str();
            entry_time = event.timestamp;
        }
    }

    // Close the final open dwell at the last observed ping.
    let last = events.last().expect("non-empty checked above");
    close(
        current_label,
        entry_time,
        last.timestamp,
        &mut dwells,
        &mut discarded,
    );

    if discarded > 0 {
        debug!(
            "{}: discarded {} sub-threshold dwell(s)",
            first.vehicle, discarded
        );
    }

    dwells
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[test]
    fn test_basic_segmentation() {
        let events = vec![
            event(0, 0, "Stock 1"),
            event(5, 0, "Stock 1"),
            event(10, 0, ""),
            event(12, 0, ""),
            event(15, 0, "Módulo 1"),
            event(20, 0, "Módulo 1"),
        ];
        let dwells = segment_dwells(&events, 60.0);

        assert_eq!(dwells.len(), 3);
        assert_eq!(dwells[0].geofence, "Stock 1");
        assert_eq!(dwells[0].entry_time, ts(0, 0));
        assert_eq!(dwells[0].exit_time, ts(10, 0));
        assert!(dwells[1].is_transit());
        assert_eq!(dwells[2].geofence, "Módulo 1");
        assert_eq!(dwells[2].exit_time, ts(20, 0));
    }

    #[test]
    fn test_noise_threshold_boundary_is_inclusive() {
        // Exactly 60 s in the geofence: kept.
        let events = vec![event(0, 0, "Stock 1"), event(1, 0, ""), event(10, 0, "")];
        let dwells = segment_dwells(&events, 60.0);
        assert_eq!(dwells[0].geofence, "Stock 1");
        assert_eq!(dwells[0].duration_s(), 60.0);

        // 59 s: discarded as jitter.
        let events = vec![event(0, 0, "Stock 1"), event(0, 59, ""), event(10, 0, "")];
        let dwells = segment_dwells(&events, 60.0);
        assert!(dwells.iter().all(|d| d.geofence != "Stock 1"));
    }

    #[test]
    fn test_sub_threshold_blip_between_stays_is_dropped() {
        // Truck flickers into "Módulo 1" for 30 s mid-stay; the blip vanishes
        // but both surrounding stays survive.
        let events = vec![
            event(0, 0, "Stock 1"),
            event(5, 0, "Módulo 1"),
            event(5, 30, "Stock 1"),
            event(10, 0, "Stock 1"),
        ];
        let dwells = segment_dwells(&events, 60.0);
        assert_eq!(dwells.len(), 2);
        assert!(dwells.iter().all(|d| d.geofence == "Stock 1"));
    }

    #[test]
    fn test_dwells_are_ordered_and_non_overlapping() {
        let events = vec![
            event(0, 0, "A zone"),
            event(3, 0, "B zone"),
            event(6, 0, "C zone"),
            event(9, 0, "A zone"),
            event(12, 0, "A zone"),
        ];
        let dwells = segment_dwells(&events, 60.0);
        assert_eq!(dwells.len(), 4);
        for pair in dwells.windows(2) {
            assert!(pair[0].entry_time < pair[1].entry_time);
            assert!(pair[0].exit_time <= pair[1].entry_time);
        }
    }

    #[test]
    fn test_empty_and_single_event_streams() {
        assert!(segment_dwells(&[], 60.0).is_empty());
        // A lone ping spans zero seconds; below any positive threshold.
        assert!(segment_dwells(&[event(0, 0, "Stock 1")], 60.0).is_empty());
    }

    #[test]
    fn test_final_open_dwell_closes_at_stream_end() {
        let events = vec![event(0, 0, ""), event(2, 0, "Stock 1"), event(9, 0, "Stock 1")];
        let dwells = segment_dwells(&events, 60.0);
        let last = dwells.last().unwrap();
        assert_eq!(last.geofence, "Stock 1");
        assert_eq!(last.exit_time, ts(9, 0));
    }
}
