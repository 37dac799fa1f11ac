// src/analysis/shift.rs
//
// Shift tagging. Pure function of the timestamp: every instant belongs to
// exactly one (shift, shift_date) pair. Night shifts cross midnight, so a
// 03:00 ping belongs to the night shift that started the previous evening.

use crate::types::{Shift, ShiftConfig, ShiftTag};
use anyhow::{bail, Result};
use chrono::{Duration, NaiveDateTime, NaiveTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftSchedule {
    pub day_start: NaiveTime,
    pub night_start: NaiveTime,
}

fn parse_wall_clock(raw: &str) -> Result<NaiveTime> {
    for fmt in ["%H:%M", "%H:%M:%S"] {
        if let Ok(t) = NaiveTime::parse_from_str(raw.trim(), fmt) {
            return Ok(t);
        }
    }
    bail!("invalid shift boundary {raw:?}, expected HH:MM");
}

impl ShiftSchedule {
    pub fn from_config(config: &ShiftConfig) -> Result<Self> {
        let day_start = parse_wall_clock(&config.day_start)?;
        let night_start = parse_wall_clock(&config.night_start)?;
        if day_start >= night_start {
            bail!(
                "day shift start {} must precede night shift start {}",
                day_start,
                night_start
            );
        }
        Ok(Self {
            day_start,
            night_start,
        })
    }

    /// Maps a timestamp to its shift. Boundary instants belong to the shift
    /// starting at that instant: 08:00:00 is Day, 20:00:00 is Night.
    pub fn tag(&self, ts: NaiveDateTime) -> ShiftTag {
        let t = ts.time();
        if t >= self.day_start && t < self.night_start {
            ShiftTag {
                shift: Shift::Day,
                shift_date: ts.date(),
            }
        } else if t < self.day_start {
            // Early morning: still the night shift that started yesterday.
            ShiftTag {
                shift: Shift::Night,
                shift_date: ts.date() - Duration::days(1),
            }
        } else {
            ShiftTag {
                shift: Shift::Night,
                shift_date: ts.date(),
            }
        }
    }

    /// Human-readable shift window, e.g.
    /// "Day shift 15-01-2025 (08:00-19:59)".
    pub fn describe(&self, tag: ShiftTag) -> String {
        let date = tag.shift_date.format("%d-%m-%Y");
        match tag.shift {
            Shift::Day => {
                let end = self.night_start - Duration::minutes(1);
                format!(
                    "Day shift {date} ({}-{})",
                    self.day_start.format("%H:%M"),
                    end.format("%H:%M")
                )
            }
            Shift::Night => {
                let next = (tag.shift_date + Duration::days(1)).format("%d-%m-%Y");
                let end = self.day_start - Duration::minutes(1);
                format!(
                    "Night shift {date} ({} of {date} - {} of {next})",
                    self.night_start.format("%H:%M"),
                    end.format("%H:%M")
                )
            }
        }
    }
}
