// Lap intervals and the validated lap table
//
// Every lap is a half-open window [start, end) on the normalized clock.
// The table keeps laps strictly ordered; gaps between laps are allowed
// because averaged timing data rarely lines up to the millisecond.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, FixedOffset};
use serde::Serialize;

/// One lap of the reference timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LapInterval {
    pub lap_number: u32,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
}

impl LapInterval {
    pub fn new(
        lap_number: u32,
        start_time: DateTime<FixedOffset>,
        end_time: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            lap_number,
            start_time,
            end_time,
        }
    }

    /// Midpoint of the lap, `start + (end - start) / 2`
    pub fn midpoint(&self) -> DateTime<FixedOffset> {
        self.start_time + (self.end_time - self.start_time) / 2
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn contains(&self, ts: &DateTime<FixedOffset>) -> bool {
        self.start_time <= *ts && *ts < self.end_time
    }
}

/// Non-empty, ordered, non-overlapping sequence of laps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LapTable {
    laps: Vec<LapInterval>,
}

impl LapTable {
    /// Validate and wrap a lap sequence
    ///
    /// Fails with a configuration error when `laps` is empty and with a data
    /// error when a lap is empty or inverted, or when laps are out of order or
    /// overlap.
    pub fn new(laps: Vec<LapInterval>) -> Result<Self> {
        if laps.is_empty() {
            return Err(Error::config("Lap table is empty"));
        }

        for lap in &laps {
            if lap.start_time >= lap.end_time {
                return Err(Error::data(format!(
                    "Lap {} ends before it starts ({} >= {})",
                    lap.lap_number, lap.start_time, lap.end_time
                )));
            }
        }

        for pair in laps.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.lap_number <= prev.lap_number {
                return Err(Error::data(format!(
                    "Lap numbers must increase: lap {} follows lap {}",
                    next.lap_number, prev.lap_number
                )));
            }
            if next.start_time < prev.end_time {
                return Err(Error::data(format!(
                    "Lap {} starts at {} before lap {} ends at {}",
                    next.lap_number, next.start_time, prev.lap_number, prev.end_time
                )));
            }
        }

        Ok(Self { laps })
    }

    pub fn len(&self) -> usize {
        self.laps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LapInterval> {
        self.laps.iter()
    }

    pub fn as_slice(&self) -> &[LapInterval] {
        &self.laps
    }

    pub fn first(&self) -> &LapInterval {
        &self.laps[0]
    }

    pub fn last(&self) -> &LapInterval {
        &self.laps[self.laps.len() - 1]
    }

    /// Look up a lap by its number
    pub fn get(&self, lap_number: u32) -> Option<&LapInterval> {
        self.laps
            .binary_search_by_key(&lap_number, |lap| lap.lap_number)
            .ok()
            .map(|idx| &self.laps[idx])
    }

    /// Move every boundary by a fixed offset
    ///
    /// Used to correct for broadcast delay between the timing feed and the
    /// community clock. Ordering is preserved, so the result stays valid.
    /// Fails if a boundary leaves the representable time range.
    pub fn shifted(&self, by: Duration) -> Result<Self> {
        let laps = self
            .laps
            .iter()
            .map(|lap| {
                let start = lap.start_time.checked_add_signed(by);
                let end = lap.end_time.checked_add_signed(by);
                match (start, end) {
                    (Some(start), Some(end)) => Ok(LapInterval::new(lap.lap_number, start, end)),
                    _ => Err(Error::config(format!(
                        "shifting lap {} by {}s leaves the representable time range",
                        lap.lap_number,
                        by.num_seconds()
                    ))),
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { laps })
    }
}

impl<'a> IntoIterator for &'a LapTable {
    type Item = &'a LapInterval;
    type IntoIter = std::slice::Iter<'a, LapInterval>;

    fn into_iter(self) -> Self::IntoIter {
        self.laps.iter()
    }
}
