// Lap tables derived from per-driver timing rows
//
// Timing exports give one row per (driver, lap). A reference lap table is
// either a single driver's laps or the per-lap mean across every driver
// that completed the lap.

use super::interval::{LapInterval, LapTable};
use crate::error::{Error, Result};
use chrono::{DateTime, Duration, FixedOffset, TimeZone};
use std::collections::BTreeMap;

/// One timing row: a driver's start and end of one lap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverLap {
    pub driver: String,
    pub lap_number: u32,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl DriverLap {
    /// Build a row from a start time and a lap duration in seconds
    ///
    /// Telemetry APIs report `date_start` plus `lap_duration` rather than an
    /// end time.
    pub fn from_duration(
        driver: impl Into<String>,
        lap_number: u32,
        start: DateTime<FixedOffset>,
        duration_secs: f64,
    ) -> Result<Self> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(Error::data(format!(
                "Lap {} has invalid duration {}",
                lap_number, duration_secs
            )));
        }
        let millis = (duration_secs * 1000.0).round() as i64;
        Ok(Self {
            driver: driver.into(),
            lap_number,
            start,
            end: start + Duration::milliseconds(millis),
        })
    }
}

/// Per-lap mean of the drivers' start and end times
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AveragedLap {
    pub lap_number: u32,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    /// Number of drivers contributing to this lap
    pub drivers: usize,
}

impl AveragedLap {
    pub fn interval(&self) -> LapInterval {
        LapInterval::new(self.lap_number, self.start, self.end)
    }
}

/// Keep only the rows of one reference driver
pub fn filter_driver(rows: &[DriverLap], driver: &str) -> Vec<DriverLap> {
    rows.iter()
        .filter(|row| row.driver.trim() == driver.trim())
        .cloned()
        .collect()
}

/// Average start and end instants per lap number
///
/// Output is ordered by lap number. Each lap's timestamps carry the offset
/// of the first row seen for it.
pub fn average_laps(rows: &[DriverLap]) -> Vec<AveragedLap> {
    struct Acc {
        offset: FixedOffset,
        start_sum: i128,
        end_sum: i128,
        count: i128,
    }

    let mut by_lap: BTreeMap<u32, Acc> = BTreeMap::new();
    for row in rows {
        let acc = by_lap.entry(row.lap_number).or_insert_with(|| Acc {
            offset: *row.start.offset(),
            start_sum: 0,
            end_sum: 0,
            count: 0,
        });
        acc.start_sum += i128::from(row.start.timestamp_millis());
        acc.end_sum += i128::from(row.end.timestamp_millis());
        acc.count += 1;
    }

    by_lap
        .into_iter()
        .filter_map(|(lap_number, acc)| {
            let start = mean_instant(acc.start_sum, acc.count, acc.offset)?;
            let end = mean_instant(acc.end_sum, acc.count, acc.offset)?;
            Some(AveragedLap {
                lap_number,
                start,
                end,
                drivers: acc.count as usize,
            })
        })
        .collect()
}

fn mean_instant(sum: i128, count: i128, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    if count == 0 {
        return None;
    }
    let millis = i64::try_from(sum / count).ok()?;
    offset.timestamp_millis_opt(millis).single()
}

/// Validate averaged laps as a lap table
pub fn to_table(laps: &[AveragedLap]) -> Result<LapTable> {
    LapTable::new(laps.iter().map(AveragedLap::interval).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .timestamp_opt(1_733_659_200 + secs, 0)
            .unwrap()
    }

    fn row(driver: &str, lap: u32, start: i64, end: i64) -> DriverLap {
        DriverLap {
            driver: driver.to_string(),
            lap_number: lap,
            start: at(start),
            end: at(end),
        }
    }

    #[test]
    fn test_from_duration() {
        let lap = DriverLap::from_duration("1", 3, at(0), 92.5).unwrap();
        assert_eq!(lap.end - lap.start, Duration::milliseconds(92_500));
    }

    #[test]
    fn test_from_duration_rejects_nonpositive() {
        assert!(DriverLap::from_duration("1", 3, at(0), 0.0).is_err());
        assert!(DriverLap::from_duration("1", 3, at(0), f64::NAN).is_err());
    }

    #[test]
    fn test_average_across_drivers() {
        let rows = vec![
            row("VER", 1, 0, 90),
            row("HAM", 1, 2, 94),
            row("VER", 2, 90, 180),
            row("HAM", 2, 94, 186),
        ];
        let avg = average_laps(&rows);
        assert_eq!(avg.len(), 2);
        assert_eq!(avg[0].lap_number, 1);
        assert_eq!(avg[0].start, at(1));
        assert_eq!(avg[0].end, at(92));
        assert_eq!(avg[0].drivers, 2);
        assert_eq!(avg[1].start, at(92));
        assert_eq!(avg[1].end, at(183));
    }

    #[test]
    fn test_average_orders_by_lap_number() {
        let rows = vec![row("VER", 2, 90, 180), row("VER", 1, 0, 90)];
        let avg = average_laps(&rows);
        assert_eq!(avg[0].lap_number, 1);
        assert_eq!(avg[1].lap_number, 2);
        assert!(to_table(&avg).is_ok());
    }

    #[test]
    fn test_retired_driver_reduces_count() {
        let rows = vec![row("VER", 1, 0, 90), row("SAR", 1, 0, 96), row("VER", 2, 90, 180)];
        let avg = average_laps(&rows);
        assert_eq!(avg[0].drivers, 2);
        assert_eq!(avg[1].drivers, 1);
    }

    #[test]
    fn test_filter_driver() {
        let rows = vec![row("1", 1, 0, 90), row("55", 1, 1, 91)];
        let only = filter_driver(&rows, "55");
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].driver, "55");
    }
}
