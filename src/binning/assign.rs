// Lap-interval binning of timestamped events
//
// Interval mode boundaries, for N laps:
//
//   [lap_1.start - margin, lap_1.start, lap_2.start, ..., lap_N.start, lap_N.end, lap_N.end + margin]
//
// with labels before_race, 1..N, after_race. Buckets are half-open
// [B[i], B[i+1]): an event exactly on a lap start belongs to that lap.
// A gap between lap_k.end and lap_{k+1}.start stays in lap k.

use super::bucket::LapBucket;
use super::config::{AssignMode, BinnerConfig, OutsideMargin};
use crate::error::{Error, Result};
use crate::laps::{LapInterval, LapTable};
use chrono::{DateTime, Duration, FixedOffset};
use serde::Serialize;

/// A post, comment, or logged incident with a normalized timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampedEvent<P> {
    pub event_id: String,
    pub timestamp: DateTime<FixedOffset>,
    pub payload: P,
}

impl<P> TimestampedEvent<P> {
    pub fn new(event_id: impl Into<String>, timestamp: DateTime<FixedOffset>, payload: P) -> Self {
        Self {
            event_id: event_id.into(),
            timestamp,
            payload,
        }
    }
}

/// The bucket an event was assigned to
///
/// `distance` is the absolute distance to the chosen lap's midpoint in
/// nearest-midpoint mode and `None` in interval mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LapAssignment {
    pub bucket: LapBucket,
    pub distance: Option<Duration>,
}

impl Serialize for LapAssignment {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("LapAssignment", 2)?;
        s.serialize_field("bucket", &self.bucket)?;
        s.serialize_field(
            "distance_secs",
            &self.distance.map(crate::timestamp::duration_secs),
        )?;
        s.end()
    }
}

/// Precomputed boundaries and midpoints for one lap table
#[derive(Debug, Clone)]
pub struct LapBinner {
    table: LapTable,
    config: BinnerConfig,
    midpoints: Vec<DateTime<FixedOffset>>,
    min_border: DateTime<FixedOffset>,
    max_border: DateTime<FixedOffset>,
}

impl LapBinner {
    pub fn new(table: LapTable, config: BinnerConfig) -> Result<Self> {
        config.validate()?;
        let midpoints = table.iter().map(LapInterval::midpoint).collect();
        let out_of_range = || {
            Error::config(format!(
                "margin of {}s reaches past the representable time range",
                config.margin.num_seconds()
            ))
        };
        let min_border = table
            .first()
            .start_time
            .checked_sub_signed(config.margin)
            .ok_or_else(out_of_range)?;
        let max_border = table
            .last()
            .end_time
            .checked_add_signed(config.margin)
            .ok_or_else(out_of_range)?;
        Ok(Self {
            table,
            config,
            midpoints,
            min_border,
            max_border,
        })
    }

    pub fn table(&self) -> &LapTable {
        &self.table
    }

    pub fn config(&self) -> &BinnerConfig {
        &self.config
    }

    /// Outer boundaries `(lap_1.start - margin, lap_N.end + margin)`
    pub fn borders(&self) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
        (self.min_border, self.max_border)
    }

    /// Every bucket in boundary order
    pub fn buckets(&self) -> Vec<LapBucket> {
        let mut buckets = Vec::with_capacity(self.table.len() + 2);
        buckets.push(LapBucket::BeforeRace);
        buckets.extend(self.table.iter().map(|lap| LapBucket::Lap(lap.lap_number)));
        buckets.push(LapBucket::AfterRace);
        buckets
    }

    /// Assign a single timestamp
    pub fn assign(&self, ts: &DateTime<FixedOffset>) -> Result<LapAssignment> {
        match self.config.mode {
            AssignMode::Interval => self.assign_interval(ts),
            AssignMode::NearestMidpoint => Ok(self.assign_nearest_midpoint(ts)),
        }
    }

    fn assign_interval(&self, ts: &DateTime<FixedOffset>) -> Result<LapAssignment> {
        let laps = self.table.as_slice();

        let bucket = if *ts < self.table.first().start_time {
            if *ts < self.min_border {
                self.outside_margin(ts)?;
            }
            LapBucket::BeforeRace
        } else if *ts >= self.table.last().end_time {
            if *ts >= self.max_border {
                self.outside_margin(ts)?;
            }
            LapBucket::AfterRace
        } else {
            // At least lap 1 starts at or before ts here
            let idx = laps.partition_point(|lap| lap.start_time <= *ts) - 1;
            LapBucket::Lap(laps[idx].lap_number)
        };

        Ok(LapAssignment {
            bucket,
            distance: None,
        })
    }

    fn outside_margin(&self, ts: &DateTime<FixedOffset>) -> Result<()> {
        match self.config.outside_margin {
            OutsideMargin::Sentinel => Ok(()),
            OutsideMargin::Reject => Err(Error::data(format!(
                "timestamp {} is outside the race window [{}, {})",
                ts, self.min_border, self.max_border
            ))),
        }
    }

    fn assign_nearest_midpoint(&self, ts: &DateTime<FixedOffset>) -> LapAssignment {
        let laps = self.table.as_slice();
        let mut best = 0;
        let mut best_diff = abs_diff(*ts, self.midpoints[0]);

        // Strict comparison keeps the lowest lap number on ties
        for (idx, mid) in self.midpoints.iter().enumerate().skip(1) {
            let diff = abs_diff(*ts, *mid);
            if diff < best_diff {
                best = idx;
                best_diff = diff;
            }
        }

        LapAssignment {
            bucket: LapBucket::Lap(laps[best].lap_number),
            distance: Some(best_diff),
        }
    }

    /// Assign every event, in input order
    pub fn assign_all<P>(&self, events: &[TimestampedEvent<P>]) -> Result<Vec<LapAssignment>> {
        events
            .iter()
            .map(|event| {
                self.assign(&event.timestamp).map_err(|e| match e {
                    Error::Data(msg) => Error::data(format!("event {}: {}", event.event_id, msg)),
                    other => other,
                })
            })
            .collect()
    }
}

fn abs_diff(a: DateTime<FixedOffset>, b: DateTime<FixedOffset>) -> Duration {
    let d = a - b;
    if d < Duration::zero() {
        -d
    } else {
        d
    }
}

/// Assign every event to a lap bucket
///
/// `laps` must be sorted ascending by start time. Fails with a configuration
/// error when `laps` is empty or the margin is negative, and with a data
/// error when the laps violate the table invariants or, under
/// [`OutsideMargin::Reject`], an event falls outside the margin.
///
/// # Example
/// ```
/// use chrono::{FixedOffset, TimeZone};
/// use lapsync::binning::{assign_laps, BinnerConfig, LapBucket, TimestampedEvent};
/// use lapsync::laps::LapInterval;
///
/// let kst = FixedOffset::east_opt(9 * 3600).unwrap();
/// let t = |s: i64| kst.timestamp_opt(1_709_391_600 + s, 0).unwrap();
/// let laps = vec![LapInterval::new(1, t(0), t(90)), LapInterval::new(2, t(90), t(180))];
/// let events = vec![
///     TimestampedEvent::new("a", t(89), ()),
///     TimestampedEvent::new("b", t(90), ()),
///     TimestampedEvent::new("c", t(300), ()),
/// ];
///
/// let out = assign_laps(&events, &laps, &BinnerConfig::default()).unwrap();
/// assert_eq!(out[0].bucket, LapBucket::Lap(1));
/// assert_eq!(out[1].bucket, LapBucket::Lap(2));
/// assert_eq!(out[2].bucket, LapBucket::AfterRace);
/// ```
pub fn assign_laps<P>(
    events: &[TimestampedEvent<P>],
    laps: &[LapInterval],
    config: &BinnerConfig,
) -> Result<Vec<LapAssignment>> {
    if laps.is_empty() {
        return Err(Error::config("Cannot assign laps: lap list is empty"));
    }
    let table = LapTable::new(laps.to_vec())?;
    LapBinner::new(table, *config)?.assign_all(events)
}
