// Lap-Interval Binning
//
// Assigns every timestamped event (forum post, chat comment, logged
// incident) to the race lap whose interval contains it, or to one of the
// before_race / after_race sentinels.
//
// Two matching modes:
// - interval: half-open [lap_k.start, lap_{k+1}.start) buckets with sentinel
//   buckets one margin wide on either side of the race
// - nearest_midpoint: the lap whose midpoint is closest, ties to the lower
//   lap number
//
// Assignment is total and deterministic for fixed boundaries. Timestamps
// must already be normalized to one offset (see `crate::timestamp`).

mod assign;
mod bucket;
mod config;
mod counts;

pub use assign::{assign_laps, LapAssignment, LapBinner, TimestampedEvent};
pub use bucket::{LapBucket, AFTER_RACE, BEFORE_RACE};
pub use config::{AssignMode, BinnerConfig, OutsideMargin, DEFAULT_MARGIN_SECS};
pub use counts::{count_by_bucket, BucketCount};
