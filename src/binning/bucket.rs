// Lap buckets: a lap number or one of the two race-window sentinels

use serde::{Serialize, Serializer};
use std::fmt;

/// Label of the bucket before the first lap
pub const BEFORE_RACE: &str = "before_race";

/// Label of the bucket after the last lap
pub const AFTER_RACE: &str = "after_race";

/// Where an event landed
///
/// Variant order gives the boundary order: before, laps ascending, after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LapBucket {
    BeforeRace,
    Lap(u32),
    AfterRace,
}

impl LapBucket {
    pub fn lap_number(&self) -> Option<u32> {
        match self {
            LapBucket::Lap(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        !matches!(self, LapBucket::Lap(_))
    }

    /// Parse a label written by [`fmt::Display`]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            BEFORE_RACE => Some(LapBucket::BeforeRace),
            AFTER_RACE => Some(LapBucket::AfterRace),
            other => other.parse().ok().map(LapBucket::Lap),
        }
    }
}

impl fmt::Display for LapBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LapBucket::BeforeRace => f.write_str(BEFORE_RACE),
            LapBucket::Lap(n) => write!(f, "{}", n),
            LapBucket::AfterRace => f.write_str(AFTER_RACE),
        }
    }
}

impl Serialize for LapBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
