//! Normalized lap labels for joining sources
//!
//! Sources spell the same lap differently: `1`, `1.0`, `Lap 1`, `lap1`;
//! the end of the race appears as `Finish`, `After Lap` or `after_race`.
//! Every spelling maps to one [`LapKey`].

use crate::binning::LapBucket;
use std::fmt;

/// Canonical lap label
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LapKey {
    BeforeRace,
    Lap(u32),
    AfterRace,
    /// Anything unrecognized, kept verbatim (trimmed)
    Other(String),
}

impl LapKey {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let s = trimmed.to_lowercase();

        match s.as_str() {
            "finish" | "after lap" | "after_race" => return LapKey::AfterRace,
            "before lap" | "before_race" => return LapKey::BeforeRace,
            _ => {}
        }

        let digits = s.replace("lap", "");
        match digits.trim().parse::<f64>() {
            Ok(n) if n.is_finite() && n >= 0.0 && n <= f64::from(u32::MAX) => {
                LapKey::Lap(n.trunc() as u32)
            }
            _ => LapKey::Other(trimmed.to_string()),
        }
    }

    pub fn lap_number(&self) -> Option<u32> {
        match self {
            LapKey::Lap(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<LapBucket> for LapKey {
    fn from(bucket: LapBucket) -> Self {
        match bucket {
            LapBucket::BeforeRace => LapKey::BeforeRace,
            LapBucket::Lap(n) => LapKey::Lap(n),
            LapBucket::AfterRace => LapKey::AfterRace,
        }
    }
}

impl fmt::Display for LapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LapKey::BeforeRace => f.write_str("Before Lap"),
            LapKey::Lap(n) => write!(f, "Lap {}", n),
            LapKey::AfterRace => f.write_str("After Lap"),
            LapKey::Other(s) => f.write_str(s),
        }
    }
}
