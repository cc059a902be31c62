// Configuration for lap assignment
//
// One margin is shared by every command, defaulting to one hour.

use crate::error::{Error, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Default margin around the race window for sentinel buckets
pub const DEFAULT_MARGIN_SECS: i64 = 3600;

/// How events are matched to laps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AssignMode {
    /// Half-open interval binning with before/after race sentinels
    #[default]
    Interval,
    /// Closest lap midpoint, ties to the lower lap number
    #[serde(alias = "nearest-midpoint")]
    NearestMidpoint,
}

/// What to do with events outside `[first start - margin, last end + margin)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutsideMargin {
    /// Put them in the nearest sentinel bucket
    #[default]
    Sentinel,
    /// Fail with a data error
    Reject,
}

/// Lap assignment settings
///
/// # Example
/// ```
/// use lapsync::binning::{AssignMode, BinnerConfig};
///
/// let config = BinnerConfig::default();
/// assert_eq!(config.mode, AssignMode::Interval);
/// assert_eq!(config.margin.num_seconds(), 3600);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinnerConfig {
    pub mode: AssignMode,

    /// Width of the before/after race buckets
    ///
    /// Zero is allowed: every event outside the lap range then falls outside
    /// the margin and `outside_margin` decides.
    pub margin: Duration,

    pub outside_margin: OutsideMargin,
}

impl Default for BinnerConfig {
    fn default() -> Self {
        Self {
            mode: AssignMode::Interval,
            margin: Duration::seconds(DEFAULT_MARGIN_SECS),
            outside_margin: OutsideMargin::Sentinel,
        }
    }
}

impl BinnerConfig {
    pub fn interval() -> Self {
        Self::default()
    }

    pub fn nearest_midpoint() -> Self {
        Self {
            mode: AssignMode::NearestMidpoint,
            ..Self::default()
        }
    }

    /// Set the margin in seconds
    ///
    /// Values beyond the range of `Duration` saturate; `validate` and
    /// `LapBinner::new` reject them.
    pub fn with_margin_secs(mut self, secs: i64) -> Self {
        self.margin = Duration::try_seconds(secs).unwrap_or(if secs < 0 {
            Duration::min_value()
        } else {
            Duration::max_value()
        });
        self
    }

    pub fn with_outside_margin(mut self, policy: OutsideMargin) -> Self {
        self.outside_margin = policy;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.margin < Duration::zero() {
            return Err(Error::config(format!(
                "margin must be non-negative, got {}s",
                self.margin.num_seconds()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BinnerConfig::default();
        assert_eq!(config.mode, AssignMode::Interval);
        assert_eq!(config.margin, Duration::hours(1));
        assert_eq!(config.outside_margin, OutsideMargin::Sentinel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_margin_is_valid() {
        assert!(BinnerConfig::default().with_margin_secs(0).validate().is_ok());
    }

    #[test]
    fn test_negative_margin_rejected() {
        let err = BinnerConfig::default()
            .with_margin_secs(-1)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_out_of_range_margin_saturates() {
        let config = BinnerConfig::default().with_margin_secs(i64::MAX);
        assert_eq!(config.margin, Duration::max_value());
        let config = BinnerConfig::default().with_margin_secs(i64::MIN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mode_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: AssignMode,
        }
        let w: Wrapper = toml::from_str("mode = \"nearest_midpoint\"").unwrap();
        assert_eq!(w.mode, AssignMode::NearestMidpoint);
        let w: Wrapper = toml::from_str("mode = \"nearest-midpoint\"").unwrap();
        assert_eq!(w.mode, AssignMode::NearestMidpoint);
    }
}
