//! TOML configuration
//!
//! Every input file is addressed by explicit column names. The defaults are
//! the column names of the research exports, so running without a config
//! file works on those files directly.
//!
//! ```toml
//! utc_offset = "+09:00"
//! margin_secs = 3600
//! mode = "interval"
//!
//! [laps]
//! lap_number = "LapNumber"
//! start = "Avg_LapStartTime_KST"
//! end = "Avg_LapFinishTime_KST"
//!
//! [incidents]
//! flags = ["ev_unexp", "ev_resp", "ev_out"]
//! ```

use crate::binning::{AssignMode, BinnerConfig, OutsideMargin, DEFAULT_MARGIN_SECS};
use crate::emotion::DEFAULT_THRESHOLD;
use crate::error::{Error, Result};
use crate::timestamp::parse_utc_offset;
use crate::toxicity::DEFAULT_WINDOW_SECS;
use chrono::{Duration, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const MAX_WINDOW_SECS: i64 = 86_400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Offset every timestamp is normalized to
    pub utc_offset: String,
    pub margin_secs: i64,
    pub outside_margin: OutsideMargin,
    pub mode: AssignMode,
    pub laps: LapSchema,
    pub telemetry: TelemetrySchema,
    pub events: EventSchema,
    pub comments: CommentSchema,
    pub incidents: IncidentSchema,
    pub lexicon: LexiconSchema,
    pub toxicity: ToxicitySchema,
    pub emotion: EmotionSchema,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            utc_offset: "+09:00".to_string(),
            margin_secs: DEFAULT_MARGIN_SECS,
            outside_margin: OutsideMargin::Sentinel,
            mode: AssignMode::Interval,
            laps: LapSchema::default(),
            telemetry: TelemetrySchema::default(),
            events: EventSchema::default(),
            comments: CommentSchema::default(),
            incidents: IncidentSchema::default(),
            lexicon: LexiconSchema::default(),
            toxicity: ToxicitySchema::default(),
            emotion: EmotionSchema::default(),
        }
    }
}

/// Lap table columns (one row per lap)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LapSchema {
    pub lap_number: String,
    pub start: String,
    pub end: String,
}

impl Default for LapSchema {
    fn default() -> Self {
        Self {
            lap_number: "LapNumber".to_string(),
            start: "Avg_LapStartTime_KST".to_string(),
            end: "Avg_LapFinishTime_KST".to_string(),
        }
    }
}

/// Per-driver timing columns
///
/// Either `end` or `duration_secs` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySchema {
    pub driver: String,
    pub lap_number: String,
    pub start: String,
    pub end: Option<String>,
    pub duration_secs: Option<String>,
}

impl Default for TelemetrySchema {
    fn default() -> Self {
        Self {
            driver: "Driver".to_string(),
            lap_number: "LapNumber".to_string(),
            start: "LapStartTime_KST".to_string(),
            end: Some("LapFinishTime_KST".to_string()),
            duration_secs: None,
        }
    }
}

/// Timestamped posts to bin or score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSchema {
    /// Row number is used when unset
    pub id: Option<String>,
    pub timestamp: String,
    /// Single text column; takes precedence over title/body
    pub text: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
}

impl Default for EventSchema {
    fn default() -> Self {
        Self {
            id: None,
            timestamp: "post_timestamp".to_string(),
            text: None,
            title: Some("post_title".to_string()),
            body: Some("post_content".to_string()),
        }
    }
}

/// Live comments already labeled with race and lap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentSchema {
    pub race: String,
    pub lap: String,
    pub timestamp: String,
    pub text: String,
}

impl Default for CommentSchema {
    fn default() -> Self {
        Self {
            race: "race".to_string(),
            lap: "lap".to_string(),
            timestamp: "timestamp".to_string(),
            text: "Text".to_string(),
        }
    }
}

/// Logged race incidents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentSchema {
    pub race: String,
    pub lap: String,
    pub flags: Vec<String>,
}

impl Default for IncidentSchema {
    fn default() -> Self {
        Self {
            race: "race".to_string(),
            lap: "lap".to_string(),
            flags: vec![
                "ev_unexp".to_string(),
                "ev_resp".to_string(),
                "ev_out".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexiconSchema {
    pub term: String,
    pub weight: Option<String>,
}

impl Default for LexiconSchema {
    fn default() -> Self {
        Self {
            term: "word".to_string(),
            weight: Some("weight".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToxicitySchema {
    pub window_secs: i64,
}

impl Default for ToxicitySchema {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_WINDOW_SECS,
        }
    }
}

/// Classifier predictions joined with incident flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionSchema {
    pub label: String,
    pub score: Option<String>,
    pub threshold: f64,
    pub race: String,
    pub lap: String,
    pub event_marker: String,
}

impl Default for EmotionSchema {
    fn default() -> Self {
        Self {
            label: "pred_label".to_string(),
            score: Some("pred_score".to_string()),
            threshold: DEFAULT_THRESHOLD,
            race: "race".to_string(),
            lap: "lap".to_string(),
            event_marker: "event_marker".to_string(),
        }
    }
}

impl Config {
    /// Load and validate a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Configuration(msg) => Error::config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Parse and validate a configuration string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.offset()?;
        self.binner_config()?.validate()?;
        self.toxicity_window()?;
        if !(0.0..=1.0).contains(&self.emotion.threshold) {
            return Err(Error::config(format!(
                "emotion.threshold must be between 0 and 1, got {}",
                self.emotion.threshold
            )));
        }
        if self.telemetry.end.is_none() && self.telemetry.duration_secs.is_none() {
            return Err(Error::config(
                "telemetry needs either an end or a duration_secs column",
            ));
        }

        let names = [
            &self.laps.lap_number,
            &self.laps.start,
            &self.laps.end,
            &self.telemetry.driver,
            &self.telemetry.lap_number,
            &self.telemetry.start,
            &self.events.timestamp,
            &self.comments.race,
            &self.comments.lap,
            &self.comments.timestamp,
            &self.comments.text,
            &self.incidents.race,
            &self.incidents.lap,
            &self.lexicon.term,
            &self.emotion.label,
            &self.emotion.race,
            &self.emotion.lap,
            &self.emotion.event_marker,
        ];
        if names.iter().any(|n| n.trim().is_empty())
            || self.incidents.flags.iter().any(|f| f.trim().is_empty())
        {
            return Err(Error::config("column names must not be blank"));
        }

        Ok(())
    }

    pub fn offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.utc_offset)
    }

    pub fn binner_config(&self) -> Result<BinnerConfig> {
        let margin = Duration::try_seconds(self.margin_secs).ok_or_else(|| {
            Error::config(format!("margin_secs out of range: {}", self.margin_secs))
        })?;
        Ok(BinnerConfig {
            mode: self.mode,
            margin,
            outside_margin: self.outside_margin,
        })
    }

    /// Width of the toxicity windows; positive and at most one day
    pub fn toxicity_window(&self) -> Result<Duration> {
        let secs = self.toxicity.window_secs;
        if secs <= 0 || secs > MAX_WINDOW_SECS {
            return Err(Error::config(format!(
                "toxicity.window_secs must be between 1 and {}, got {}",
                MAX_WINDOW_SECS, secs
            )));
        }
        Ok(Duration::seconds(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.offset().unwrap().local_minus_utc(), 9 * 3600);
        assert_eq!(config.binner_config().unwrap(), BinnerConfig::default());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let toml = r#"
            utc_offset = "Z"
            margin_secs = 0
            mode = "nearest_midpoint"
            outside_margin = "reject"

            [laps]
            start = "date_start"

            [incidents]
            flags = ["ev_unexp"]
        "#;
        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.offset().unwrap().local_minus_utc(), 0);
        assert_eq!(config.laps.start, "date_start");
        assert_eq!(config.laps.lap_number, "LapNumber");
        assert_eq!(config.incidents.flags, vec!["ev_unexp"]);

        let binner = config.binner_config().unwrap();
        assert_eq!(binner.mode, AssignMode::NearestMidpoint);
        assert_eq!(binner.margin, Duration::zero());
        assert_eq!(binner.outside_margin, OutsideMargin::Reject);
    }

    #[test]
    fn test_openf1_telemetry_columns() {
        let toml = r#"
            [telemetry]
            driver = "driver_number"
            lap_number = "lap_number"
            start = "date_start"
            duration_secs = "lap_duration"
        "#;
        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.telemetry.duration_secs.as_deref(), Some("lap_duration"));
        // end keeps its default and takes precedence when present in the file
        assert!(config.telemetry.end.is_some());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_toml_str("margin_secs = -1").is_err());
        assert!(Config::from_toml_str("utc_offset = \"KST\"").is_err());
        assert!(Config::from_toml_str("[toxicity]\nwindow_secs = 0").is_err());
        assert!(Config::from_toml_str("[emotion]\nthreshold = 1.5").is_err());
        assert!(Config::from_toml_str("[laps]\nstart = \" \"").is_err());
        assert!(Config::from_toml_str("mode = \"closest\"").is_err());
    }

    #[test]
    fn test_out_of_range_durations_rejected() {
        let err = Config::from_toml_str("margin_secs = 9223372036854775807").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        let err = Config::from_toml_str("[toxicity]\nwindow_secs = 9223372036854775807").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let config = Config::from_toml_str("[toxicity]\nwindow_secs = 86400").unwrap();
        assert_eq!(config.toxicity_window().unwrap(), Duration::days(1));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lapsync.toml");
        fs::write(&path, "margin_secs = 600\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.margin_secs, 600);

        assert!(Config::from_file(dir.path().join("missing.toml")).is_err());
    }
}
