//! JSON output format for bucket counts and emotion proportions
//!
//! `--format json` wraps the records in a versioned envelope with a small
//! summary, pretty-printed.

use crate::binning::BucketCount;
use crate::emotion::{Emotion, GroupProportions, LapProportions, Proportions};
use serde::{Deserialize, Serialize};

/// Emotion shares by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonEmotionShares {
    pub anger: f64,
    pub disgust: f64,
    pub fear: f64,
    pub happiness: f64,
    pub sadness: f64,
    pub surprise: f64,
    pub neutral: f64,
}

impl From<&Proportions> for JsonEmotionShares {
    fn from(p: &Proportions) -> Self {
        Self {
            anger: p.get(Emotion::Anger),
            disgust: p.get(Emotion::Disgust),
            fear: p.get(Emotion::Fear),
            happiness: p.get(Emotion::Happiness),
            sadness: p.get(Emotion::Sadness),
            surprise: p.get(Emotion::Surprise),
            neutral: p.get(Emotion::Neutral),
        }
    }
}

/// One emotion group (event group or race lap)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonEmotionGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub race: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lap: Option<String>,
    pub samples: usize,
    pub proportions: JsonEmotionShares,
}

impl From<&GroupProportions> for JsonEmotionGroup {
    fn from(g: &GroupProportions) -> Self {
        Self {
            group: Some(g.group.clone()),
            race: None,
            lap: None,
            samples: g.proportions.samples,
            proportions: (&g.proportions).into(),
        }
    }
}

impl From<&LapProportions> for JsonEmotionGroup {
    fn from(l: &LapProportions) -> Self {
        Self {
            group: None,
            race: Some(l.race.clone()),
            lap: Some(l.lap.clone()),
            samples: l.proportions.samples,
            proportions: (&l.proportions).into(),
        }
    }
}

/// Events counted in one bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonBucketCount {
    /// `before_race`, a lap number, or `after_race`
    pub bucket: String,
    pub count: usize,
}

impl From<&BucketCount> for JsonBucketCount {
    fn from(c: &BucketCount) -> Self {
        Self {
            bucket: c.bucket.to_string(),
            count: c.count,
        }
    }
}

/// Summary over the records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSummary {
    pub total_records: usize,
    /// Events or comments the records were computed from
    pub total_samples: usize,
}

/// Complete JSON output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonOutput<T> {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    /// Which command produced the records
    pub kind: String,
    pub records: Vec<T>,
    pub summary: JsonSummary,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "lapsync-json-v1".to_string(),
            kind: kind.into(),
            records: Vec::new(),
            summary: JsonSummary {
                total_records: 0,
                total_samples: 0,
            },
        }
    }

    pub fn add_record(&mut self, record: T, samples: usize) {
        self.records.push(record);
        self.summary.total_records += 1;
        self.summary.total_samples += samples;
    }

    /// Serialize to a pretty-printed JSON string
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Counts per bucket as JSON
pub fn counts_json(counts: &[BucketCount]) -> JsonOutput<JsonBucketCount> {
    let mut output = JsonOutput::new("counts");
    for c in counts {
        output.add_record(c.into(), c.count);
    }
    output
}

/// Event-group proportions as JSON
pub fn event_groups_json(groups: &[GroupProportions]) -> JsonOutput<JsonEmotionGroup> {
    let mut output = JsonOutput::new("emotion_by_event");
    for g in groups {
        output.add_record(g.into(), g.proportions.samples);
    }
    output
}

/// Per-lap proportions as JSON
pub fn lap_groups_json(laps: &[LapProportions]) -> JsonOutput<JsonEmotionGroup> {
    let mut output = JsonOutput::new("emotion_by_lap");
    for l in laps {
        output.add_record(l.into(), l.proportions.samples);
    }
    output
}
