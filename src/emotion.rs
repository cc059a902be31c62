//! Emotion label resolution and proportions
//!
//! Classifier output arrives as `LABEL_<n>`, a bare id (`3`, `3.0`) or
//! nothing at all. Ids map to six emotions; everything else, and every
//! prediction at or below the confidence threshold, is `neutral`.

use crate::lap_key::LapKey;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Default confidence threshold; scores at or below it are neutral
pub const DEFAULT_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Anger,
    Disgust,
    Fear,
    Happiness,
    Sadness,
    Surprise,
    Neutral,
}

/// All emotions in report order
pub const EMOTIONS: [Emotion; 7] = [
    Emotion::Anger,
    Emotion::Disgust,
    Emotion::Fear,
    Emotion::Happiness,
    Emotion::Sadness,
    Emotion::Surprise,
    Emotion::Neutral,
];

impl Emotion {
    pub fn from_id(id: i64) -> Self {
        match id {
            0 => Emotion::Anger,
            1 => Emotion::Disgust,
            2 => Emotion::Fear,
            3 => Emotion::Happiness,
            4 => Emotion::Sadness,
            5 => Emotion::Surprise,
            _ => Emotion::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Anger => "anger",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happiness => "happiness",
            Emotion::Sadness => "sadness",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve one prediction to an emotion
///
/// `score` is the classifier confidence when the input carries one.
pub fn resolve_label(label: &str, score: Option<f64>, threshold: f64) -> Emotion {
    if matches!(score, Some(s) if s <= threshold) {
        return Emotion::Neutral;
    }

    let label = label.trim();
    let id = if label.contains("LABEL_") {
        label.rsplit('_').next().and_then(|n| n.parse::<i64>().ok())
    } else {
        label
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v.trunc() as i64)
    };

    id.map_or(Emotion::Neutral, Emotion::from_id)
}

/// Share of each emotion within one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Proportions {
    pub samples: usize,
    /// Indexed in [`EMOTIONS`] order
    pub shares: [f64; 7],
}

impl Proportions {
    pub fn get(&self, emotion: Emotion) -> f64 {
        self.shares[emotion.index()]
    }
}

/// Proportions of a label set; `None` for an empty set
pub fn proportions(labels: &[Emotion]) -> Option<Proportions> {
    if labels.is_empty() {
        return None;
    }
    let mut counts = [0usize; 7];
    for label in labels {
        counts[label.index()] += 1;
    }
    let total = labels.len() as f64;
    Some(Proportions {
        samples: labels.len(),
        shares: counts.map(|c| c as f64 / total),
    })
}

/// One resolved prediction with the event context it was joined with
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledComment {
    pub race: String,
    pub lap: String,
    pub emotion: Emotion,
    pub event_marker: bool,
    /// Flag values, parallel to the flag names passed to [`by_event`]
    pub flags: Vec<f64>,
}

/// Proportions for one named group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupProportions {
    pub group: String,
    #[serde(flatten)]
    pub proportions: Proportions,
}

/// Label used for comments on laps without a logged incident
pub const BASELINE_GROUP: &str = "No_Event (Baseline)";

/// Baseline plus one group per flag column with value 1
///
/// Groups without any sample are left out.
pub fn by_event(comments: &[LabeledComment], flag_names: &[String]) -> Vec<GroupProportions> {
    let mut groups = Vec::new();

    let baseline: Vec<Emotion> = comments
        .iter()
        .filter(|c| !c.event_marker)
        .map(|c| c.emotion)
        .collect();
    if let Some(p) = proportions(&baseline) {
        groups.push(GroupProportions {
            group: BASELINE_GROUP.to_string(),
            proportions: p,
        });
    }

    for (i, name) in flag_names.iter().enumerate() {
        let subset: Vec<Emotion> = comments
            .iter()
            .filter(|c| c.flags.get(i).copied() == Some(1.0))
            .map(|c| c.emotion)
            .collect();
        match proportions(&subset) {
            Some(p) => groups.push(GroupProportions {
                group: format!("Event: {}", name),
                proportions: p,
            }),
            None => tracing::debug!(flag = %name, "no samples for event group"),
        }
    }

    groups
}

/// Proportions for one (race, lap)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapProportions {
    pub race: String,
    pub lap: String,
    #[serde(flatten)]
    pub proportions: Proportions,
}

/// Proportions per (race, lap), ordered by race then lap number
///
/// Lap labels are normalized first, so `1`, `1.0` and `Lap 1` share a group.
pub fn by_lap(comments: &[LabeledComment]) -> Vec<LapProportions> {
    let mut groups: BTreeMap<(String, LapKey), Vec<Emotion>> = BTreeMap::new();
    for c in comments {
        groups
            .entry((c.race.trim().to_string(), LapKey::parse(&c.lap)))
            .or_default()
            .push(c.emotion);
    }

    groups
        .into_iter()
        .filter_map(|((race, lap), labels)| {
            proportions(&labels).map(|proportions| LapProportions {
                race,
                lap: lap.to_string(),
                proportions,
            })
        })
        .collect()
}
