//! Per-(race, lap) comment activity
//!
//! Three signals per lap: volume (comment count), urgency (mean seconds
//! between consecutive comments) and depth (mean comment length).

use crate::lap_key::LapKey;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::collections::BTreeMap;

/// One comment with its race, lap label, and normalized timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub race: String,
    pub lap: LapKey,
    pub timestamp: DateTime<FixedOffset>,
    pub text: String,
}

/// Activity statistics for one lap of one race
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapActivity {
    pub race: String,
    pub lap: u32,
    /// Comments with non-empty text
    pub comment_count: usize,
    /// Mean gap between consecutive comments; `None` with fewer than two
    pub avg_time_gap: Option<f64>,
    /// Mean length in characters (empty comments count as 0)
    pub avg_text_len: f64,
}

/// Aggregate comments by race and lap
///
/// Comments whose lap label is not a lap number (sentinels, blanks) are
/// left out. Output is ordered by race, then lap.
pub fn lap_activity(comments: &[Comment]) -> Vec<LapActivity> {
    let mut groups: BTreeMap<(String, u32), Vec<&Comment>> = BTreeMap::new();
    for comment in comments {
        if let Some(lap) = comment.lap.lap_number() {
            groups
                .entry((comment.race.trim().to_string(), lap))
                .or_default()
                .push(comment);
        }
    }

    groups
        .into_iter()
        .map(|((race, lap), mut group)| {
            group.sort_by_key(|c| c.timestamp);

            let gaps: Vec<f64> = group
                .windows(2)
                .map(|pair| crate::timestamp::duration_secs(pair[1].timestamp - pair[0].timestamp))
                .collect();
            let avg_time_gap = if gaps.is_empty() {
                None
            } else {
                Some(gaps.iter().sum::<f64>() / gaps.len() as f64)
            };

            let total_len: usize = group.iter().map(|c| c.text.chars().count()).sum();

            LapActivity {
                race,
                lap,
                comment_count: group.iter().filter(|c| !c.text.is_empty()).count(),
                avg_time_gap,
                avg_text_len: total_len as f64 / group.len() as f64,
            }
        })
        .collect()
}
