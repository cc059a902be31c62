//! Joining logged race incidents onto comments by (race, lap)
//!
//! The incident log carries one row per incident with numeric flag columns
//! (unexpectedness, responsibility, outcome relevance, ...). Comments pick
//! up the flags of their (race, lap) key; keys without an incident get zeros.

use crate::lap_key::LapKey;
use serde::Serialize;
use std::collections::HashMap;

/// Flags matched for one comment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventMatch {
    /// One value per flag column, 0 when absent
    pub flags: Vec<f64>,
    /// True when any flag was present for the key
    pub event_marker: bool,
}

/// Incident flags indexed by (race, lap key)
#[derive(Debug, Clone)]
pub struct EventIndex {
    flag_names: Vec<String>,
    by_key: HashMap<(String, LapKey), Vec<Option<f64>>>,
}

impl EventIndex {
    pub fn new<I, S>(flag_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            flag_names: flag_names.into_iter().map(Into::into).collect(),
            by_key: HashMap::new(),
        }
    }

    pub fn flag_names(&self) -> &[String] {
        &self.flag_names
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Record one incident
    ///
    /// Several incidents on the same key merge flag-wise by maximum, so each
    /// comment still joins exactly one flag set.
    pub fn insert(&mut self, race: &str, lap: LapKey, values: Vec<Option<f64>>) {
        let width = self.flag_names.len();
        let entry = self
            .by_key
            .entry((race.trim().to_string(), lap))
            .or_insert_with(|| vec![None; width]);

        for (slot, value) in entry.iter_mut().zip(values) {
            *slot = match (*slot, value) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };
        }
    }

    /// Flags for a comment's key (left join)
    pub fn lookup(&self, race: &str, lap: &LapKey) -> EventMatch {
        match self.by_key.get(&(race.trim().to_string(), lap.clone())) {
            Some(values) => EventMatch {
                flags: values.iter().map(|v| v.unwrap_or(0.0)).collect(),
                event_marker: values.iter().any(Option::is_some),
            },
            None => EventMatch {
                flags: vec![0.0; self.flag_names.len()],
                event_marker: false,
            },
        }
    }
}

/// Parse a flag cell; blanks and non-numbers are absent
pub fn parse_flag(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> EventIndex {
        let mut idx = EventIndex::new(["ev_unexp", "ev_resp", "ev_out"]);
        idx.insert("Bahrain", LapKey::Lap(1), vec![Some(1.0), None, Some(0.0)]);
        idx.insert("Bahrain", LapKey::AfterRace, vec![None, None, None]);
        idx
    }

    #[test]
    fn test_match_fills_missing_with_zero() {
        let m = index().lookup("Bahrain", &LapKey::Lap(1));
        assert_eq!(m.flags, vec![1.0, 0.0, 0.0]);
        assert!(m.event_marker);
    }

    #[test]
    fn test_no_match_is_zero_without_marker() {
        let m = index().lookup("Bahrain", &LapKey::Lap(2));
        assert_eq!(m.flags, vec![0.0, 0.0, 0.0]);
        assert!(!m.event_marker);
    }

    #[test]
    fn test_key_without_flags_has_no_marker() {
        let m = index().lookup("Bahrain", &LapKey::AfterRace);
        assert!(!m.event_marker);
    }

    #[test]
    fn test_race_names_trimmed() {
        let m = index().lookup(" Bahrain ", &LapKey::parse("Lap 1"));
        assert!(m.event_marker);
    }

    #[test]
    fn test_duplicate_incidents_merge_by_max() {
        let mut idx = index();
        idx.insert("Bahrain", LapKey::Lap(1), vec![Some(0.0), Some(1.0), None]);
        let m = idx.lookup("Bahrain", &LapKey::Lap(1));
        assert_eq!(m.flags, vec![1.0, 1.0, 0.0]);
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag(" 1 "), Some(1.0));
        assert_eq!(parse_flag("0.0"), Some(0.0));
        assert_eq!(parse_flag(""), None);
        assert_eq!(parse_flag("yes"), None);
    }
}
