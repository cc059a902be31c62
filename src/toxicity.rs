//! Weighted-lexicon toxicity scoring
//!
//! A post's score is the sum over lexicon terms of occurrences × weight.
//! Latin/digit terms match on word boundaries so short slang does not hit
//! inside longer words; Hangul terms match as substrings because Korean
//! slang is routinely written without spacing.
//!
//! Scores are aggregated into fixed-width time windows (one nominal lap,
//! 90 seconds, by default) anchored at midnight of the first post's day.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, FixedOffset, TimeZone};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Default aggregation window
pub const DEFAULT_WINDOW_SECS: i64 = 90;

#[derive(Debug, Clone)]
struct Term {
    text: String,
    pattern: Regex,
    weight: f64,
}

/// Compiled slang lexicon
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    terms: Vec<Term>,
}

impl Lexicon {
    /// Build a lexicon from `(term, weight)` pairs
    ///
    /// Terms are trimmed and lowercased; blank terms are skipped, and a
    /// repeated term keeps its first weight. A missing weight counts as 1.0.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Option<f64>)>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut terms = Vec::new();

        for (raw, weight) in pairs {
            let text = raw.as_ref().trim().to_lowercase();
            if text.is_empty() || !seen.insert(text.clone()) {
                continue;
            }

            let escaped = regex::escape(&text);
            let source = if text.chars().any(|c| c.is_ascii_alphanumeric()) {
                format!(r"(?i)\b{}\b", escaped)
            } else {
                escaped
            };
            let pattern = Regex::new(&source)
                .map_err(|e| Error::data(format!("Invalid lexicon term '{}': {}", text, e)))?;

            terms.push(Term {
                text,
                pattern,
                weight: weight.filter(|w| w.is_finite()).unwrap_or(1.0),
            });
        }

        Ok(Self { terms })
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> impl Iterator<Item = (&str, f64)> {
        self.terms.iter().map(|t| (t.text.as_str(), t.weight))
    }

    /// Weighted count of lexicon hits in already-cleaned text
    pub fn score(&self, text: &str) -> f64 {
        self.terms
            .iter()
            .map(|term| term.pattern.find_iter(text).count() as f64 * term.weight)
            .sum()
    }
}

/// A post with its normalized timestamp and score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPost {
    pub timestamp: DateTime<FixedOffset>,
    pub toxicity: f64,
}

/// Aggregate of all posts in one time window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToxicityWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub post_count: usize,
    /// `None` for windows without posts
    pub mean_toxicity: Option<f64>,
    pub sum_toxicity: f64,
}

/// Aggregate scored posts into fixed windows
///
/// Windows run from the first through the last window holding a post; empty
/// windows in between are reported with a zero count.
pub fn window_toxicity(posts: &[ScoredPost], window: Duration) -> Result<Vec<ToxicityWindow>> {
    if window <= Duration::zero() {
        return Err(Error::config(format!(
            "toxicity window must be positive, got {}s",
            window.num_seconds()
        )));
    }
    let Some(earliest) = posts.iter().map(|p| p.timestamp).min() else {
        return Ok(Vec::new());
    };

    let offset = *earliest.offset();
    let midnight = earliest
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .ok_or_else(|| Error::data(format!("Cannot anchor windows at {}", earliest)))?;
    let width = window.num_milliseconds();

    let mut bins: BTreeMap<i64, (usize, f64)> = BTreeMap::new();
    for post in posts {
        let idx = (post.timestamp - midnight).num_milliseconds().div_euclid(width);
        let bin = bins.entry(idx).or_insert((0, 0.0));
        bin.0 += 1;
        bin.1 += post.toxicity;
    }

    let (Some(&first), Some(&last)) = (bins.keys().next(), bins.keys().next_back()) else {
        return Ok(Vec::new());
    };

    Ok((first..=last)
        .map(|idx| {
            let start = midnight + Duration::milliseconds(idx * width);
            let (count, sum) = bins.get(&idx).copied().unwrap_or((0, 0.0));
            ToxicityWindow {
                start,
                end: start + window,
                post_count: count,
                mean_toxicity: (count > 0).then(|| sum / count as f64),
                sum_toxicity: sum,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> Lexicon {
        Lexicon::from_pairs(vec![
            ("idiot", Some(2.0)),
            ("  Joke ", None),
            ("시발", Some(3.0)),
            ("idiot", Some(10.0)),
            ("", Some(5.0)),
        ])
        .unwrap()
    }

    #[test]
    fn test_lexicon_normalizes_terms() {
        let lex = lexicon();
        let terms: Vec<(&str, f64)> = lex.terms().collect();
        assert_eq!(terms, vec![("idiot", 2.0), ("joke", 1.0), ("시발", 3.0)]);
    }

    #[test]
    fn test_latin_terms_use_word_boundaries() {
        let lex = lexicon();
        assert_eq!(lex.score("what an idiot"), 2.0);
        assert_eq!(lex.score("idiotic strategy"), 0.0);
        assert_eq!(lex.score("joke joke idiot"), 4.0);
    }

    #[test]
    fn test_hangul_terms_match_substrings() {
        let lex = lexicon();
        assert_eq!(lex.score("아시발진짜"), 3.0);
        assert_eq!(lex.score("시발 시발"), 6.0);
    }

    #[test]
    fn test_nan_weight_defaults_to_one() {
        let lex = Lexicon::from_pairs(vec![("bad", Some(f64::NAN))]).unwrap();
        assert_eq!(lex.score("bad"), 1.0);
    }

    fn at(secs: i64) -> DateTime<FixedOffset> {
        // 2024-03-03 00:00:00 +09:00
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .timestamp_opt(1_709_391_600 + secs, 0)
            .unwrap()
    }

    fn post(secs: i64, toxicity: f64) -> ScoredPost {
        ScoredPost {
            timestamp: at(secs),
            toxicity,
        }
    }

    #[test]
    fn test_windows_anchor_at_midnight() {
        let posts = vec![post(100, 1.0), post(170, 3.0), post(185, 0.0)];
        let windows = window_toxicity(&posts, Duration::seconds(90)).unwrap();

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].start, at(90));
        assert_eq!(windows[0].end, at(180));
        assert_eq!(windows[0].post_count, 2);
        assert_eq!(windows[0].mean_toxicity, Some(2.0));
        assert_eq!(windows[0].sum_toxicity, 4.0);
        assert_eq!(windows[1].start, at(180));
        assert_eq!(windows[1].post_count, 1);
    }

    #[test]
    fn test_empty_windows_are_reported() {
        let posts = vec![post(0, 1.0), post(300, 1.0)];
        let windows = window_toxicity(&posts, Duration::seconds(90)).unwrap();
        let counts: Vec<usize> = windows.iter().map(|w| w.post_count).collect();
        assert_eq!(counts, vec![1, 0, 0, 1]);
        assert_eq!(windows[1].mean_toxicity, None);
        assert_eq!(windows[1].sum_toxicity, 0.0);
    }

    #[test]
    fn test_no_posts_no_windows() {
        assert!(window_toxicity(&[], Duration::seconds(90)).unwrap().is_empty());
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(window_toxicity(&[post(0, 1.0)], Duration::zero()).is_err());
    }
}
