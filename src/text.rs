//! Text cleaning for lexicon matching
//!
//! Community posts mix Korean, English, emoji and markup. Cleaning keeps
//! Hangul syllables, ASCII letters and digits; everything else becomes a
//! single space.

use regex::Regex;
use std::sync::OnceLock;

fn line_breaks() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\r\n]+").expect("valid regex"))
}

fn disallowed() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^가-힣a-z0-9 ]").expect("valid regex"))
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

/// Lowercase, strip everything but Hangul/ASCII alphanumerics, collapse spaces
pub fn clean_text(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let s = line_breaks().replace_all(&lower, " ");
    let s = disallowed().replace_all(&s, " ");
    let s = whitespace().replace_all(&s, " ");
    s.trim().to_string()
}

/// Join post title and body the way they are scored: `title + " " + body`
pub fn join_title_body(title: &str, body: &str) -> String {
    format!("{} {}", title, body)
}
