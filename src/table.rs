//! Header-addressed CSV tables
//!
//! Inputs are spreadsheet exports: optional UTF-8 BOM, quoted fields with
//! doubled quotes, embedded newlines, CRLF line endings. Columns are looked
//! up by exact (trimmed) header name and a missing column is an error naming
//! what was found, never a guess.

use crate::error::{Error, Result};
use std::fs;
use std::mem::take;
use std::path::Path;

/// A parsed CSV file: one header row plus data rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    source: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Read and parse a CSV file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        Self::parse(&path.display().to_string(), &text)
    }

    /// Parse CSV text; `source` names the input in error messages
    pub fn parse(source: &str, text: &str) -> Result<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut records = parse_records(text).into_iter();

        let headers: Vec<String> = records
            .next()
            .ok_or_else(|| Error::data(format!("{} is empty (no header row)", source)))?
            .into_iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let width = headers.len();
        let rows = records
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, String::new());
                }
                row
            })
            .collect();

        Ok(Self {
            source: source.to_string(),
            headers,
            rows,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a required column
    pub fn column(&self, name: &str) -> Result<usize> {
        self.optional_column(name).ok_or_else(|| {
            Error::config(format!(
                "Missing column '{}' in {} (found: {})",
                name,
                self.source,
                self.headers.join(", ")
            ))
        })
    }

    /// Index of a column that may be absent
    pub fn optional_column(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.headers.iter().position(|h| h == name)
    }

    /// Cell text, empty when the row is short
    pub fn cell<'a>(&self, row: &'a [String], column: usize) -> &'a str {
        row.get(column).map(String::as_str).unwrap_or("")
    }

    /// Values of one column, in row order
    pub fn column_values(&self, name: &str) -> Result<Vec<&str>> {
        let idx = self.column(name)?;
        Ok(self.rows.iter().map(|row| self.cell(row, idx)).collect())
    }
}

/// Split CSV text into records (quotes and CRLF tolerant)
///
/// Blank lines are skipped. An unterminated quote runs to end of input.
pub fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if matches!(chars.peek(), Some('"')) {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    records.push(take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(ch),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        records.push(row);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let t = Table::parse("posts.csv", "a,b\n1,2\n3,4\n").unwrap();
        assert_eq!(t.headers(), &["a", "b"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.rows()[1], vec!["3", "4"]);
    }

    #[test]
    fn test_bom_and_header_whitespace() {
        let t = Table::parse("posts.csv", "\u{feff} post_timestamp ,post_title\r\nx,y\r\n").unwrap();
        assert_eq!(t.column("post_timestamp").unwrap(), 0);
        assert_eq!(t.rows()[0], vec!["x", "y"]);
    }

    #[test]
    fn test_quoted_fields() {
        let text = "id,text\n1,\"hello, \"\"world\"\"\"\n2,\"multi\nline\"\n";
        let t = Table::parse("c.csv", text).unwrap();
        assert_eq!(t.rows()[0][1], "hello, \"world\"");
        assert_eq!(t.rows()[1][1], "multi\nline");
    }

    #[test]
    fn test_blank_lines_skipped_and_short_rows_padded() {
        let t = Table::parse("c.csv", "a,b,c\n\n1\n\n").unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.rows()[0], vec!["1", "", ""]);
    }

    #[test]
    fn test_no_trailing_newline() {
        let t = Table::parse("c.csv", "a,b\n1,2").unwrap();
        assert_eq!(t.rows()[0], vec!["1", "2"]);
    }

    #[test]
    fn test_missing_column_lists_found() {
        let t = Table::parse("laps.csv", "LapNumber,Start\n").unwrap();
        let err = t.column("Avg_LapStartTime_KST").unwrap_err().to_string();
        assert!(err.contains("Avg_LapStartTime_KST"));
        assert!(err.contains("laps.csv"));
        assert!(err.contains("LapNumber, Start"));
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(Table::parse("empty.csv", "").is_err());
    }

    #[test]
    fn test_column_values() {
        let t = Table::parse("c.csv", "race,lap\nbahrain,1\njeddah,2\n").unwrap();
        assert_eq!(t.column_values("race").unwrap(), vec!["bahrain", "jeddah"]);
    }
}
