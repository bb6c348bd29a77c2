//! A character-stream scanner that finds regex matches anchored at
//! *logical* line beginnings, skipping configurable comment/string zones.
//!
//! The matcher is attempted only when the cursor is at a position the
//! scanner believes to be a line start: after leading whitespace, after a
//! zone marked `is_ignored_by_parser` (a comment), but not after a zone
//! that is parser-significant (a string literal).

use regex::Regex;
use thiserror::Error;

/// Character used to escape the character following it inside a zone.
const ESCAPE_CHAR: char = '\\';

/// Specifies a span of source text the scanner should not search inside,
/// such as a comment or string literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedZoneSpec {
    pub begin: String,
    pub end: String,
    pub has_escapes: bool,
    pub is_ignored_by_parser: bool,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("excluded zone delimiters must be non-empty")]
    EmptyDelimiter,
}

impl ExcludedZoneSpec {
    pub fn new(
        begin: impl Into<String>,
        end: impl Into<String>,
        has_escapes: bool,
        is_ignored_by_parser: bool,
    ) -> Result<Self, ScanError> {
        let begin = begin.into();
        let end = end.into();
        if begin.is_empty() || end.is_empty() {
            return Err(ScanError::EmptyDelimiter);
        }
        Ok(Self {
            begin,
            end,
            has_escapes,
            is_ignored_by_parser,
        })
    }
}

/// A single regex match, with capture groups preserved in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanMatch {
    pub full: String,
    groups: Vec<Option<String>>,
}

impl ScanMatch {
    /// Capture group `n`, where group 0 is the full match.
    pub fn group(&self, n: usize) -> Option<&str> {
        if n == 0 {
            return Some(self.full.as_str());
        }
        self.groups.get(n - 1).and_then(|g| g.as_deref())
    }
}

/// Find every `matcher` match in `source` that falls at a logical line
/// beginning, skipping text inside `excluded_zones`.
///
/// `has_nl_escapes` controls whether a trailing `\` before a newline
/// continues the current logical line (as in C string literals or Python
/// statements); pass `true` for most languages.
pub fn find_matches(
    source: &str,
    excluded_zones: &[ExcludedZoneSpec],
    matcher: &Regex,
    has_nl_escapes: bool,
) -> Vec<ScanMatch> {
    let mut pos = 0usize;
    let mut zone: Option<usize> = None;
    let mut escape = false;
    let mut on_line_begin = true;
    let mut possible_escape_nl = false;
    let mut result = Vec::new();

    while pos < source.len() {
        let rest = &source[pos..];

        if let Some(zi) = zone {
            let z = &excluded_zones[zi];

            if escape {
                escape = false;
                pos += next_char_len(rest);
                continue;
            }

            if z.has_escapes && rest.starts_with(ESCAPE_CHAR) {
                escape = true;
                pos += ESCAPE_CHAR.len_utf8();
                continue;
            }

            if rest.starts_with(z.end.as_str()) {
                pos += z.end.len();
                if z.end.ends_with('\n') {
                    on_line_begin = true;
                }
                zone = None;
                continue;
            }

            pos += next_char_len(rest);
            continue;
        }

        if let Some((zi, begin_len)) = excluded_zones
            .iter()
            .enumerate()
            .find(|(_, z)| rest.starts_with(z.begin.as_str()))
            .map(|(i, z)| (i, z.begin.len()))
        {
            on_line_begin = on_line_begin && excluded_zones[zi].is_ignored_by_parser;
            possible_escape_nl = false;
            zone = Some(zi);
            pos += begin_len;
            continue;
        }

        let ch = match rest.chars().next() {
            Some(c) => c,
            None => break,
        };

        if has_nl_escapes && ch == ESCAPE_CHAR {
            possible_escape_nl = true;
        } else if ch == '\n' {
            if !possible_escape_nl {
                on_line_begin = true;
            }
            possible_escape_nl = true;
        } else if !ch.is_whitespace() {
            if on_line_begin {
                if let Some(whole) = matcher.captures(rest).and_then(|caps| {
                    caps.get(0).filter(|m| m.start() == 0).map(|m| {
                        let full = m.as_str().to_string();
                        let groups = (1..caps.len())
                            .map(|i| caps.get(i).map(|g| g.as_str().to_string()))
                            .collect();
                        ScanMatch { full, groups }
                    })
                }) {
                    let advance = whole.full.len();
                    result.push(whole);
                    pos += advance;
                    on_line_begin = false;
                    possible_escape_nl = false;
                    continue;
                }
            }
            on_line_begin = false;
            if ch != ESCAPE_CHAR {
                possible_escape_nl = false;
            }
        }

        pos += ch.len_utf8();
    }

    result
}

fn next_char_len(rest: &str) -> usize {
    rest.chars().next().map_or(1, |c| c.len_utf8())
}

#[cfg(test)]
#[path = "scan_tests.rs"]
mod tests;
