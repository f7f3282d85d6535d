//! Wildcard path patterns.
//!
//! Supported wildcards:
//! - `...` -- any run of characters, including `/`
//! - `*` -- any run of characters within one path component
//! - `%%1` .. `%%9` -- positional, within one path component
//!
//! When a path is translated, each wildcard on the destination side takes
//! the text captured by the source wildcard of the same kind and ordinal
//! (`%%n` by its number).

use regex_lite::Regex;

use crate::errors::MapError;

/// A single wildcard token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wildcard {
    Ellipsis,
    Star,
    Positional(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Wild(Wildcard),
}

/// Text captured by each wildcard of a source pattern, in pattern order.
pub type Captures = Vec<(Wildcard, String)>;

/// A compiled wildcard pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    text: String,
    segments: Vec<Segment>,
    regex: Regex,
}

impl Pattern {
    /// Compile a pattern string.
    pub fn compile(text: &str) -> Result<Self, MapError> {
        let segments = tokenize(text);

        let mut source = String::from("^");
        for segment in &segments {
            match segment {
                Segment::Literal(lit) => source.push_str(&regex_lite::escape(lit)),
                Segment::Wild(Wildcard::Ellipsis) => source.push_str("(.*)"),
                Segment::Wild(_) => source.push_str("([^/]*)"),
            }
        }
        source.push('$');

        let regex = Regex::new(&source).map_err(|e| MapError::InvalidPattern {
            pattern: text.to_string(),
            detail: e.to_string(),
        })?;

        Ok(Self {
            text: text.to_string(),
            segments,
            regex,
        })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether the pattern contains no wildcards.
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Match `path` against the whole pattern, returning captured text.
    pub fn captures(&self, path: &str) -> Option<Captures> {
        let caps = self.regex.captures(path)?;
        let wildcards = self.segments.iter().filter_map(|s| match s {
            Segment::Wild(w) => Some(*w),
            Segment::Literal(_) => None,
        });

        Some(
            wildcards
                .enumerate()
                .map(|(i, w)| {
                    let text = caps.get(i + 1).map_or("", |m| m.as_str());
                    (w, text.to_string())
                })
                .collect(),
        )
    }

    /// Match the text of another pattern against this one.
    ///
    /// Succeeds only when every wildcard in `other` falls inside a wildcard
    /// here that can hold it: `...` only inside `...`, and nothing that
    /// spans a `/` inside `*` or `%%n`.
    pub fn captures_pattern(&self, other: &str) -> Option<Captures> {
        let captures = self.captures(other)?;
        let covered = captures.iter().all(|(w, text)| match w {
            Wildcard::Ellipsis => true,
            Wildcard::Star | Wildcard::Positional(_) => {
                !text.contains('/') && !text.contains("...")
            }
        });
        covered.then_some(captures)
    }

    /// Whether `path` matches the pattern.
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Expand this pattern as a destination, filling wildcards from
    /// `captures`. A wildcard with no counterpart expands to nothing.
    pub fn substitute(&self, captures: &[(Wildcard, String)]) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut ellipses = 0;
        let mut stars = 0;

        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => out.push_str(lit),
                Segment::Wild(Wildcard::Ellipsis) => {
                    out.push_str(nth_capture(captures, ellipses, |w| {
                        matches!(w, Wildcard::Ellipsis)
                    }));
                    ellipses += 1;
                }
                Segment::Wild(Wildcard::Star) => {
                    out.push_str(nth_capture(captures, stars, |w| matches!(w, Wildcard::Star)));
                    stars += 1;
                }
                Segment::Wild(Wildcard::Positional(n)) => {
                    out.push_str(nth_capture(captures, 0, |w| w == Wildcard::Positional(*n)));
                }
            }
        }
        out
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Pattern {}

fn nth_capture(captures: &[(Wildcard, String)], n: usize, want: impl Fn(Wildcard) -> bool) -> &str {
    captures
        .iter()
        .filter(|(w, _)| want(*w))
        .nth(n)
        .map_or("", |(_, text)| text.as_str())
}

fn tokenize(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        let wildcard = if rest.starts_with("...") {
            Some((Wildcard::Ellipsis, 3))
        } else if c == '*' {
            Some((Wildcard::Star, 1))
        } else if let Some(n) = positional(rest) {
            Some((Wildcard::Positional(n), 3))
        } else {
            None
        };

        match wildcard {
            Some((w, len)) => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Wild(w));
                rest = &rest[len..];
            }
            None => {
                literal.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

fn positional(s: &str) -> Option<u8> {
    let digit = s.strip_prefix("%%")?.chars().next()?;
    match digit {
        '1'..='9' => digit.to_digit(10).map(|d| d as u8),
        _ => None,
    }
}
