//! Mapping rules and the rule-text tokenizer.
//!
//! A rule is written as `[-|+]left right`. Either half may be wrapped in
//! double quotes to embed whitespace. A single half maps a path to itself.

use serde::{Deserialize, Serialize};

use crate::errors::MapError;

// ---------------------------------------------------------------------------
// Rule kind
// ---------------------------------------------------------------------------

/// How a rule participates in a view.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Paths matching the rule are mapped.
    #[default]
    Include,
    /// Paths matching the rule are excluded (written with a `-` prefix).
    Exclude,
    /// Paths matching the rule are overlaid on earlier rules (`+` prefix).
    Overlay,
}

impl RuleKind {
    /// The textual prefix used on the left half.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Include => "",
            Self::Exclude => "-",
            Self::Overlay => "+",
        }
    }

    /// Detect a kind from the first character of a left half.
    pub fn from_prefix(c: char) -> Option<Self> {
        match c {
            '-' => Some(Self::Exclude),
            '+' => Some(Self::Overlay),
            _ => None,
        }
    }

    /// Kind of a rule composed from two contributing rules.
    ///
    /// Exclude dominates Overlay, which dominates Include.
    pub fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Exclude, _) | (_, Self::Exclude) => Self::Exclude,
            (Self::Overlay, _) | (_, Self::Overlay) => Self::Overlay,
            _ => Self::Include,
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Include => write!(f, "include"),
            Self::Exclude => write!(f, "exclude"),
            Self::Overlay => write!(f, "overlay"),
        }
    }
}

// ---------------------------------------------------------------------------
// PathRule
// ---------------------------------------------------------------------------

/// A single left/right path translation rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathRule {
    /// Left pattern, without the kind prefix.
    pub left: String,
    /// Right pattern.
    pub right: String,
    /// Rule kind.
    pub kind: RuleKind,
}

impl PathRule {
    pub fn new(left: impl Into<String>, right: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            kind,
        }
    }

    /// Parse a combined `[-|+]left [right]` rule.
    ///
    /// Fields are separated by unquoted whitespace. When only one field is
    /// present the rule maps the path to itself.
    pub fn parse(text: &str) -> Result<Self, MapError> {
        let fields = split_fields(text)?;
        let (left, right) = match fields.as_slice() {
            [] => {
                return Err(MapError::EmptyRule {
                    rule: text.to_string(),
                })
            }
            [single] => (single.clone(), None),
            [left, right] => (left.clone(), Some(right.clone())),
            _ => {
                return Err(MapError::ExtraField {
                    rule: text.to_string(),
                })
            }
        };

        let (kind, left) = take_kind(&left);
        if left.is_empty() {
            return Err(MapError::EmptyRule {
                rule: text.to_string(),
            });
        }
        let right = right.unwrap_or_else(|| left.clone());
        check_unprefixed(text, &left)?;
        check_unprefixed(text, &right)?;
        Ok(Self::new(left, right, kind))
    }

    /// Build a rule from separately supplied halves.
    ///
    /// The kind prefix is honoured only at the start of `left`. Neither path
    /// may itself start with `-` or `+`.
    pub fn from_halves(left: &str, right: &str) -> Result<Self, MapError> {
        let left_text = unquote_half(left)?;
        let right_text = unquote_half(right)?;
        let rule = format!("{} {}", left, right);

        let (kind, left_text) = take_kind(&left_text);
        if left_text.is_empty() || right_text.is_empty() {
            return Err(MapError::EmptyRule { rule });
        }
        check_unprefixed(&rule, &left_text)?;
        check_unprefixed(&rule, &right_text)?;
        Ok(Self::new(left_text, right_text, kind))
    }

    /// The same rule with its halves swapped.
    pub fn reversed(&self) -> Self {
        Self::new(self.right.clone(), self.left.clone(), self.kind)
    }

    /// Render the left half with its kind prefix, quoted if needed.
    pub fn render_left(&self) -> String {
        let text = format!("{}{}", self.kind.prefix(), self.left);
        if has_whitespace(&self.left) {
            quote(&text)
        } else {
            text
        }
    }

    /// Render the right half, quoted if needed.
    pub fn render_right(&self) -> String {
        if has_whitespace(&self.right) {
            quote(&self.right)
        } else {
            self.right.clone()
        }
    }

    /// Render the full rule; the exact inverse of [`PathRule::parse`].
    ///
    /// Both halves are quoted when either contains whitespace.
    pub fn render(&self) -> String {
        if has_whitespace(&self.left) || has_whitespace(&self.right) {
            format!(
                "{} {}",
                quote(&format!("{}{}", self.kind.prefix(), self.left)),
                quote(&self.right)
            )
        } else {
            format!("{}{} {}", self.kind.prefix(), self.left, self.right)
        }
    }
}

impl std::fmt::Display for PathRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

/// Split a combined rule into fields on unquoted whitespace.
///
/// Quote characters toggle quoting and are dropped. `""` yields an empty
/// field.
fn split_fields(text: &str) -> Result<Vec<String>, MapError> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_field = false;
    let mut quoted = false;

    for c in text.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_field = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_field {
                    fields.push(std::mem::take(&mut current));
                    in_field = false;
                }
            }
            c => {
                current.push(c);
                in_field = true;
            }
        }
    }

    if quoted {
        return Err(MapError::UnterminatedQuote {
            rule: text.to_string(),
        });
    }
    if in_field {
        fields.push(current);
    }
    Ok(fields)
}

/// Tokenize one half: drop quotes, keep embedded whitespace, trim unquoted
/// whitespace at either end.
fn unquote_half(text: &str) -> Result<String, MapError> {
    let mut chars: Vec<(char, bool)> = Vec::with_capacity(text.len());
    let mut quoted = false;

    for c in text.chars() {
        if c == '"' {
            quoted = !quoted;
        } else {
            chars.push((c, quoted));
        }
    }

    if quoted {
        return Err(MapError::UnterminatedQuote {
            rule: text.to_string(),
        });
    }

    let is_trim = |&(c, q): &(char, bool)| !q && c.is_whitespace();
    let start = chars.iter().position(|e| !is_trim(e)).unwrap_or(chars.len());
    let end = chars
        .iter()
        .rposition(|e| !is_trim(e))
        .map_or(start, |i| i + 1);

    Ok(chars[start..end].iter().map(|&(c, _)| c).collect())
}

/// Strip a leading kind character from a left half.
fn take_kind(left: &str) -> (RuleKind, String) {
    let mut chars = left.chars();
    match chars.next().and_then(RuleKind::from_prefix) {
        Some(kind) => (kind, chars.as_str().to_string()),
        None => (RuleKind::Include, left.to_string()),
    }
}

/// Reject a path whose first character would parse as a kind prefix.
fn check_unprefixed(rule: &str, path: &str) -> Result<(), MapError> {
    match path.chars().next().and_then(RuleKind::from_prefix) {
        Some(_) => Err(MapError::PrefixedPath {
            rule: rule.to_string(),
            path: path.to_string(),
        }),
        None => Ok(()),
    }
}

fn has_whitespace(s: &str) -> bool {
    s.chars().any(char::is_whitespace)
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s)
}
