//! The ordered path-translation table.
//!
//! [`PathMapper`] holds rules in insertion order. Translation walks the
//! rules front to back and the first rule whose source half matches decides
//! the outcome: an Exclude rule rejects the path, any other kind substitutes
//! the matched wildcards into the destination half.

use tracing::{debug, info};

use super::join::join_rules;
use super::pattern::Pattern;
use super::rule::{PathRule, RuleKind};
use crate::errors::MapError;

/// Direction of a translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Match the left half, produce the right half.
    LeftToRight,
    /// Match the right half, produce the left half.
    RightToLeft,
}

impl From<bool> for Direction {
    /// `true` is forward (left to right).
    fn from(forward: bool) -> Self {
        if forward {
            Self::LeftToRight
        } else {
            Self::RightToLeft
        }
    }
}

/// A rule with both halves compiled.
#[derive(Debug, Clone)]
pub(crate) struct CompiledRule {
    pub(crate) rule: PathRule,
    pub(crate) left: Pattern,
    pub(crate) right: Pattern,
}

impl CompiledRule {
    pub(crate) fn compile(rule: PathRule) -> Result<Self, MapError> {
        let left = Pattern::compile(&rule.left)?;
        let right = Pattern::compile(&rule.right)?;
        Ok(Self { rule, left, right })
    }

    fn halves(&self, direction: Direction) -> (&Pattern, &Pattern) {
        match direction {
            Direction::LeftToRight => (&self.left, &self.right),
            Direction::RightToLeft => (&self.right, &self.left),
        }
    }
}

/// Ordered table of path-translation rules.
///
/// Not synchronized: share an immutable snapshot between readers and
/// serialize writers externally.
#[derive(Debug, Clone, Default)]
pub struct PathMapper {
    rules: Vec<CompiledRule>,
}

impl PathMapper {
    /// Create an empty mapper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapper from combined rule lines.
    pub fn from_lines<I, S>(lines: I) -> Result<Self, MapError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut mapper = Self::new();
        for line in lines {
            mapper.insert(line.as_ref())?;
        }
        Ok(mapper)
    }

    /// Append a combined `[-|+]left [right]` rule.
    pub fn insert(&mut self, rule: &str) -> Result<(), MapError> {
        self.push(PathRule::parse(rule)?)
    }

    /// Append a rule from separately supplied halves.
    pub fn insert_pair(&mut self, left: &str, right: &str) -> Result<(), MapError> {
        self.push(PathRule::from_halves(left, right)?)
    }

    /// Append one rule per `(lefts[i], rights[i])` pair.
    ///
    /// All pairs are parsed before any is appended, so a failure leaves the
    /// table untouched.
    pub fn insert_pairs<S: AsRef<str>>(&mut self, lefts: &[S], rights: &[S]) -> Result<(), MapError> {
        if lefts.len() != rights.len() {
            return Err(MapError::LengthMismatch {
                left: lefts.len(),
                right: rights.len(),
            });
        }

        let compiled = lefts
            .iter()
            .zip(rights)
            .map(|(l, r)| PathRule::from_halves(l.as_ref(), r.as_ref()).and_then(CompiledRule::compile))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = compiled.len(), "appending rule pairs");
        self.rules.extend(compiled);
        Ok(())
    }

    /// Append an already-parsed rule.
    pub fn push(&mut self, rule: PathRule) -> Result<(), MapError> {
        let compiled = CompiledRule::compile(rule)?;
        debug!(
            left = %compiled.rule.left,
            right = %compiled.rule.right,
            kind = %compiled.rule.kind,
            "inserted mapping rule"
        );
        self.rules.push(compiled);
        Ok(())
    }

    /// Number of rules.
    pub fn count(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Remove every rule.
    pub fn clear(&mut self) {
        self.rules.clear();
    }

    /// Rules in insertion order.
    pub fn rules(&self) -> impl Iterator<Item = &PathRule> + '_ {
        self.rules.iter().map(|c| &c.rule)
    }

    /// The rule at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&PathRule> {
        self.rules.get(index).map(|c| &c.rule)
    }

    /// Swap the halves of every rule in place, preserving order and kinds.
    ///
    /// The new table is built fully before it replaces the old one.
    pub fn reverse(&mut self) {
        let reversed: Vec<CompiledRule> = self
            .rules
            .iter()
            .map(|c| CompiledRule {
                rule: c.rule.reversed(),
                left: c.right.clone(),
                right: c.left.clone(),
            })
            .collect();
        info!(count = reversed.len(), "reversed mapping table");
        self.rules = reversed;
    }

    /// A reversed copy; `self` is left unchanged.
    pub fn reversed(&self) -> Self {
        let mut copy = self.clone();
        copy.reverse();
        copy
    }

    /// Compose two mappers: `left` maps A to B, `right` maps B to C, the
    /// result maps A to C over the overlapping part of B.
    ///
    /// Neither input is modified.
    pub fn join(left: &PathMapper, right: &PathMapper) -> Result<PathMapper, MapError> {
        let rules = join_rules(&left.rules, &right.rules);
        let mut joined = PathMapper::new();
        for rule in rules {
            joined.rules.push(CompiledRule::compile(rule)?);
        }
        info!(
            left = left.count(),
            right = right.count(),
            joined = joined.count(),
            "joined mapping tables"
        );
        Ok(joined)
    }

    /// Translate `path` in `direction`.
    ///
    /// Returns `None` when no rule matches or when the first matching rule
    /// is an exclusion.
    pub fn translate(&self, path: &str, direction: impl Into<Direction>) -> Option<String> {
        let direction = direction.into();

        for compiled in &self.rules {
            let (source, dest) = compiled.halves(direction);
            let Some(captures) = source.captures(path) else {
                continue;
            };

            if compiled.rule.kind == RuleKind::Exclude {
                debug!(path, rule = %compiled.rule, "path excluded");
                return None;
            }

            let translated = dest.substitute(&captures);
            debug!(path, translated = %translated, ?direction, "path translated");
            return Some(translated);
        }

        debug!(path, ?direction, "no mapping rule matched");
        None
    }

    /// Translate left to right.
    pub fn translate_forward(&self, path: &str) -> Option<String> {
        self.translate(path, Direction::LeftToRight)
    }

    /// Translate right to left.
    pub fn translate_reverse(&self, path: &str) -> Option<String> {
        self.translate(path, Direction::RightToLeft)
    }

    /// Like [`PathMapper::translate`] but treats "no result" as an error.
    pub fn require_translate(&self, path: &str, direction: Direction) -> Result<String, MapError> {
        self.translate(path, direction)
            .ok_or_else(|| MapError::NoMatch {
                path: path.to_string(),
            })
    }

    /// Translate many paths left to right, dropping those with no result.
    pub fn translate_all<S: AsRef<str>>(&self, paths: &[S]) -> Vec<String> {
        paths
            .iter()
            .filter_map(|p| self.translate_forward(p.as_ref()))
            .collect()
    }

    /// Translate many paths right to left, dropping those with no result.
    pub fn translate_all_reverse<S: AsRef<str>>(&self, paths: &[S]) -> Vec<String> {
        paths
            .iter()
            .filter_map(|p| self.translate_reverse(p.as_ref()))
            .collect()
    }

    /// Whether the mapper translates `path` left to right.
    pub fn includes(&self, path: &str) -> bool {
        self.translate_forward(path).is_some()
    }

    pub fn includes_any<S: AsRef<str>>(&self, paths: &[S]) -> bool {
        paths.iter().any(|p| self.includes(p.as_ref()))
    }

    pub fn includes_all<S: AsRef<str>>(&self, paths: &[S]) -> bool {
        paths.iter().all(|p| self.includes(p.as_ref()))
    }

    /// Rendered left halves, with kind prefixes.
    pub fn lhs(&self) -> Vec<String> {
        self.rules().map(PathRule::render_left).collect()
    }

    /// Rendered right halves.
    pub fn rhs(&self) -> Vec<String> {
        self.rules().map(PathRule::render_right).collect()
    }

    /// Rendered full rules; each line re-parses to the same rule.
    pub fn to_lines(&self) -> Vec<String> {
        self.rules().map(PathRule::render).collect()
    }
}

impl PartialEq for PathMapper {
    fn eq(&self, other: &Self) -> bool {
        self.rules().eq(other.rules())
    }
}

impl Eq for PathMapper {}

impl std::fmt::Display for PathMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PathMapper: ")?;
        if self.is_empty() {
            return write!(f, "(empty)");
        }
        writeln!(f)?;
        for rule in self.rules() {
            writeln!(f, "\t{}{} {}", rule.kind.prefix(), rule.left, rule.right)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_view() -> PathMapper {
        PathMapper::from_lines([
            "-//depot/main/tmp/... //ws/main/tmp/...",
            "//depot/main/... //ws/main/...",
            "+//depot/vendor/... //ws/main/vendor/...",
        ])
        .unwrap()
    }

    #[test]
    fn test_insert_and_count() {
        let mut m = PathMapper::new();
        assert!(m.is_empty());
        m.insert("//depot/a/... //ws/a/...").unwrap();
        m.insert_pair("//depot/b/...", "//ws/b/...").unwrap();
        assert_eq!(m.count(), 2);

        m.clear();
        assert_eq!(m.count(), 0);
        assert!(m.is_empty());
    }

    #[test]
    fn test_failed_insert_leaves_table_unchanged() {
        let mut m = client_view();
        let before = m.clone();
        assert!(m.insert("\"//depot/broken").is_err());
        assert_eq!(m, before);
    }

    #[test]
    fn test_insert_pair_rejects_prefixed_right_path() {
        let mut m = client_view();
        let before = m.clone();
        let result = m.insert_pair("//a", "-//b");
        assert!(matches!(result, Err(MapError::PrefixedPath { .. })));
        assert_eq!(m, before);

        // Every accepted rule survives reverse then re-parse.
        let reparsed = PathMapper::from_lines(m.reversed().to_lines()).unwrap();
        assert_eq!(reparsed, m.reversed());
    }

    #[test]
    fn test_insert_pairs_length_mismatch() {
        let mut m = PathMapper::new();
        let result = m.insert_pairs(&["//a/...", "//b/..."], &["//x/..."]);
        assert!(matches!(
            result,
            Err(MapError::LengthMismatch { left: 2, right: 1 })
        ));
        assert!(m.is_empty());
    }

    #[test]
    fn test_insert_pairs_all_or_nothing() {
        let mut m = PathMapper::new();
        let result = m.insert_pairs(&["//a/...", "\"//b/..."], &["//x/...", "//y/..."]);
        assert!(result.is_err());
        assert!(m.is_empty());

        m.insert_pairs(&["//a/...", "-//b/..."], &["//x/...", "//y/..."])
            .unwrap();
        assert_eq!(m.count(), 2);
        assert_eq!(m.get(1).unwrap().kind, RuleKind::Exclude);
    }

    #[test]
    fn test_translate_forward_and_reverse() {
        let m = client_view();
        assert_eq!(
            m.translate("//depot/main/src/a.c", true),
            Some("//ws/main/src/a.c".to_string())
        );
        assert_eq!(
            m.translate("//ws/main/src/a.c", false),
            Some("//depot/main/src/a.c".to_string())
        );
    }

    #[test]
    fn test_translate_first_match_wins() {
        let m = client_view();
        // The exclusion comes first, so it short-circuits.
        assert_eq!(m.translate_forward("//depot/main/tmp/x.o"), None);

        let m = PathMapper::from_lines([
            "//depot/main/... //ws/main/...",
            "-//depot/main/tmp/... //ws/main/tmp/...",
        ])
        .unwrap();
        assert_eq!(
            m.translate_forward("//depot/main/tmp/x.o"),
            Some("//ws/main/tmp/x.o".to_string())
        );
    }

    #[test]
    fn test_translate_overlay_and_no_match() {
        let m = client_view();
        assert_eq!(
            m.translate_forward("//depot/vendor/zlib/z.h"),
            Some("//ws/main/vendor/zlib/z.h".to_string())
        );
        assert_eq!(m.translate_forward("//other/file"), None);
        assert!(matches!(
            m.require_translate("//other/file", Direction::LeftToRight),
            Err(MapError::NoMatch { .. })
        ));
    }

    #[test]
    fn test_translate_is_deterministic() {
        let m = client_view();
        let first = m.translate_forward("//depot/main/x/y");
        for _ in 0..3 {
            assert_eq!(m.translate_forward("//depot/main/x/y"), first);
        }
    }

    #[test]
    fn test_batch_translate_and_includes() {
        let m = client_view();
        let paths = ["//depot/main/a", "//depot/main/tmp/b", "//elsewhere/c"];
        assert_eq!(m.translate_all(&paths), vec!["//ws/main/a".to_string()]);
        assert_eq!(
            m.translate_all_reverse(&["//ws/main/a", "//nowhere"]),
            vec!["//depot/main/a".to_string()]
        );
        assert!(m.includes("//depot/main/a"));
        assert!(m.includes_any(&paths));
        assert!(!m.includes_all(&paths));
        assert!(m.includes_all(&["//depot/main/a", "//depot/vendor/b"]));
    }

    #[test]
    fn test_reverse_swaps_halves() {
        let mut m = client_view();
        m.reverse();
        let first = m.get(0).unwrap();
        assert_eq!(first.left, "//ws/main/tmp/...");
        assert_eq!(first.right, "//depot/main/tmp/...");
        assert_eq!(first.kind, RuleKind::Exclude);
        assert_eq!(
            m.translate_forward("//ws/main/src/a.c"),
            Some("//depot/main/src/a.c".to_string())
        );
    }

    #[test]
    fn test_reverse_involution() {
        let m = client_view();
        assert_eq!(m.reversed().reversed(), m);
    }

    #[test]
    fn test_lhs_rhs_to_lines() {
        let m = client_view();
        assert_eq!(
            m.lhs(),
            vec!["-//depot/main/tmp/...", "//depot/main/...", "+//depot/vendor/..."]
        );
        assert_eq!(
            m.rhs(),
            vec!["//ws/main/tmp/...", "//ws/main/...", "//ws/main/vendor/..."]
        );
        assert_eq!(m.to_lines()[0], "-//depot/main/tmp/... //ws/main/tmp/...");
    }

    #[test]
    fn test_to_lines_round_trip() {
        let mut m = client_view();
        m.insert("\"//depot/my docs/...\" \"//ws/my docs/...\"").unwrap();
        let again = PathMapper::from_lines(m.to_lines()).unwrap();
        assert_eq!(again, m);
    }

    #[test]
    fn test_display() {
        assert_eq!(PathMapper::new().to_string(), "PathMapper: (empty)");
        let m = PathMapper::from_lines(["-//depot/a/... //ws/a/..."]).unwrap();
        assert_eq!(m.to_string(), "PathMapper: \n\t-//depot/a/... //ws/a/...\n");
    }
}
