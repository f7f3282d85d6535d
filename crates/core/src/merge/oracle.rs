//! Line-diff oracle producing chunk statistics.
//!
//! [`DiffyOracle`] uses the `diffy` crate to diff base against each side
//! with no context lines, so every hunk is one changed region of base. Two
//! regions that touch the same base lines form a "both" chunk when they
//! make the same change and a conflict chunk otherwise.

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::data::ContentDigests;
use super::stats::ConflictStatistics;

/// Source of chunk statistics for a three-way merge.
///
/// `flags` is a diff flag string passed through from the caller.
pub trait DiffOracle {
    fn statistics(&self, base: &str, yours: &str, theirs: &str, flags: &str) -> ConflictStatistics;
}

/// One changed region of base.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Change {
    /// First base line (0-based).
    start: usize,
    /// One past the last base line; equal to `start` for pure insertions.
    end: usize,
    /// Replacement lines.
    lines: Vec<String>,
}

impl Change {
    fn touches(&self, lo: usize, hi: usize) -> bool {
        (self.start < hi && lo < self.end) || self.start == lo
    }
}

/// `diffy`-backed oracle.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffyOracle;

impl DiffyOracle {
    pub fn new() -> Self {
        Self
    }

    /// Merge the three texts, returning the output and whether it is clean.
    ///
    /// Conflicted output carries `<<<<<<<` / `=======` / `>>>>>>>` markers.
    pub fn merged_text(base: &str, yours: &str, theirs: &str) -> (String, bool) {
        match diffy::merge(base, yours, theirs) {
            Ok(merged) => (merged, true),
            Err(conflicted) => (conflicted, false),
        }
    }

    /// Digests of yours, theirs, and their merge.
    pub fn digests(base: &str, yours: &str, theirs: &str) -> ContentDigests {
        let (merged, _) = Self::merged_text(base, yours, theirs);
        ContentDigests {
            yours: sha256_hex(yours),
            theirs: sha256_hex(theirs),
            merged: sha256_hex(&merged),
        }
    }
}

impl DiffOracle for DiffyOracle {
    fn statistics(&self, base: &str, yours: &str, theirs: &str, flags: &str) -> ConflictStatistics {
        let ws = Whitespace::from_flags(flags);
        let mut stats = chunk_statistics(ws, base, yours, theirs);

        // The merged text is never normalized, so a conflict it carries must
        // show up in the statistics.
        if !stats.has_conflicts() && !Self::merged_text(base, yours, theirs).1 {
            if ws != Whitespace::Exact {
                stats = chunk_statistics(Whitespace::Exact, base, yours, theirs);
            }
            stats.conflict_chunks = stats.conflict_chunks.max(1);
            debug!(%stats, flags, "merged text conflicts; counting exact chunks");
        }

        info!(%stats, flags, "computed chunk statistics");
        stats
    }
}

fn chunk_statistics(ws: Whitespace, base: &str, yours: &str, theirs: &str) -> ConflictStatistics {
    let (base, yours, theirs) = (ws.normalize(base), ws.normalize(yours), ws.normalize(theirs));
    let ours = changes(&base, &yours);
    let their = changes(&base, &theirs);
    classify(&ours, &their)
}

/// Whitespace handling selected by diff flags (`b` or `w`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Whitespace {
    Exact,
    /// Runs of whitespace compare equal; trailing whitespace is ignored.
    IgnoreChanges,
    /// All whitespace is ignored.
    IgnoreAll,
}

impl Whitespace {
    fn from_flags(flags: &str) -> Self {
        if flags.contains('w') {
            Self::IgnoreAll
        } else if flags.contains('b') {
            Self::IgnoreChanges
        } else {
            Self::Exact
        }
    }

    fn normalize(self, text: &str) -> String {
        match self {
            Self::Exact => text.to_string(),
            Self::IgnoreChanges => text
                .lines()
                .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
                .map(|l| l + "\n")
                .collect(),
            Self::IgnoreAll => text
                .lines()
                .map(|l| l.chars().filter(|c| !c.is_whitespace()).collect::<String>())
                .map(|l| l + "\n")
                .collect(),
        }
    }
}

fn changes(base: &str, other: &str) -> Vec<Change> {
    let mut options = diffy::DiffOptions::new();
    options.set_context_len(0);
    let patch = options.create_patch(base, other);

    patch
        .hunks()
        .iter()
        .map(|hunk| {
            let old = hunk.old_range();
            let start = if old.len() == 0 {
                old.start()
            } else {
                old.start().saturating_sub(1)
            };
            let lines = hunk
                .lines()
                .iter()
                .filter_map(|line| match line {
                    diffy::Line::Insert(text) => Some(text.to_string()),
                    _ => None,
                })
                .collect();
            Change {
                start,
                end: start + old.len(),
                lines,
            }
        })
        .collect()
}

/// Sweep both change lists in base order and count chunks.
fn classify(ours: &[Change], theirs: &[Change]) -> ConflictStatistics {
    let mut stats = ConflictStatistics::default();
    let (mut i, mut j) = (0, 0);

    while i < ours.len() || j < theirs.len() {
        match (ours.get(i), theirs.get(j)) {
            (Some(o), Some(t)) if o.touches(t.start, t.end) || t.touches(o.start, o.end) => {
                // Grow the cluster until neither side touches it.
                let (mut lo, mut hi) = (o.start.min(t.start), o.end.max(t.end));
                let (first_i, first_j) = (i, j);
                i += 1;
                j += 1;
                loop {
                    if let Some(o) = ours.get(i).filter(|c| c.touches(lo, hi)) {
                        lo = lo.min(o.start);
                        hi = hi.max(o.end);
                        i += 1;
                    } else if let Some(t) = theirs.get(j).filter(|c| c.touches(lo, hi)) {
                        lo = lo.min(t.start);
                        hi = hi.max(t.end);
                        j += 1;
                    } else {
                        break;
                    }
                }

                if ours[first_i..i] == theirs[first_j..j] {
                    stats.both_chunks += 1;
                } else {
                    stats.conflict_chunks += 1;
                }
            }
            (Some(o), Some(t)) if o.start < t.start => {
                stats.your_chunks += 1;
                i += 1;
            }
            (Some(_), Some(_)) => {
                stats.their_chunks += 1;
                j += 1;
            }
            (Some(_), None) => {
                stats.your_chunks += 1;
                i += 1;
            }
            (None, Some(_)) => {
                stats.their_chunks += 1;
                j += 1;
            }
            (None, None) => break,
        }
    }

    debug!(ours = ours.len(), theirs = theirs.len(), "classified change regions");
    stats
}

fn sha256_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
