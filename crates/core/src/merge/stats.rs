//! Chunk statistics and resolution vocabulary.
//!
//! A three-way diff of base/yours/theirs is summarized as counts of chunks
//! changed only in yours, only in theirs, identically in both, or
//! differently in both. A resolve session ends with one [`ResolveOutcome`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ResolveError;

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Chunk counts from a three-way diff.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictStatistics {
    /// Chunks changed only in yours.
    pub your_chunks: u32,
    /// Chunks changed only in theirs.
    pub their_chunks: u32,
    /// Chunks changed identically in both.
    pub both_chunks: u32,
    /// Chunks changed differently in both.
    pub conflict_chunks: u32,
}

impl ConflictStatistics {
    pub fn new(your_chunks: u32, their_chunks: u32, both_chunks: u32, conflict_chunks: u32) -> Self {
        Self {
            your_chunks,
            their_chunks,
            both_chunks,
            conflict_chunks,
        }
    }

    pub fn has_conflicts(&self) -> bool {
        self.conflict_chunks > 0
    }

    /// Total number of chunks of any kind.
    pub fn total(&self) -> u32 {
        self.your_chunks
            .saturating_add(self.their_chunks)
            .saturating_add(self.both_chunks)
            .saturating_add(self.conflict_chunks)
    }
}

impl std::fmt::Display for ConflictStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Diff chunks: {} yours + {} theirs + {} both + {} conflicting",
            self.your_chunks, self.their_chunks, self.both_chunks, self.conflict_chunks
        )
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Terminal decision of a resolve session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResolveOutcome {
    /// Stop resolving altogether.
    Quit,
    /// Leave this file unresolved.
    Skip,
    /// Accept the merged file as produced.
    Merged,
    /// Accept the result file after it has been edited.
    Edit,
    /// Accept their file.
    Theirs,
    /// Accept your file.
    Yours,
}

impl std::fmt::Display for ResolveOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quit => write!(f, "quit"),
            Self::Skip => write!(f, "skip"),
            Self::Merged => write!(f, "merged"),
            Self::Edit => write!(f, "edit"),
            Self::Theirs => write!(f, "theirs"),
            Self::Yours => write!(f, "yours"),
        }
    }
}

// ---------------------------------------------------------------------------
// User choices
// ---------------------------------------------------------------------------

/// Choices offered to the user (or an automated policy) for one file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MergeAction {
    AcceptMerged,
    AcceptEdited,
    AcceptTheirs,
    AcceptYours,
    Skip,
    Quit,
}

impl MergeAction {
    /// The menu choice that selects `outcome`.
    pub fn for_outcome(outcome: ResolveOutcome) -> Self {
        match outcome {
            ResolveOutcome::Quit => Self::Quit,
            ResolveOutcome::Skip => Self::Skip,
            ResolveOutcome::Merged => Self::AcceptMerged,
            ResolveOutcome::Edit => Self::AcceptEdited,
            ResolveOutcome::Theirs => Self::AcceptTheirs,
            ResolveOutcome::Yours => Self::AcceptYours,
        }
    }

    /// Short key used in prompts.
    pub fn key(&self) -> &'static str {
        match self {
            Self::AcceptMerged => "am",
            Self::AcceptEdited => "ae",
            Self::AcceptTheirs => "at",
            Self::AcceptYours => "ay",
            Self::Skip => "s",
            Self::Quit => "q",
        }
    }
}

impl std::fmt::Display for MergeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AcceptMerged => write!(f, "accept merged"),
            Self::AcceptEdited => write!(f, "accept edited"),
            Self::AcceptTheirs => write!(f, "accept theirs"),
            Self::AcceptYours => write!(f, "accept yours"),
            Self::Skip => write!(f, "skip"),
            Self::Quit => write!(f, "quit"),
        }
    }
}

impl FromStr for MergeAction {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "am" | "merged" | "accept-merged" => Ok(Self::AcceptMerged),
            "ae" | "edit" | "edited" | "accept-edited" => Ok(Self::AcceptEdited),
            "at" | "theirs" | "accept-theirs" => Ok(Self::AcceptTheirs),
            "ay" | "yours" | "accept-yours" => Ok(Self::AcceptYours),
            "s" | "skip" => Ok(Self::Skip),
            "q" | "quit" => Ok(Self::Quit),
            other => Err(ResolveError::UnknownAction(other.to_string())),
        }
    }
}
