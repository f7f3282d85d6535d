//! Per-file merge information handed to resolve callbacks.
//!
//! [`MergeData`] is created once per resolve session. Its hint is computed
//! at construction and never changes. After [`MergeData::release`] every
//! accessor fails with [`ResolveError::UseAfterRelease`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::resolver::{MergeResolver, ToolRunner};
use super::stats::{ConflictStatistics, ResolveOutcome};
use crate::callbacks::StatRecord;
use crate::errors::ResolveError;

/// The four files involved in a three-way merge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MergeFiles {
    pub base: PathBuf,
    pub yours: PathBuf,
    pub theirs: PathBuf,
    /// Where the merged result is written.
    pub result: PathBuf,
}

impl MergeFiles {
    /// Merge tool argument order: base, theirs, yours, result.
    pub fn tool_args(&self) -> Vec<String> {
        [&self.base, &self.theirs, &self.yours, &self.result]
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    }
}

/// Depot names of the merge inputs, e.g. `//depot/main/a.c#3`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MergeNames {
    pub base: Option<String>,
    pub yours: Option<String>,
    pub theirs: Option<String>,
}

/// Content digests (hex SHA-256) of the merge inputs and output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentDigests {
    pub yours: String,
    pub theirs: String,
    pub merged: String,
}

/// Merge information for one file.
#[derive(Debug)]
pub struct MergeData {
    id: String,
    names: MergeNames,
    files: MergeFiles,
    stats: ConflictStatistics,
    digests: Option<ContentDigests>,
    hint: ResolveOutcome,
    force: bool,
    released: bool,
}

impl MergeData {
    /// Create merge data; the hint is classified under the resolver's policy.
    pub fn new(names: MergeNames, files: MergeFiles, stats: ConflictStatistics, resolver: &MergeResolver) -> Self {
        let hint = resolver.auto_resolve_hint(&stats);
        let id = Uuid::new_v4().to_string();
        debug!(id = %id, %stats, %hint, "created merge data");
        Self {
            id,
            names,
            files,
            stats,
            digests: None,
            hint,
            force: resolver.force(),
            released: false,
        }
    }

    pub fn with_digests(mut self, digests: ContentDigests) -> Self {
        self.digests = Some(digests);
        self
    }

    fn guard(&self, what: &'static str) -> Result<(), ResolveError> {
        if self.released {
            Err(ResolveError::UseAfterRelease { what })
        } else {
            Ok(())
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn names(&self) -> Result<&MergeNames, ResolveError> {
        self.guard("merge names")?;
        Ok(&self.names)
    }

    pub fn files(&self) -> Result<&MergeFiles, ResolveError> {
        self.guard("merge files")?;
        Ok(&self.files)
    }

    pub fn statistics(&self) -> Result<ConflictStatistics, ResolveError> {
        self.guard("chunk statistics")?;
        Ok(self.stats)
    }

    pub fn digests(&self) -> Result<Option<&ContentDigests>, ResolveError> {
        self.guard("content digests")?;
        Ok(self.digests.as_ref())
    }

    /// The auto-resolve hint.
    pub fn hint(&self) -> Result<ResolveOutcome, ResolveError> {
        self.guard("merge hint")?;
        Ok(self.hint)
    }

    /// Whether the hint was classified with `force`.
    pub fn forced(&self) -> Result<bool, ResolveError> {
        self.guard("force policy")?;
        Ok(self.force)
    }

    /// Run the resolver's merge tool over these files.
    pub fn run_merge_tool(&self, resolver: &MergeResolver, runner: &dyn ToolRunner) -> Result<bool, ResolveError> {
        self.guard("merge tool")?;
        Ok(resolver.invoke_external_merge_tool(runner, &self.files))
    }

    /// Tagged summary of this merge, in a stable field order.
    pub fn stat_record(&self) -> Result<StatRecord, ResolveError> {
        self.guard("stat record")?;
        let mut record = StatRecord::new();
        let names = [
            ("baseName", &self.names.base),
            ("yourName", &self.names.yours),
            ("theirName", &self.names.theirs),
        ];
        for (key, value) in names {
            if let Some(value) = value {
                record.insert(key, value.as_str());
            }
        }
        record.insert("yourChunks", self.stats.your_chunks.to_string());
        record.insert("theirChunks", self.stats.their_chunks.to_string());
        record.insert("bothChunks", self.stats.both_chunks.to_string());
        record.insert("conflictChunks", self.stats.conflict_chunks.to_string());
        record.insert("hint", self.hint.to_string());
        Ok(record)
    }

    /// Release the data; later accesses fail.
    pub fn release(&mut self) {
        if !self.released {
            debug!(id = %self.id, "released merge data");
        }
        self.released = true;
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}
