//! Auto-resolve policy, user decisions, and merge-tool delegation.
//!
//! [`MergeResolver`] is the single seam where resolve policy lives:
//!
//! | Condition (first match wins) | Hint |
//! |------------------------------|------|
//! | conflicting chunks, no force | `Edit` |
//! | conflicting chunks, force | `Merged` |
//! | only yours changed | `Yours` |
//! | only theirs changed | `Theirs` |
//! | anything else | `Merged` |

use tracing::{debug, info, warn};

use super::data::MergeFiles;
use super::stats::{ConflictStatistics, MergeAction, ResolveOutcome};
use crate::config::ResolveConfig;
use crate::errors::ResolveError;

// ---------------------------------------------------------------------------
// Tool invocation contract
// ---------------------------------------------------------------------------

/// Exit status reported by a [`ToolRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolExit {
    /// Exit code, if the tool exited normally.
    pub code: Option<i32>,
}

impl ToolExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Process-invocation collaborator.
///
/// Implementations block until the tool exits. An `Err` means the tool
/// could not be started at all.
pub trait ToolRunner {
    fn run(&self, command: &str, args: &[String]) -> Result<ToolExit, ResolveError>;
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolve policy for one or more sessions.
#[derive(Debug, Clone)]
pub struct MergeResolver {
    /// Accept merged output even when it contains conflicts.
    force: bool,
    /// Ask for a decision when the hint is `Edit`.
    interactive: bool,
    /// Launch the merge tool after an `Edit` decision.
    tool_on_edit: bool,
    /// Merge tool command line.
    merge_tool: Option<String>,
}

impl Default for MergeResolver {
    fn default() -> Self {
        Self {
            force: false,
            interactive: true,
            tool_on_edit: true,
            merge_tool: None,
        }
    }
}

impl MergeResolver {
    pub fn new(force: bool, interactive: bool) -> Self {
        Self {
            force,
            interactive,
            ..Self::default()
        }
    }

    /// Build a resolver from the `[resolve]` config section.
    ///
    /// The merge tool comes from the already-resolved configuration.
    pub fn from_config(config: &ResolveConfig) -> Self {
        Self {
            force: config.force,
            interactive: config.interactive,
            tool_on_edit: config.tool_on_edit,
            merge_tool: config.effective_merge_tool().map(str::to_string),
        }
    }

    pub fn with_merge_tool(mut self, command: impl Into<String>) -> Self {
        self.merge_tool = Some(command.into());
        self
    }

    pub fn with_tool_on_edit(mut self, enabled: bool) -> Self {
        self.tool_on_edit = enabled;
        self
    }

    pub fn force(&self) -> bool {
        self.force
    }

    pub fn interactive(&self) -> bool {
        self.interactive
    }

    pub fn tool_on_edit(&self) -> bool {
        self.tool_on_edit
    }

    pub fn merge_tool(&self) -> Option<&str> {
        self.merge_tool.as_deref()
    }

    /// Compute the auto-resolve hint for `stats`. Total over all inputs.
    pub fn classify_auto_resolve(stats: &ConflictStatistics, force: bool) -> ResolveOutcome {
        if stats.conflict_chunks > 0 {
            return if force {
                ResolveOutcome::Merged
            } else {
                ResolveOutcome::Edit
            };
        }

        match (stats.your_chunks > 0, stats.their_chunks > 0) {
            (true, false) => ResolveOutcome::Yours,
            (false, true) => ResolveOutcome::Theirs,
            _ => ResolveOutcome::Merged,
        }
    }

    /// The hint under this resolver's force policy.
    pub fn auto_resolve_hint(&self, stats: &ConflictStatistics) -> ResolveOutcome {
        Self::classify_auto_resolve(stats, self.force)
    }

    /// Map an explicit user decision to an outcome.
    pub fn resolve_interactive(stats: &ConflictStatistics, decision: MergeAction) -> ResolveOutcome {
        let outcome = match decision {
            MergeAction::AcceptMerged => ResolveOutcome::Merged,
            MergeAction::AcceptEdited => ResolveOutcome::Edit,
            MergeAction::AcceptTheirs => ResolveOutcome::Theirs,
            MergeAction::AcceptYours => ResolveOutcome::Yours,
            MergeAction::Skip => ResolveOutcome::Skip,
            MergeAction::Quit => ResolveOutcome::Quit,
        };
        debug!(%stats, %decision, %outcome, "user decision");
        outcome
    }

    /// Run the merge tool on `files`; `true` when it reported success.
    pub fn invoke_external_merge_tool(&self, runner: &dyn ToolRunner, files: &MergeFiles) -> bool {
        match self.run_merge_tool(runner, files) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "merge tool did not succeed");
                false
            }
        }
    }

    /// Run the merge tool on `files`, reporting why it failed.
    ///
    /// Arguments are passed as base, theirs, yours, result.
    pub fn run_merge_tool(&self, runner: &dyn ToolRunner, files: &MergeFiles) -> Result<(), ResolveError> {
        let tool = self.merge_tool.as_deref().ok_or(ResolveError::NoMergeTool)?;
        let args = files.tool_args();

        info!(tool, result = %files.result.display(), "invoking merge tool");
        let exit = runner.run(tool, &args)?;

        if exit.success() {
            info!(tool, "merge tool finished");
            Ok(())
        } else {
            Err(ResolveError::ExternalToolFailure {
                tool: tool.to_string(),
                detail: match exit.code {
                    Some(code) => format!("exit code {}", code),
                    None => "terminated by signal".into(),
                },
            })
        }
    }
}
