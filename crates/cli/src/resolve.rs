//! `depotview resolve`: three-way resolve of one file.
//!
//! Reads base/yours/theirs, computes chunk statistics, drives a
//! [`MergeSession`], and writes the chosen content to the result file.
//!
//! The merge and any tool edits happen in a staging file next to the
//! result. The result file is only replaced once an outcome that produces
//! content is reached, so Skip, Quit, and failures leave it untouched.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use clap::Args;
use dialoguer::{Input, Password};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use depotview_core::callbacks::{prompt_for_action, ClientUserCallbacks, StatRecord};
use depotview_core::config::AppConfig;
use depotview_core::errors::ResolveError;
use depotview_core::merge::{
    DiffOracle, DiffyOracle, MergeAction, MergeData, MergeFiles, MergeNames, MergeResolver,
    MergeSession, ResolveOutcome, SessionReport, ToolExit, ToolRunner,
};

use crate::style;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Common ancestor.
    #[arg(long)]
    pub base: PathBuf,

    /// Your version.
    #[arg(long)]
    pub yours: PathBuf,

    /// Their version.
    #[arg(long)]
    pub theirs: PathBuf,

    /// Where to write the result (default: `<yours>.result`).
    #[arg(long)]
    pub result: Option<PathBuf>,

    /// Accept merged output even when it has conflicts.
    #[arg(short, long)]
    pub force: bool,

    /// Never prompt; accept the auto-resolve hint.
    #[arg(long)]
    pub non_interactive: bool,

    /// Answer the prompt up front: am, ae, at, ay, s, or q.
    #[arg(short, long)]
    pub action: Option<String>,

    /// Diff flags, e.g. `-db` or `-dw`.
    #[arg(long)]
    pub diff_flags: Option<String>,

    /// Print the session report as JSON.
    #[arg(long)]
    pub json: bool,
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

/// Terminal callbacks backed by `dialoguer`.
struct TerminalCallbacks {
    preset: Option<MergeAction>,
    quiet: bool,
}

impl ClientUserCallbacks for TerminalCallbacks {
    fn prompt(&mut self, message: &str, no_echo: bool) -> Result<String, ResolveError> {
        let message = message.trim_end().trim_end_matches(':');
        let response = if no_echo {
            Password::new()
                .with_prompt(message)
                .allow_empty_password(true)
                .interact()
        } else {
            Input::<String>::new()
                .with_prompt(message)
                .allow_empty(true)
                .interact_text()
        };
        response.map_err(|e| ResolveError::PromptFailed(e.to_string()))
    }

    fn output_info(&mut self, text: &str) {
        if !self.quiet {
            println!("{}", text);
        }
    }

    fn output_error(&mut self, text: &str) {
        eprintln!("{}", style::error(text));
    }

    fn output_stat(&mut self, record: &StatRecord) {
        if self.quiet {
            return;
        }
        for (key, value) in record.iter() {
            println!("  {:<15}: {}", key, value);
        }
    }

    fn resolve(&mut self, data: &MergeData) -> Result<MergeAction, ResolveError> {
        match self.preset {
            Some(action) => Ok(action),
            None => prompt_for_action(self, data),
        }
    }
}

// ---------------------------------------------------------------------------
// Process runner
// ---------------------------------------------------------------------------

/// Runs the merge tool as a child process and waits for it.
///
/// The command string may carry leading arguments (`"meld --auto-merge"`);
/// they are passed before the four file paths.
struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, command: &str, args: &[String]) -> Result<ToolExit, ResolveError> {
        let mut words = command.split_whitespace();
        let program = words.next().ok_or(ResolveError::NoMergeTool)?;

        let status = Command::new(program)
            .args(words)
            .args(args)
            .status()
            .map_err(|e| ResolveError::ExternalToolFailure {
                tool: command.to_string(),
                detail: e.to_string(),
            })?;

        Ok(ToolExit {
            code: status.code(),
        })
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// Resolve one file.
pub fn run_resolve(config: &AppConfig, args: ResolveArgs) -> Result<()> {
    let base = read(&args.base)?;
    let yours = read(&args.yours)?;
    let theirs = read(&args.theirs)?;
    let result_path = args
        .result
        .clone()
        .unwrap_or_else(|| default_result_path(&args.yours));

    let preset = args
        .action
        .as_deref()
        .map(str::parse::<MergeAction>)
        .transpose()
        .context("invalid --action")?;

    let mut resolve_config = config.resolve.clone();
    resolve_config.force |= args.force;
    if args.non_interactive {
        resolve_config.interactive = false;
    }
    let flags = args
        .diff_flags
        .clone()
        .unwrap_or_else(|| resolve_config.diff_flags.clone());
    let resolver = MergeResolver::from_config(&resolve_config);

    let stats = DiffyOracle::new().statistics(&base, &yours, &theirs, &flags);
    let (merged, clean) = DiffyOracle::merged_text(&base, &yours, &theirs);

    // The merge tool edits the staged result in place, so it starts out
    // holding the merge (with conflict markers when there are conflicts).
    let staged = stage_merged(&result_path, &merged)?;

    let names = MergeNames {
        base: Some(args.base.display().to_string()),
        yours: Some(args.yours.display().to_string()),
        theirs: Some(args.theirs.display().to_string()),
    };
    let files = MergeFiles {
        base: args.base.clone(),
        yours: args.yours.clone(),
        theirs: args.theirs.clone(),
        result: staged.path().to_path_buf(),
    };
    let mut data = MergeData::new(names, files, stats, &resolver)
        .with_digests(DiffyOracle::digests(&base, &yours, &theirs));

    let mut callbacks = TerminalCallbacks {
        preset,
        quiet: args.json,
    };
    let report = MergeSession::run(
        &resolver,
        &mut data,
        &mut callbacks,
        Some(&ProcessRunner as &dyn ToolRunner),
    )
    .context("resolve session failed")?;

    let tool_failed = report.tool_succeeded == Some(false);
    let written = match report.outcome {
        ResolveOutcome::Merged | ResolveOutcome::Edit if !tool_failed => {
            commit(staged, &result_path)?;
            true
        }
        ResolveOutcome::Yours => {
            write(&result_path, &yours)?;
            true
        }
        ResolveOutcome::Theirs => {
            write(&result_path, &theirs)?;
            true
        }
        _ => false,
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize report")?
        );
    } else {
        print_summary(&report, &result_path, written, clean);
    }

    if tool_failed {
        anyhow::bail!(
            "merge tool failed: {}",
            report.tool_error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

/// Write `merged` to a temporary file in the result's directory.
fn stage_merged(result: &Path, merged: &str) -> Result<NamedTempFile> {
    let dir = match result.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let staged = tempfile::Builder::new()
        .prefix(".depotview-")
        .suffix(".merge")
        .tempfile_in(dir)
        .with_context(|| format!("failed to create staging file in {}", dir.display()))?;
    write(staged.path(), merged)?;
    debug!(staged = %staged.path().display(), result = %result.display(), "staged merge result");
    Ok(staged)
}

/// Move the staged result over `result`.
fn commit(staged: NamedTempFile, result: &Path) -> Result<()> {
    staged
        .persist(result)
        .map_err(|e| {
            warn!(result = %result.display(), error = %e.error, "failed to commit merge result");
            e.error
        })
        .with_context(|| format!("failed to write {}", result.display()))?;
    Ok(())
}

fn print_summary(report: &SessionReport, result: &Path, written: bool, clean: bool) {
    println!();
    println!("Outcome: {}", style::outcome(report.outcome));
    match report.outcome {
        _ if !written => {
            println!("{}", style::dim("Result not written."));
        }
        ResolveOutcome::Merged if !clean => {
            println!(
                "{}",
                style::warn(&format!(
                    "{} contains conflict markers",
                    result.display()
                ))
            );
        }
        _ => {
            println!(
                "{}",
                style::success(&format!("Result written to {}", result.display()))
            );
        }
    }
}

fn default_result_path(yours: &Path) -> PathBuf {
    let mut name = yours.as_os_str().to_owned();
    name.push(".result");
    PathBuf::from(name)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
