//! End-to-end tests for merge resolution.
//!
//! Each test writes base/yours/theirs files to a temp directory, computes
//! statistics with the diff oracle, and drives a full resolve session with
//! scripted callbacks and a fake merge tool that edits the result file.

use std::cell::RefCell;
use std::path::Path;

use tempfile::TempDir;

use depotview_core::callbacks::{ClientUserCallbacks, StatRecord};
use depotview_core::config::AppConfig;
use depotview_core::errors::ResolveError;
use depotview_core::merge::{
    DiffOracle, DiffyOracle, MergeData, MergeFiles, MergeNames, MergeResolver, MergeSession,
    ResolveOutcome, SessionState, ToolExit, ToolRunner,
};

// ===========================================================================
// Helpers
// ===========================================================================

const BASE: &str = "fn main() {\n    let x = 1;\n    println!(\"{}\", x);\n}\n";

struct Fixture {
    _dir: TempDir,
    files: MergeFiles,
}

fn fixture(yours: &str, theirs: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = |name: &str| dir.path().join(name);
    std::fs::write(path("main.rs.base"), BASE).unwrap();
    std::fs::write(path("main.rs"), yours).unwrap();
    std::fs::write(path("main.rs.theirs"), theirs).unwrap();

    let files = MergeFiles {
        base: path("main.rs.base"),
        yours: path("main.rs"),
        theirs: path("main.rs.theirs"),
        result: path("main.rs.result"),
    };
    Fixture { _dir: dir, files }
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

fn merge_data(files: &MergeFiles, force: bool) -> MergeData {
    let (base, yours, theirs) = (read(&files.base), read(&files.yours), read(&files.theirs));
    let stats = DiffyOracle::new().statistics(&base, &yours, &theirs, "");
    let names = MergeNames {
        base: Some("//depot/main/main.rs#4".into()),
        yours: Some("//ws/main/main.rs".into()),
        theirs: Some("//depot/main/main.rs#6".into()),
    };
    MergeData::new(names, files.clone(), stats, &MergeResolver::new(force, true))
        .with_digests(DiffyOracle::digests(&base, &yours, &theirs))
}

/// Scripted user answering prompts in order.
#[derive(Default)]
struct ScriptedUser {
    answers: Vec<String>,
    prompts: Vec<String>,
    info: Vec<String>,
    errors: Vec<String>,
    stats: Vec<StatRecord>,
}

impl ClientUserCallbacks for ScriptedUser {
    fn prompt(&mut self, message: &str, _no_echo: bool) -> Result<String, ResolveError> {
        self.prompts.push(message.to_string());
        if self.answers.is_empty() {
            return Err(ResolveError::PromptFailed("no more answers".into()));
        }
        Ok(self.answers.remove(0))
    }

    fn output_info(&mut self, text: &str) {
        self.info.push(text.to_string());
    }

    fn output_error(&mut self, text: &str) {
        self.errors.push(text.to_string());
    }

    fn output_stat(&mut self, record: &StatRecord) {
        self.stats.push(record.clone());
    }
}

/// Merge tool that writes fixed content to the result file.
struct EditingTool {
    content: &'static str,
    code: i32,
    calls: RefCell<Vec<Vec<String>>>,
}

impl ToolRunner for EditingTool {
    fn run(&self, _command: &str, args: &[String]) -> Result<ToolExit, ResolveError> {
        self.calls.borrow_mut().push(args.to_vec());
        if let Some(result) = args.get(3) {
            std::fs::write(result, self.content).map_err(|e| ResolveError::ExternalToolFailure {
                tool: "editing-tool".into(),
                detail: e.to_string(),
            })?;
        }
        Ok(ToolExit {
            code: Some(self.code),
        })
    }
}

fn conflicting() -> Fixture {
    fixture(
        "fn main() {\n    let x = 2;\n    println!(\"{}\", x);\n}\n",
        "fn main() {\n    let x = 3;\n    println!(\"{}\", x);\n}\n",
    )
}

// ===========================================================================
// Tests
// ===========================================================================

#[test]
fn test_only_their_change_auto_resolves_to_theirs() {
    let fx = fixture(BASE, "fn main() {\n    let x = 1;\n    println!(\"x = {}\", x);\n}\n");
    let mut data = merge_data(&fx.files, false);
    let resolver = MergeResolver::new(false, true);
    let mut user = ScriptedUser::default();

    let report = MergeSession::run(&resolver, &mut data, &mut user, None).unwrap();

    assert_eq!(report.outcome, ResolveOutcome::Theirs);
    assert!(user.prompts.is_empty());
    assert_eq!(
        user.info,
        vec!["Diff chunks: 0 yours + 1 theirs + 0 both + 0 conflicting"]
    );
    let record = &user.stats[0];
    assert_eq!(record.get("yourName"), Some("//ws/main/main.rs"));
    assert_eq!(record.get("hint"), Some("theirs"));
    assert!(data.is_released());
}

#[test]
fn test_conflict_prompts_and_accepts_edit_with_tool() {
    let fx = conflicting();
    let mut data = merge_data(&fx.files, false);
    let resolver = MergeResolver::new(false, true).with_merge_tool("p4merge");
    let tool = EditingTool {
        content: "fn main() {\n    let x = 5;\n    println!(\"{}\", x);\n}\n",
        code: 0,
        calls: RefCell::new(Vec::new()),
    };
    let mut user = ScriptedUser {
        answers: vec![String::new()],
        ..ScriptedUser::default()
    };

    let report = MergeSession::run(&resolver, &mut data, &mut user, Some(&tool)).unwrap();

    // Empty answer accepts the suggested "ae".
    assert!(user.prompts[0].ends_with("[ae]: "));
    assert_eq!(report.hint, ResolveOutcome::Edit);
    assert_eq!(report.outcome, ResolveOutcome::Edit);
    assert_eq!(report.tool_succeeded, Some(true));
    assert_eq!(
        report.history.last(),
        Some(&SessionState::Done(ResolveOutcome::Edit))
    );

    let calls = tool.calls.borrow();
    let expected: Vec<String> = [
        &fx.files.base,
        &fx.files.theirs,
        &fx.files.yours,
        &fx.files.result,
    ]
    .iter()
    .map(|p| p.display().to_string())
    .collect();
    assert_eq!(calls[0], expected);
    assert!(read(&fx.files.result).contains("let x = 5;"));
}

#[test]
fn test_force_accepts_merge_with_conflicts() {
    let fx = conflicting();
    let mut data = merge_data(&fx.files, true);
    let resolver = MergeResolver::new(true, true);
    let mut user = ScriptedUser::default();

    let report = MergeSession::run(&resolver, &mut data, &mut user, None).unwrap();
    assert_eq!(report.outcome, ResolveOutcome::Merged);
    assert!(user.prompts.is_empty());

    let (merged, clean) = DiffyOracle::merged_text(
        &read(&fx.files.base),
        &read(&fx.files.yours),
        &read(&fx.files.theirs),
    );
    assert!(!clean);
    assert!(merged.contains("let x = 2;"));
    assert!(merged.contains("let x = 3;"));
}

#[test]
fn test_closed_prompt_quits_without_tool() {
    let fx = conflicting();
    let mut data = merge_data(&fx.files, false);
    let resolver = MergeResolver::new(false, true).with_merge_tool("p4merge");
    let tool = EditingTool {
        content: "",
        code: 0,
        calls: RefCell::new(Vec::new()),
    };
    let mut user = ScriptedUser::default();

    let report = MergeSession::run(&resolver, &mut data, &mut user, Some(&tool)).unwrap();
    assert_eq!(report.outcome, ResolveOutcome::Quit);
    assert_eq!(user.errors.len(), 1);
    assert!(tool.calls.borrow().is_empty());
    assert!(!fx.files.result.exists());
}

#[test]
fn test_failing_tool_is_reported() {
    let fx = conflicting();
    let mut data = merge_data(&fx.files, false);
    let resolver = MergeResolver::new(false, false).with_merge_tool("p4merge");
    let tool = EditingTool {
        content: "partial\n",
        code: 3,
        calls: RefCell::new(Vec::new()),
    };
    let mut user = ScriptedUser::default();

    let report = MergeSession::run(&resolver, &mut data, &mut user, Some(&tool)).unwrap();
    assert_eq!(report.tool_succeeded, Some(false));
    assert!(user.errors[0].contains("exit code 3"));
    assert!(report
        .history
        .contains(&SessionState::ToolInvoked {
            outcome: ResolveOutcome::Edit,
            success: false
        }));
}

#[test]
fn test_resolver_from_config_uses_environment_tool() {
    let mut config: AppConfig = toml::from_str("[resolve]\ninteractive = false\n").unwrap();
    config
        .resolve_env_with(|name| (name == "MERGE").then(|| "meld".to_string()))
        .unwrap();

    let resolver = MergeResolver::from_config(&config.resolve);
    assert!(!resolver.interactive());
    assert_eq!(resolver.merge_tool(), Some("meld"));

    let fx = conflicting();
    let mut data = merge_data(&fx.files, resolver.force());
    let tool = EditingTool {
        content: "done\n",
        code: 0,
        calls: RefCell::new(Vec::new()),
    };
    let mut user = ScriptedUser::default();
    let report = MergeSession::run(&resolver, &mut data, &mut user, Some(&tool)).unwrap();
    assert_eq!(report.outcome, ResolveOutcome::Edit);
    assert_eq!(read(&fx.files.result), "done\n");
}

#[test]
fn test_digests_identify_inputs() {
    let fx = fixture(BASE, BASE);
    let data = merge_data(&fx.files, false);
    let digests = data.digests().unwrap().cloned().unwrap();
    assert_eq!(digests.yours, digests.theirs);
    assert_eq!(digests.yours, digests.merged);
    assert_eq!(data.hint().unwrap(), ResolveOutcome::Merged);

    let json = serde_json::to_value(&digests).unwrap();
    assert_eq!(json["yours"].as_str().map(str::len), Some(64));
}
