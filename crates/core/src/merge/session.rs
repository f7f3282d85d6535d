//! Per-file resolve session.
//!
//! A session walks one [`MergeData`] through
//! `Start -> AutoResolved | AwaitingDecision -> Resolved -> [ToolInvoked] -> Done`.
//! The individual transitions are public so callers can drive a session by
//! hand; [`MergeSession::run`] drives the whole thing against a set of
//! callbacks and always releases the merge data before returning.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::data::MergeData;
use super::resolver::{MergeResolver, ToolRunner};
use super::stats::{MergeAction, ResolveOutcome};
use crate::callbacks::ClientUserCallbacks;
use crate::errors::ResolveError;

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Start,
    /// The hint was accepted without asking anyone.
    AutoResolved(ResolveOutcome),
    /// Waiting for an explicit decision.
    AwaitingDecision,
    Resolved(ResolveOutcome),
    /// The merge tool ran on an `Edit` outcome.
    ToolInvoked { outcome: ResolveOutcome, success: bool },
    Done(ResolveOutcome),
}

impl SessionState {
    /// The fixed outcome, once there is one.
    pub fn outcome(&self) -> Option<ResolveOutcome> {
        match self {
            Self::Start | Self::AwaitingDecision => None,
            Self::AutoResolved(o) | Self::Resolved(o) | Self::Done(o) => Some(*o),
            Self::ToolInvoked { outcome, .. } => Some(*outcome),
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::AutoResolved(o) => write!(f, "auto_resolved({})", o),
            Self::AwaitingDecision => write!(f, "awaiting_decision"),
            Self::Resolved(o) => write!(f, "resolved({})", o),
            Self::ToolInvoked { outcome, success } => {
                write!(f, "tool_invoked({}, success={})", outcome, success)
            }
            Self::Done(o) => write!(f, "done({})", o),
        }
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    /// Merge data id.
    pub id: String,
    pub hint: ResolveOutcome,
    pub outcome: ResolveOutcome,
    /// `None` when no merge tool was run.
    pub tool_succeeded: Option<bool>,
    /// Why the merge tool failed, if it did.
    pub tool_error: Option<String>,
    pub resolved_at: DateTime<Utc>,
    /// Every state visited, starting with `Start`.
    pub history: Vec<SessionState>,
}

/// Resolve state machine for one file.
#[derive(Debug)]
pub struct MergeSession {
    id: String,
    hint: ResolveOutcome,
    state: SessionState,
    history: Vec<SessionState>,
    tool_error: Option<String>,
}

impl MergeSession {
    /// Start a session over `data`.
    pub fn new(data: &MergeData) -> Result<Self, ResolveError> {
        Ok(Self {
            id: data.id().to_string(),
            hint: data.hint()?,
            state: SessionState::Start,
            history: vec![SessionState::Start],
            tool_error: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn hint(&self) -> ResolveOutcome {
        self.hint
    }

    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    fn transition(&mut self, next: SessionState) {
        info!(id = %self.id, from = %self.state, to = %next, "resolve transition");
        self.state = next;
        self.history.push(next);
    }

    fn invalid(&self, to: &str) -> ResolveError {
        ResolveError::InvalidTransition {
            from: self.state.to_string(),
            to: to.to_string(),
        }
    }

    /// Leave `Start`: an `Edit` hint waits for a decision when `interactive`,
    /// every other case is auto-resolved to the hint.
    pub fn begin(&mut self, interactive: bool) -> Result<SessionState, ResolveError> {
        if self.state != SessionState::Start {
            return Err(self.invalid("begin"));
        }
        let next = if self.hint == ResolveOutcome::Edit && interactive {
            SessionState::AwaitingDecision
        } else {
            SessionState::AutoResolved(self.hint)
        };
        self.transition(next);
        Ok(next)
    }

    /// Fix the auto-resolved hint as the outcome.
    pub fn accept_hint(&mut self) -> Result<ResolveOutcome, ResolveError> {
        match self.state {
            SessionState::AutoResolved(outcome) => {
                self.transition(SessionState::Resolved(outcome));
                Ok(outcome)
            }
            _ => Err(self.invalid("resolved")),
        }
    }

    /// Fix an explicit decision as the outcome.
    pub fn decide(&mut self, data: &MergeData, action: MergeAction) -> Result<ResolveOutcome, ResolveError> {
        if self.state != SessionState::AwaitingDecision {
            return Err(self.invalid("resolved"));
        }
        let outcome = MergeResolver::resolve_interactive(&data.statistics()?, action);
        self.transition(SessionState::Resolved(outcome));
        Ok(outcome)
    }

    /// Run the merge tool. Only valid from `Resolved(Edit)`.
    ///
    /// Returns whether the tool succeeded; a failure is kept for the report.
    pub fn invoke_tool(
        &mut self,
        resolver: &MergeResolver,
        data: &MergeData,
        runner: &dyn ToolRunner,
    ) -> Result<bool, ResolveError> {
        if self.state != SessionState::Resolved(ResolveOutcome::Edit) {
            return Err(self.invalid("tool_invoked"));
        }
        let success = match resolver.run_merge_tool(runner, data.files()?) {
            Ok(()) => true,
            Err(e) => {
                warn!(id = %self.id, error = %e, "merge tool failed");
                self.tool_error = Some(e.to_string());
                false
            }
        };
        self.transition(SessionState::ToolInvoked {
            outcome: ResolveOutcome::Edit,
            success,
        });
        Ok(success)
    }

    /// Enter `Done` and produce the report.
    ///
    /// An auto-resolved session is resolved to its hint on the way.
    pub fn finish(mut self) -> Result<SessionReport, ResolveError> {
        if let SessionState::AutoResolved(_) = self.state {
            self.accept_hint()?;
        }
        let (outcome, tool_succeeded) = match self.state {
            SessionState::Resolved(outcome) => (outcome, None),
            SessionState::ToolInvoked { outcome, success } => (outcome, Some(success)),
            _ => return Err(self.invalid("done")),
        };
        self.transition(SessionState::Done(outcome));

        Ok(SessionReport {
            id: self.id,
            hint: self.hint,
            outcome,
            tool_succeeded,
            tool_error: self.tool_error,
            resolved_at: Utc::now(),
            history: self.history,
        })
    }

    /// Drive a full session and release `data` on every exit path.
    ///
    /// `data` must have been built with the same force policy as `resolver`.
    ///
    /// A failing `resolve` callback counts as `Quit` and is reported through
    /// `output_error`. The merge tool runs after an `Edit` outcome when the
    /// resolver allows it and a runner is given.
    pub fn run(
        resolver: &MergeResolver,
        data: &mut MergeData,
        callbacks: &mut dyn ClientUserCallbacks,
        runner: Option<&dyn ToolRunner>,
    ) -> Result<SessionReport, ResolveError> {
        let result = Self::drive(resolver, data, callbacks, runner);
        data.release();
        result
    }

    fn drive(
        resolver: &MergeResolver,
        data: &MergeData,
        callbacks: &mut dyn ClientUserCallbacks,
        runner: Option<&dyn ToolRunner>,
    ) -> Result<SessionReport, ResolveError> {
        let forced = data.forced()?;
        if forced != resolver.force() {
            return Err(ResolveError::ForceMismatch {
                data: forced,
                resolver: resolver.force(),
            });
        }

        let mut session = Self::new(data)?;
        callbacks.output_info(&data.statistics()?.to_string());
        callbacks.output_stat(&data.stat_record()?);

        let outcome = match session.begin(resolver.interactive())? {
            SessionState::AwaitingDecision => {
                let action = callbacks.resolve(data).unwrap_or_else(|e| {
                    callbacks.output_error(&e.to_string());
                    MergeAction::Quit
                });
                session.decide(data, action)?
            }
            _ => session.accept_hint()?,
        };

        if outcome == ResolveOutcome::Edit && resolver.tool_on_edit() {
            if let Some(runner) = runner {
                if !session.invoke_tool(resolver, data, runner)? {
                    let detail = session.tool_error.clone().unwrap_or_default();
                    callbacks.output_error(&detail);
                }
            }
        }

        let report = session.finish()?;
        info!(id = %report.id, outcome = %report.outcome, "resolve session done");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::PathBuf;

    use super::*;
    use crate::callbacks::StatRecord;
    use crate::merge::{ConflictStatistics, MergeFiles, MergeNames, ToolExit};

    struct FakeRunner {
        code: i32,
        calls: RefCell<u32>,
    }

    impl FakeRunner {
        fn exiting(code: i32) -> Self {
            Self {
                code,
                calls: RefCell::new(0),
            }
        }
    }

    impl ToolRunner for FakeRunner {
        fn run(&self, _command: &str, _args: &[String]) -> Result<ToolExit, ResolveError> {
            *self.calls.borrow_mut() += 1;
            Ok(ToolExit {
                code: Some(self.code),
            })
        }
    }

    #[derive(Default)]
    struct Recorder {
        answer: Option<MergeAction>,
        errors: Vec<String>,
        stats: Vec<StatRecord>,
        asked: u32,
    }

    impl ClientUserCallbacks for Recorder {
        fn output_error(&mut self, text: &str) {
            self.errors.push(text.to_string());
        }

        fn output_stat(&mut self, record: &StatRecord) {
            self.stats.push(record.clone());
        }

        fn resolve(&mut self, _data: &MergeData) -> Result<MergeAction, ResolveError> {
            self.asked += 1;
            self.answer
                .ok_or_else(|| ResolveError::PromptFailed("closed".into()))
        }
    }

    fn data(stats: ConflictStatistics) -> MergeData {
        MergeData::new(
            MergeNames::default(),
            MergeFiles {
                base: PathBuf::from("base"),
                yours: PathBuf::from("yours"),
                theirs: PathBuf::from("theirs"),
                result: PathBuf::from("result"),
            },
            stats,
            &MergeResolver::new(false, true),
        )
    }

    fn conflicted() -> MergeData {
        data(ConflictStatistics::new(1, 1, 0, 2))
    }

    #[test]
    fn test_auto_resolve_never_prompts() {
        let resolver = MergeResolver::new(false, true);
        let mut data = data(ConflictStatistics::new(2, 0, 0, 0));
        let mut cb = Recorder::default();

        let report = MergeSession::run(&resolver, &mut data, &mut cb, None).unwrap();

        assert_eq!(report.outcome, ResolveOutcome::Yours);
        assert_eq!(cb.asked, 0);
        assert_eq!(cb.stats.len(), 1);
        assert_eq!(
            report.history,
            vec![
                SessionState::Start,
                SessionState::AutoResolved(ResolveOutcome::Yours),
                SessionState::Resolved(ResolveOutcome::Yours),
                SessionState::Done(ResolveOutcome::Yours),
            ]
        );
        assert!(data.is_released());
    }

    #[test]
    fn test_force_mismatch_rejected_and_released() {
        let resolver = MergeResolver::new(true, true);
        let mut data = conflicted();
        let mut cb = Recorder::default();

        let err = MergeSession::run(&resolver, &mut data, &mut cb, None).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::ForceMismatch {
                data: false,
                resolver: true
            }
        ));
        assert_eq!(cb.asked, 0);
        assert!(data.is_released());
    }

    #[test]
    fn test_interactive_decision() {
        let resolver = MergeResolver::new(false, true);
        let mut data = conflicted();
        let mut cb = Recorder {
            answer: Some(MergeAction::AcceptTheirs),
            ..Recorder::default()
        };

        let report = MergeSession::run(&resolver, &mut data, &mut cb, None).unwrap();
        assert_eq!(report.hint, ResolveOutcome::Edit);
        assert_eq!(report.outcome, ResolveOutcome::Theirs);
        assert_eq!(report.history[1], SessionState::AwaitingDecision);
        assert_eq!(report.tool_succeeded, None);
    }

    #[test]
    fn test_callback_failure_becomes_quit() {
        let resolver = MergeResolver::new(false, true);
        let mut data = conflicted();
        let mut cb = Recorder::default();

        let report = MergeSession::run(&resolver, &mut data, &mut cb, None).unwrap();
        assert_eq!(report.outcome, ResolveOutcome::Quit);
        assert_eq!(cb.errors.len(), 1);
        assert!(cb.errors[0].contains("closed"));
        assert!(data.is_released());
    }

    #[test]
    fn test_edit_runs_merge_tool() {
        let resolver = MergeResolver::new(false, true).with_merge_tool("p4merge");
        let runner = FakeRunner::exiting(0);
        let mut data = conflicted();
        let mut cb = Recorder {
            answer: Some(MergeAction::AcceptEdited),
            ..Recorder::default()
        };

        let report = MergeSession::run(&resolver, &mut data, &mut cb, Some(&runner)).unwrap();
        assert_eq!(report.outcome, ResolveOutcome::Edit);
        assert_eq!(report.tool_succeeded, Some(true));
        assert_eq!(*runner.calls.borrow(), 1);
    }

    #[test]
    fn test_tool_failure_is_reported() {
        let resolver = MergeResolver::new(false, false).with_merge_tool("p4merge");
        let runner = FakeRunner::exiting(1);
        let mut data = conflicted();
        let mut cb = Recorder::default();

        let report = MergeSession::run(&resolver, &mut data, &mut cb, Some(&runner)).unwrap();
        assert_eq!(report.outcome, ResolveOutcome::Edit);
        assert_eq!(report.tool_succeeded, Some(false));
        assert!(report.tool_error.as_deref().unwrap_or("").contains("exit code 1"));
        assert_eq!(cb.errors.len(), 1);
        assert_eq!(cb.asked, 0);
    }

    #[test]
    fn test_tool_not_run_for_other_outcomes() {
        let resolver = MergeResolver::new(false, true).with_merge_tool("p4merge");
        let runner = FakeRunner::exiting(0);
        let mut data = data(ConflictStatistics::new(0, 3, 0, 0));
        let mut cb = Recorder::default();

        let report = MergeSession::run(&resolver, &mut data, &mut cb, Some(&runner)).unwrap();
        assert_eq!(report.outcome, ResolveOutcome::Theirs);
        assert_eq!(*runner.calls.borrow(), 0);
    }

    #[test]
    fn test_invalid_transitions() {
        let resolver = MergeResolver::default().with_merge_tool("p4merge");
        let runner = FakeRunner::exiting(0);
        let data = data(ConflictStatistics::new(0, 3, 0, 0));

        let mut session = MergeSession::new(&data).unwrap();
        assert!(matches!(
            session.decide(&data, MergeAction::Skip),
            Err(ResolveError::InvalidTransition { .. })
        ));
        session.begin(true).unwrap();
        assert!(session.begin(true).is_err());
        session.accept_hint().unwrap();
        let err = session.invoke_tool(&resolver, &data, &runner).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid resolve transition from resolved(theirs) to tool_invoked"
        );
        assert_eq!(*runner.calls.borrow(), 0);
    }

    #[test]
    fn test_finish_requires_outcome() {
        let data = conflicted();
        let mut session = MergeSession::new(&data).unwrap();
        session.begin(true).unwrap();
        assert!(session.finish().is_err());
    }

    #[test]
    fn test_session_on_released_data() {
        let mut data = conflicted();
        data.release();
        assert!(matches!(
            MergeSession::new(&data),
            Err(ResolveError::UseAfterRelease { .. })
        ));
    }
}
