//! Shared styling utilities for the CLI.

use console::Style;

use depotview_core::mapping::RuleKind;
use depotview_core::merge::ResolveOutcome;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create an error-styled string (red with cross).
pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create a header-styled string (bold, white).
pub fn header(msg: &str) -> String {
    let style = Style::new().bold();
    style.apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// Rule kind label: include (green), exclude (red), overlay (blue).
pub fn kind(kind: RuleKind) -> String {
    let style = match kind {
        RuleKind::Include => Style::new().green(),
        RuleKind::Exclude => Style::new().red(),
        RuleKind::Overlay => Style::new().blue(),
    };
    style.apply_to(kind.to_string()).to_string()
}

/// Resolve outcome label.
pub fn outcome(outcome: ResolveOutcome) -> String {
    let style = match outcome {
        ResolveOutcome::Merged | ResolveOutcome::Yours | ResolveOutcome::Theirs => {
            Style::new().green().bold()
        }
        ResolveOutcome::Edit => Style::new().yellow().bold(),
        ResolveOutcome::Skip | ResolveOutcome::Quit => Style::new().dim(),
    };
    style.apply_to(outcome.to_string()).to_string()
}
