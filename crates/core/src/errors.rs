//! Error types for the depotview core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Mapping errors
// ---------------------------------------------------------------------------

/// Errors from the path-mapping engine.
///
/// A failed operation never modifies the rule table.
#[derive(Debug, Error)]
pub enum MapError {
    /// A double quote was opened and never closed.
    #[error("malformed mapping rule '{rule}': unterminated quote")]
    UnterminatedQuote { rule: String },

    /// The rule text (or one of its halves) is empty.
    #[error("malformed mapping rule '{rule}': empty path")]
    EmptyRule { rule: String },

    /// More than two unquoted fields were found in a combined rule.
    #[error("malformed mapping rule '{rule}': expected at most two paths")]
    ExtraField { rule: String },

    /// A path (after any kind prefix) starts with `-` or `+`, which would
    /// read back as a kind prefix once the rule is reversed.
    #[error("malformed mapping rule '{rule}': path '{path}' starts with a kind character")]
    PrefixedPath { rule: String, path: String },

    /// A wildcard pattern could not be compiled.
    #[error("invalid path pattern '{pattern}': {detail}")]
    InvalidPattern { pattern: String, detail: String },

    /// Left and right half lists passed to a pairwise insert differ in length.
    #[error("left and right rule lists differ in length ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },

    /// No rule maps the path (only raised by strict translation).
    #[error("no mapping rule matches '{path}'")]
    NoMatch { path: String },

    /// The view file could not be loaded.
    #[error("view file error at '{path}': {detail}")]
    ViewFileError { path: String, detail: String },

    /// Generic I/O wrapper.
    #[error("view file I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Resolve errors
// ---------------------------------------------------------------------------

/// Errors from the merge-resolution subsystem.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Merge data was accessed after the session released it.
    #[error("{what} accessed after the merge data was released")]
    UseAfterRelease { what: &'static str },

    /// The external merge tool reported failure.
    #[error("merge tool '{tool}' failed: {detail}")]
    ExternalToolFailure { tool: String, detail: String },

    /// No merge tool is configured or found in the environment.
    #[error("no merge tool configured (set merge_tool or the P4MERGE/MERGE environment variables)")]
    NoMergeTool,

    /// A user response did not name a known merge action.
    #[error("unknown merge action '{0}'")]
    UnknownAction(String),

    /// The interactive prompt could not produce a response.
    #[error("prompt failed: {0}")]
    PromptFailed(String),

    /// Merge data and the resolver driving it disagree on `force`.
    #[error("merge data was classified with force={data} but the resolver has force={resolver}")]
    ForceMismatch { data: bool, resolver: bool },

    /// A session state-machine transition was invalid.
    #[error("invalid resolve transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
