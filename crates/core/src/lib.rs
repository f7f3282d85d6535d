//! depotview core library.
//!
//! This crate provides the two engines behind depotview: bidirectional
//! depot/client path mapping with include, exclude, and overlay rules, and
//! three-way merge resolution driven by chunk statistics. Configuration,
//! the client callback interface, and the error taxonomy live here too.

pub mod callbacks;
pub mod config;
pub mod errors;
pub mod mapping;
pub mod merge;

// Re-exports for convenience.
pub use callbacks::{ClientUserCallbacks, StatRecord};
pub use config::AppConfig;
pub use errors::{ConfigError, CoreError, MapError, ResolveError};
pub use mapping::{Direction, PathMapper, PathRule, RuleKind};
pub use merge::{MergeData, MergeResolver, MergeSession, ResolveOutcome};
