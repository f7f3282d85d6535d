//! Three-way merge resolution: statistics, policy, and the per-file session.

pub mod data;
pub mod oracle;
pub mod resolver;
pub mod session;
pub mod stats;

pub use data::{ContentDigests, MergeData, MergeFiles, MergeNames};
pub use oracle::{DiffOracle, DiffyOracle};
pub use resolver::{MergeResolver, ToolExit, ToolRunner};
pub use session::{MergeSession, SessionReport, SessionState};
pub use stats::{ConflictStatistics, MergeAction, ResolveOutcome};
