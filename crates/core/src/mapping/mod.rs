//! Path-mapping engine.
//!
//! Translates depot paths to workspace paths (and back) through an ordered
//! table of typed rules:
//! 1. **Rules** -- `[-|+]left right` text, tokenized with quote handling.
//! 2. **Patterns** -- `...`, `*` and `%%n` wildcards on each half.
//! 3. **Mapper** -- insertion-ordered table with translate, reverse and join.

mod join;
pub mod mapper;
pub mod pattern;
pub mod rule;
pub mod view_file;

pub use mapper::{Direction, PathMapper};
pub use pattern::{Pattern, Wildcard};
pub use rule::{PathRule, RuleKind};
pub use view_file::ViewFile;
