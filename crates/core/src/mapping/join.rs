//! Composition of two mapping tables.
//!
//! For `l: A -> B` and `r: B -> C`, every pair `(l_i, r_j)` whose B-side
//! patterns overlap contributes one rule `A -> C`. Overlap is decided by
//! matching one pattern's text against the other pattern, with each of its
//! wildcards held by a wildcard at least as broad. The more specific side
//! bounds the joined rule:
//!
//! - `r_j.left` lies within `l_i.right`: the A side is `r_j.left` pulled back
//!   through `l_i`, the C side is `r_j.right`.
//! - `l_i.right` lies within `r_j.left`: the A side is `l_i.left`, the C side
//!   is `l_i.right` pushed forward through `r_j`.
//!
//! Joined rules appear in `l`-major, `r`-minor order. The joined kind is
//! [`RuleKind::combine`] of the two contributing kinds.

use tracing::debug;

use super::mapper::CompiledRule;
use super::rule::{PathRule, RuleKind};

pub(crate) fn join_rules(left: &[CompiledRule], right: &[CompiledRule]) -> Vec<PathRule> {
    let mut joined = Vec::new();
    for l in left {
        for r in right {
            if let Some(rule) = compose(l, r) {
                debug!(
                    left_rule = %l.rule,
                    right_rule = %r.rule,
                    joined = %rule,
                    "joined rule pair"
                );
                joined.push(rule);
            }
        }
    }
    joined
}

fn compose(l: &CompiledRule, r: &CompiledRule) -> Option<PathRule> {
    let kind: RuleKind = l.rule.kind.combine(r.rule.kind);

    if let Some(captures) = l.right.captures_pattern(&r.rule.left) {
        let a_side = l.left.substitute(&captures);
        return Some(PathRule::new(a_side, r.rule.right.clone(), kind));
    }

    if let Some(captures) = r.left.captures_pattern(&l.rule.right) {
        let c_side = r.right.substitute(&captures);
        return Some(PathRule::new(l.rule.left.clone(), c_side, kind));
    }

    None
}
