//! The concrete rewrite rules.
//!
//! Every rule is total: a plan it does not match comes back unchanged and
//! flagged untransformed. Unless a rule says otherwise it walks the plan
//! top-down. Rules that remove or fuse nodes walk bottom-up so a chain of
//! matches collapses in one pass.

mod casts;
mod constant;
mod filter;
mod limit;
mod negation;
mod project;
mod subquery;

use std::collections::HashMap;

use relopt_core::id::ExprId;
use relopt_logical::{Expr, Transformed, TreeNode};

pub use casts::ReduceCasts;
pub use constant::{EliminateConstantFilters, FoldConstants, FoldLogicalPredicates};
pub use filter::{
    MergeFilters, PushFiltersThroughAggregates, PushFiltersThroughJoins,
    PushFiltersThroughProjects,
};
pub use limit::ReduceLimits;
pub use negation::{CNFConversion, ReduceNegations};
pub use project::{MergeProjects, PushProjectsThroughLimits, ReduceAliases};
pub use subquery::EliminateSubqueries;

use crate::rule::Rule;

/// The operator-level rules in the order they run within one pass.
///
/// Folding runs before filter elimination, which runs before CNF conversion;
/// alias, filter and limit cleanups come next and pushdowns run last.
pub fn operator_optimizations() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(FoldConstants),
        Box::new(FoldLogicalPredicates),
        Box::new(ReduceNegations),
        Box::new(ReduceCasts),
        Box::new(EliminateConstantFilters),
        Box::new(CNFConversion),
        Box::new(MergeProjects),
        Box::new(ReduceAliases),
        Box::new(MergeFilters),
        Box::new(ReduceLimits),
        Box::new(PushProjectsThroughLimits),
        Box::new(PushFiltersThroughProjects),
        Box::new(PushFiltersThroughJoins),
        Box::new(PushFiltersThroughAggregates),
    ]
}

/// Alias id to the expression it names, for each alias in a projection list.
pub(crate) fn alias_map(list: &[Expr]) -> HashMap<ExprId, Expr> {
    list.iter()
        .filter_map(|e| match e {
            Expr::Alias { child, id, .. } => Some((*id, child.as_ref().clone())),
            _ => None,
        })
        .collect()
}

/// Replace references to aliased attributes with the aliased expressions.
pub(crate) fn replace_references(e: Expr, aliases: &HashMap<ExprId, Expr>) -> Expr {
    e.transform_up(|node| match node {
        Expr::Attribute(a) => match aliases.get(&a.id) {
            Some(replacement) => Transformed::yes(replacement.clone()),
            None => Transformed::no(Expr::Attribute(a)),
        },
        other => Transformed::no(other),
    })
    .data
}

/// Remove every alias in the tree.
pub(crate) fn strip_aliases(e: Expr) -> Transformed<Expr> {
    e.transform_up(|node| match node {
        Expr::Alias { child, .. } => Transformed::yes(*child),
        other => Transformed::no(other),
    })
}
