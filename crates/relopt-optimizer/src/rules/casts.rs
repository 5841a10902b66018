//! Redundant cast removal.

use relopt_core::types::DataType;
use relopt_logical::{Expr, LogicalPlan, Transformed};

use crate::rule::Rule;

/// Drop casts to the type the child already has, and collapse
/// `CAST(CAST(x AS mid) AS to)` into `CAST(x AS to)` when the inner cast
/// cannot lose information.
pub struct ReduceCasts;

impl Rule for ReduceCasts {
    fn name(&self) -> &'static str {
        "ReduceCasts"
    }

    fn description(&self) -> &'static str {
        "Remove no-op casts and collapse lossless cast chains"
    }

    fn apply(&self, plan: LogicalPlan) -> Transformed<LogicalPlan> {
        plan.transform_all_expressions_down(reduce_cast)
    }
}

fn reduce_cast(e: Expr) -> Transformed<Expr> {
    let (child, to) = match e {
        Expr::Cast { child, to } => (child, to),
        other => return Transformed::no(other),
    };
    if child.data_type() == Some(to) {
        return Transformed::yes(*child);
    }
    match *child {
        // String rendering depends on the source type, so never skip a step
        // on the way to Utf8.
        Expr::Cast {
            child: inner,
            to: mid,
        } if to != DataType::Utf8
            && inner.data_type().is_some_and(|from| from.widens_losslessly_to(mid)) =>
        {
            Transformed::yes(Expr::Cast { child: inner, to })
        }
        child => Transformed::no(Expr::Cast {
            child: Box::new(child),
            to,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relopt_logical::{Attribute, TreeNode};

    fn reduce(e: Expr) -> Transformed<Expr> {
        e.transform_down(reduce_cast)
    }

    #[test]
    fn test_same_type_cast_dropped() {
        let a = Attribute::new("a", DataType::Int64).to_expr();
        let out = reduce(a.clone().cast(DataType::Int64));
        assert!(out.transformed);
        assert_eq!(out.data, a);
    }

    #[test]
    fn test_lossless_chain_collapses() {
        let a = Attribute::new("a", DataType::Int32).to_expr();
        let out = reduce(a.clone().cast(DataType::Int64).cast(DataType::Float64));
        assert_eq!(out.data, a.cast(DataType::Float64));
    }

    #[test]
    fn test_lossy_or_string_chain_kept() {
        let wide = Attribute::new("w", DataType::Int64).to_expr();
        // bigint -> int truncates; the outer cast must see the truncated value.
        let lossy = wide.cast(DataType::Int32).cast(DataType::Int64);
        assert!(!reduce(lossy).transformed);

        let small = Attribute::new("s", DataType::Int32).to_expr();
        let to_string = small.cast(DataType::Int64).cast(DataType::Utf8);
        assert!(!reduce(to_string).transformed);
    }
}
