//! Limit fusion.

use relopt_logical::{LogicalPlan, Transformed, TreeNode};

use crate::rule::Rule;

/// `Limit(a, Limit(b, x))` becomes `Limit(min(a, b), x)`.
pub struct ReduceLimits;

impl Rule for ReduceLimits {
    fn name(&self) -> &'static str {
        "ReduceLimits"
    }

    fn description(&self) -> &'static str {
        "Collapse nested limits to the smaller bound"
    }

    fn apply(&self, plan: LogicalPlan) -> Transformed<LogicalPlan> {
        plan.transform_up(|node| match node {
            LogicalPlan::Limit { count, input } => match *input {
                LogicalPlan::Limit {
                    count: inner,
                    input,
                } => Transformed::yes(LogicalPlan::Limit {
                    count: count.min(inner),
                    input,
                }),
                input => Transformed::no(LogicalPlan::Limit {
                    count,
                    input: Box::new(input),
                }),
            },
            other => Transformed::no(other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relopt_core::types::DataType;
    use relopt_logical::Attribute;

    #[test]
    fn test_smaller_bound_wins_in_either_order() {
        let t = LogicalPlan::relation("t", vec![Attribute::new("a", DataType::Int64)]);
        for (outer, inner) in [(10, 5), (5, 10)] {
            let out = ReduceLimits.apply(t.clone().limit(inner).limit(outer));
            assert!(out.transformed);
            assert_eq!(out.data, t.clone().limit(5));
        }
    }

    #[test]
    fn test_chain_collapses_in_one_pass() {
        let t = LogicalPlan::relation("t", vec![Attribute::new("a", DataType::Int64)]);
        let out = ReduceLimits.apply(t.clone().limit(7).limit(3).limit(9));
        assert_eq!(out.data, t.limit(3));
    }
}
