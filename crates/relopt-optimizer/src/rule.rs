//! The rule abstraction.

use relopt_logical::{LogicalPlan, Transformed};

/// A named, total rewrite over logical plans.
///
/// `apply` must return its input unchanged, flagged with
/// [`Transformed::no`], whenever its pattern does not match or a precondition
/// fails. A rule never errors: an unsafe rewrite is simply not a match.
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        "No description available"
    }

    fn apply(&self, plan: LogicalPlan) -> Transformed<LogicalPlan>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use relopt_core::types::DataType;
    use relopt_logical::Attribute;

    struct NoOp;

    impl Rule for NoOp {
        fn name(&self) -> &'static str {
            "NoOp"
        }

        fn apply(&self, plan: LogicalPlan) -> Transformed<LogicalPlan> {
            Transformed::no(plan)
        }
    }

    #[test]
    fn test_default_description() {
        assert_eq!(NoOp.description(), "No description available");
        let plan = LogicalPlan::relation("t", vec![Attribute::new("a", DataType::Int64)]);
        let out = NoOp.apply(plan.clone());
        assert!(!out.transformed);
        assert_eq!(out.data, plan);
    }
}
