//! Subquery wrapper removal.
//!
//! A subquery alias only scopes names for the analyzer. Once every reference
//! is bound by id the wrapper and the qualifiers it introduced carry no
//! meaning.

use relopt_logical::{Attribute, Expr, LogicalPlan, Transformed, TreeNode};

use crate::rule::Rule;

pub struct EliminateSubqueries;

impl Rule for EliminateSubqueries {
    fn name(&self) -> &'static str {
        "EliminateSubqueries"
    }

    fn description(&self) -> &'static str {
        "Remove subquery aliases and the qualifiers they introduced"
    }

    fn apply(&self, plan: LogicalPlan) -> Transformed<LogicalPlan> {
        plan.transform_up(|node| match node {
            LogicalPlan::Subquery { input, .. } => Transformed::yes(*input),
            LogicalPlan::Relation { name, output } => {
                strip_output(output).map_data(|output| LogicalPlan::Relation { name, output })
            }
            LogicalPlan::LocalRelation { output, rows } => strip_output(output)
                .map_data(|output| LogicalPlan::LocalRelation { output, rows }),
            other => other.map_expressions(|e| {
                e.transform_up(|node| match node {
                    Expr::Attribute(a) if !a.qualifiers.is_empty() => {
                        Transformed::yes(Expr::Attribute(a.with_qualifiers(Vec::new())))
                    }
                    other => Transformed::no(other),
                })
            }),
        })
    }
}

fn strip_output(output: Vec<Attribute>) -> Transformed<Vec<Attribute>> {
    let changed = output.iter().any(|a| !a.qualifiers.is_empty());
    let output = output
        .into_iter()
        .map(|a| a.with_qualifiers(Vec::new()))
        .collect();
    Transformed::new(output, changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relopt_core::types::DataType;
    use relopt_logical::lit;

    #[test]
    fn test_subquery_and_qualifiers_removed() {
        let a = Attribute::new("a", DataType::Int64);
        let t = LogicalPlan::relation("t", vec![a.clone()]);
        let qualified = a.clone().with_qualifiers(vec!["s".into()]);
        let plan = t
            .clone()
            .subquery("s")
            .filter(qualified.to_expr().gt(lit(1i64)));

        let out = EliminateSubqueries.apply(plan);
        assert!(out.transformed);
        assert_eq!(out.data, t.filter(a.to_expr().gt(lit(1i64))));
    }

    #[test]
    fn test_plain_plan_untouched() {
        let a = Attribute::new("a", DataType::Int64);
        let plan = LogicalPlan::relation("t", vec![a.clone()]).filter(a.to_expr().gt(lit(1i64)));
        assert!(!EliminateSubqueries.apply(plan).transformed);
    }
}
