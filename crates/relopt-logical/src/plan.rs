//! Logical plan trees.
//!
//! Each operator exposes its output attributes, the expressions it evaluates,
//! and a rebuild hook over those expressions. Rules never mutate a plan in
//! place; they rebuild the parts they change.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use relopt_core::id::ExprId;
use relopt_core::schema::Schema;
use relopt_core::types::{DataType, Scalar};

use crate::expr::{Attribute, Expr, SortOrder};
use crate::tree::{Transformed, TreeNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    pub fn name(&self) -> &'static str {
        match self {
            JoinType::Inner => "Inner",
            JoinType::Left => "LeftOuter",
            JoinType::Right => "RightOuter",
            JoinType::Full => "FullOuter",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalPlan {
    /// A base table. Opaque to the optimizer beyond its output.
    Relation {
        name: String,
        output: Vec<Attribute>,
    },
    /// Inline rows; with no rows this is the empty relation.
    LocalRelation {
        output: Vec<Attribute>,
        #[serde(default)]
        rows: Vec<Vec<Scalar>>,
    },
    Project {
        list: Vec<Expr>,
        input: Box<LogicalPlan>,
    },
    Filter {
        condition: Expr,
        input: Box<LogicalPlan>,
    },
    Join {
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
        join_type: JoinType,
        #[serde(default)]
        condition: Option<Expr>,
    },
    Aggregate {
        group_by: Vec<Expr>,
        aggregates: Vec<Expr>,
        input: Box<LogicalPlan>,
    },
    Sort {
        order: Vec<SortOrder>,
        input: Box<LogicalPlan>,
    },
    Limit {
        count: u64,
        input: Box<LogicalPlan>,
    },
    /// `UNION ALL`; positional.
    Union {
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
    },
    /// A named scope over a child plan. Semantically transparent.
    Subquery {
        alias: String,
        input: Box<LogicalPlan>,
    },
}

impl LogicalPlan {
    pub fn relation(name: impl Into<String>, output: Vec<Attribute>) -> Self {
        LogicalPlan::Relation {
            name: name.into(),
            output,
        }
    }

    /// A relation with the given output and no rows.
    pub fn empty(output: Vec<Attribute>) -> Self {
        LogicalPlan::LocalRelation {
            output,
            rows: Vec::new(),
        }
    }

    pub fn project(self, list: Vec<Expr>) -> Self {
        LogicalPlan::Project {
            list,
            input: Box::new(self),
        }
    }

    pub fn filter(self, condition: Expr) -> Self {
        LogicalPlan::Filter {
            condition,
            input: Box::new(self),
        }
    }

    pub fn join(self, right: LogicalPlan, join_type: JoinType, condition: Option<Expr>) -> Self {
        LogicalPlan::Join {
            left: Box::new(self),
            right: Box::new(right),
            join_type,
            condition,
        }
    }

    pub fn aggregate(self, group_by: Vec<Expr>, aggregates: Vec<Expr>) -> Self {
        LogicalPlan::Aggregate {
            group_by,
            aggregates,
            input: Box::new(self),
        }
    }

    pub fn sort(self, order: Vec<SortOrder>) -> Self {
        LogicalPlan::Sort {
            order,
            input: Box::new(self),
        }
    }

    pub fn limit(self, count: u64) -> Self {
        LogicalPlan::Limit {
            count,
            input: Box::new(self),
        }
    }

    pub fn union(self, other: LogicalPlan) -> Self {
        LogicalPlan::Union {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn subquery(self, alias: impl Into<String>) -> Self {
        LogicalPlan::Subquery {
            alias: alias.into(),
            input: Box::new(self),
        }
    }

    pub fn node_name(&self) -> &'static str {
        match self {
            LogicalPlan::Relation { .. } => "Relation",
            LogicalPlan::LocalRelation { .. } => "LocalRelation",
            LogicalPlan::Project { .. } => "Project",
            LogicalPlan::Filter { .. } => "Filter",
            LogicalPlan::Join { .. } => "Join",
            LogicalPlan::Aggregate { .. } => "Aggregate",
            LogicalPlan::Sort { .. } => "Sort",
            LogicalPlan::Limit { .. } => "Limit",
            LogicalPlan::Union { .. } => "Union",
            LogicalPlan::Subquery { .. } => "Subquery",
        }
    }

    /// Attributes this operator produces, in order.
    pub fn output(&self) -> Vec<Attribute> {
        match self {
            LogicalPlan::Relation { output, .. } | LogicalPlan::LocalRelation { output, .. } => {
                output.clone()
            }
            LogicalPlan::Project { list, .. } => {
                list.iter().filter_map(Expr::to_attribute).collect()
            }
            LogicalPlan::Aggregate { aggregates, .. } => {
                aggregates.iter().filter_map(Expr::to_attribute).collect()
            }
            LogicalPlan::Filter { input, .. }
            | LogicalPlan::Sort { input, .. }
            | LogicalPlan::Limit { input, .. } => input.output(),
            LogicalPlan::Join {
                left,
                right,
                join_type,
                ..
            } => {
                let left_nullable = matches!(join_type, JoinType::Right | JoinType::Full);
                let right_nullable = matches!(join_type, JoinType::Left | JoinType::Full);
                let mark = |mut a: Attribute, nullable: bool| {
                    a.nullable |= nullable;
                    a
                };
                left.output()
                    .into_iter()
                    .map(|a| mark(a, left_nullable))
                    .chain(right.output().into_iter().map(|a| mark(a, right_nullable)))
                    .collect()
            }
            LogicalPlan::Union { left, right } => left
                .output()
                .into_iter()
                .zip(right.output())
                .map(|(mut l, r)| {
                    l.nullable |= r.nullable;
                    l
                })
                .collect(),
            LogicalPlan::Subquery { alias, input } => input
                .output()
                .into_iter()
                .map(|a| a.with_qualifiers(vec![alias.clone()]))
                .collect(),
        }
    }

    pub fn output_ids(&self) -> BTreeSet<ExprId> {
        self.output().into_iter().map(|a| a.id).collect()
    }

    pub fn schema(&self) -> Schema {
        Schema::new(self.output().iter().map(Attribute::to_field).collect())
    }

    /// Same output ids, names and types in the same order.
    pub fn is_schema_equivalent(&self, other: &LogicalPlan) -> bool {
        self.schema().is_equivalent(&other.schema())
    }

    /// Expressions evaluated by this operator (not its children).
    pub fn expressions(&self) -> Vec<&Expr> {
        match self {
            LogicalPlan::Relation { .. }
            | LogicalPlan::LocalRelation { .. }
            | LogicalPlan::Limit { .. }
            | LogicalPlan::Union { .. }
            | LogicalPlan::Subquery { .. } => vec![],
            LogicalPlan::Project { list, .. } => list.iter().collect(),
            LogicalPlan::Filter { condition, .. } => vec![condition],
            LogicalPlan::Join { condition, .. } => condition.iter().collect(),
            LogicalPlan::Aggregate {
                group_by,
                aggregates,
                ..
            } => group_by.iter().chain(aggregates).collect(),
            LogicalPlan::Sort { order, .. } => order.iter().map(|o| &o.child).collect(),
        }
    }

    /// Rebuild this operator with `f` applied to each of its own expressions.
    pub fn map_expressions<F>(self, mut f: F) -> Transformed<LogicalPlan>
    where
        F: FnMut(Expr) -> Transformed<Expr>,
    {
        let mut changed = false;
        let mut go = |e: Expr| -> Expr {
            let t = f(e);
            changed |= t.transformed;
            t.data
        };

        let data = match self {
            LogicalPlan::Relation { .. }
            | LogicalPlan::LocalRelation { .. }
            | LogicalPlan::Limit { .. }
            | LogicalPlan::Union { .. }
            | LogicalPlan::Subquery { .. } => return Transformed::no(self),
            LogicalPlan::Project { list, input } => LogicalPlan::Project {
                list: list.into_iter().map(&mut go).collect(),
                input,
            },
            LogicalPlan::Filter { condition, input } => LogicalPlan::Filter {
                condition: go(condition),
                input,
            },
            LogicalPlan::Join {
                left,
                right,
                join_type,
                condition,
            } => LogicalPlan::Join {
                left,
                right,
                join_type,
                condition: condition.map(&mut go),
            },
            LogicalPlan::Aggregate {
                group_by,
                aggregates,
                input,
            } => {
                let group_by = group_by.into_iter().map(&mut go).collect();
                let aggregates = aggregates.into_iter().map(&mut go).collect();
                LogicalPlan::Aggregate {
                    group_by,
                    aggregates,
                    input,
                }
            }
            LogicalPlan::Sort { order, input } => LogicalPlan::Sort {
                order: order.into_iter().map(|o| o.map_child(&mut go)).collect(),
                input,
            },
        };
        Transformed::new(data, changed)
    }

    /// Rewrite every expression in the plan, pre-order within each expression.
    pub fn transform_all_expressions_down<F>(self, mut f: F) -> Transformed<LogicalPlan>
    where
        F: FnMut(Expr) -> Transformed<Expr>,
    {
        self.transform_up(|node| node.map_expressions(|e| e.transform_down(&mut f)))
    }

    /// Rewrite every expression in the plan, post-order within each expression.
    pub fn transform_all_expressions_up<F>(self, mut f: F) -> Transformed<LogicalPlan>
    where
        F: FnMut(Expr) -> Transformed<Expr>,
    {
        self.transform_up(|node| node.map_expressions(|e| e.transform_up(&mut f)))
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution_error().is_none()
    }

    /// First reason, in pre-order, that this plan is not fully resolved.
    pub fn resolution_error(&self) -> Option<String> {
        if let Some(err) = self.node_resolution_error() {
            return Some(format!("{}: {err}", self.node_name()));
        }
        self.children()
            .into_iter()
            .find_map(LogicalPlan::resolution_error)
    }

    fn node_resolution_error(&self) -> Option<String> {
        let inputs: BTreeSet<ExprId> = self
            .children()
            .into_iter()
            .flat_map(LogicalPlan::output_ids)
            .collect();

        for e in self.expressions() {
            if !e.resolved() {
                return Some(format!("expression {e} is not resolved"));
            }
            if let Some(missing) = e.references().into_iter().find(|id| !inputs.contains(id)) {
                return Some(format!("{e} refers to {missing}, which no input produces"));
            }
        }

        match self {
            LogicalPlan::Project { list: named, .. }
            | LogicalPlan::Aggregate {
                aggregates: named, ..
            } => named
                .iter()
                .find(|e| e.to_attribute().is_none())
                .map(|e| format!("{e} in an output list has no name")),
            LogicalPlan::Filter { condition, .. }
            | LogicalPlan::Join {
                condition: Some(condition),
                ..
            } => (condition.data_type() != Some(DataType::Boolean))
                .then(|| format!("condition {condition} is not boolean")),
            LogicalPlan::Union { left, right } => {
                let (l, r) = (left.output(), right.output());
                if l.len() != r.len() {
                    return Some(format!("arity mismatch {} vs {}", l.len(), r.len()));
                }
                l.iter()
                    .zip(&r)
                    .find(|(a, b)| a.data_type != b.data_type)
                    .map(|(a, b)| format!("type mismatch {} vs {}", a.data_type, b.data_type))
            }
            LogicalPlan::LocalRelation { output, rows } => rows.iter().find_map(|row| {
                if row.len() != output.len() {
                    return Some(format!("row arity {} != {}", row.len(), output.len()));
                }
                row.iter()
                    .zip(output)
                    .find(|(v, a)| v.data_type().is_some_and(|t| t != a.data_type))
                    .map(|(v, a)| format!("value {v} does not fit {}", a.data_type))
            }),
            _ => None,
        }
    }
}

impl TreeNode for LogicalPlan {
    fn children(&self) -> Vec<&LogicalPlan> {
        match self {
            LogicalPlan::Relation { .. } | LogicalPlan::LocalRelation { .. } => vec![],
            LogicalPlan::Project { input, .. }
            | LogicalPlan::Filter { input, .. }
            | LogicalPlan::Aggregate { input, .. }
            | LogicalPlan::Sort { input, .. }
            | LogicalPlan::Limit { input, .. }
            | LogicalPlan::Subquery { input, .. } => vec![input.as_ref()],
            LogicalPlan::Join { left, right, .. } | LogicalPlan::Union { left, right } => {
                vec![left.as_ref(), right.as_ref()]
            }
        }
    }

    fn map_children<F>(self, mut f: F) -> Transformed<LogicalPlan>
    where
        F: FnMut(LogicalPlan) -> Transformed<LogicalPlan>,
    {
        let mut changed = false;
        let mut go = |p: Box<LogicalPlan>| -> Box<LogicalPlan> {
            let t = f(*p);
            changed |= t.transformed;
            Box::new(t.data)
        };

        let data = match self {
            LogicalPlan::Relation { .. } | LogicalPlan::LocalRelation { .. } => {
                return Transformed::no(self)
            }
            LogicalPlan::Project { list, input } => LogicalPlan::Project {
                list,
                input: go(input),
            },
            LogicalPlan::Filter { condition, input } => LogicalPlan::Filter {
                condition,
                input: go(input),
            },
            LogicalPlan::Join {
                left,
                right,
                join_type,
                condition,
            } => {
                let left = go(left);
                let right = go(right);
                LogicalPlan::Join {
                    left,
                    right,
                    join_type,
                    condition,
                }
            }
            LogicalPlan::Aggregate {
                group_by,
                aggregates,
                input,
            } => LogicalPlan::Aggregate {
                group_by,
                aggregates,
                input: go(input),
            },
            LogicalPlan::Sort { order, input } => LogicalPlan::Sort {
                order,
                input: go(input),
            },
            LogicalPlan::Limit { count, input } => LogicalPlan::Limit {
                count,
                input: go(input),
            },
            LogicalPlan::Union { left, right } => {
                let left = go(left);
                let right = go(right);
                LogicalPlan::Union { left, right }
            }
            LogicalPlan::Subquery { alias, input } => LogicalPlan::Subquery {
                alias,
                input: go(input),
            },
        };
        Transformed::new(data, changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{lit, AggregateFunction};

    fn table() -> (LogicalPlan, Attribute, Attribute) {
        let a = Attribute::new("a", DataType::Int64);
        let b = Attribute::new("b", DataType::Utf8).not_null();
        (
            LogicalPlan::relation("t", vec![a.clone(), b.clone()]),
            a,
            b,
        )
    }

    #[test]
    fn project_output_follows_aliases() {
        let (t, a, b) = table();
        let plus = a.to_expr().add(lit(1i64)).alias("a1");
        let p = t.project(vec![plus.clone(), b.to_expr()]);
        let out = p.output();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, plus.expr_id().unwrap());
        assert_eq!(out[1], b);
        assert!(p.is_resolved());
    }

    #[test]
    fn outer_join_marks_nullable_side() {
        let (l, _, lb) = table();
        let (r, _, rb) = table();
        let j = l.join(r, JoinType::Left, None);
        let out = j.output();
        let find = |id| out.iter().find(|a| a.id == id).unwrap().nullable;
        assert!(!find(lb.id));
        assert!(find(rb.id));
    }

    #[test]
    fn dangling_reference_is_unresolved() {
        let (t, _, _) = table();
        let stranger = Attribute::new("z", DataType::Int64);
        let f = t.filter(stranger.to_expr().gt(lit(1i64)));
        let err = f.resolution_error().unwrap();
        assert!(err.starts_with("Filter"), "{err}");
    }

    #[test]
    fn non_boolean_condition_is_unresolved() {
        let (t, a, _) = table();
        assert!(!t.filter(a.to_expr()).is_resolved());
    }

    #[test]
    fn unresolved_name_is_unresolved() {
        let (t, _, _) = table();
        let f = t.filter(Expr::Unresolved { name: "a".into() }.gt(lit(1i64)));
        assert!(!f.is_resolved());
    }

    #[test]
    fn aggregate_output_and_references() {
        let (t, a, b) = table();
        let total = Expr::aggregate(AggregateFunction::Sum, a.to_expr()).alias("total");
        let agg = t.aggregate(vec![b.to_expr()], vec![b.to_expr(), total]);
        assert!(agg.is_resolved());
        let names: Vec<_> = agg.output().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["b", "total"]);
    }

    #[test]
    fn subquery_qualifies_but_keeps_schema() {
        let (t, _, _) = table();
        let s = t.clone().subquery("x");
        assert!(s.output().iter().all(|a| a.qualifiers == vec!["x".to_string()]));
        assert!(s.is_schema_equivalent(&t));
    }

    #[test]
    fn map_expressions_reports_changes() {
        let (t, a, _) = table();
        let f = t.filter(a.to_expr().gt(lit(1i64)));
        let same = f.clone().map_expressions(Transformed::no);
        assert!(!same.transformed);
        assert_eq!(same.data, f);

        let swapped = f.map_expressions(|_| Transformed::yes(lit(true)));
        assert!(swapped.transformed);
        assert!(matches!(
            swapped.data,
            LogicalPlan::Filter { ref condition, .. } if condition.as_bool_literal() == Some(true)
        ));
    }

    #[test]
    fn union_checks_types() {
        let (l, _, _) = table();
        let c = Attribute::new("c", DataType::Int64);
        let d = Attribute::new("d", DataType::Int64);
        let r = LogicalPlan::relation("u", vec![c, d]);
        assert!(!l.union(r).is_resolved());
    }

    #[test]
    fn plan_serde_round_trip() {
        let (t, a, _) = table();
        let p = t.filter(a.to_expr().gt(lit(1i64))).limit(3);
        let json = serde_json::to_string(&p).unwrap();
        let back: LogicalPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
