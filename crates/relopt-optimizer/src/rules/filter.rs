//! Filter merging and predicate pushdown.

use std::collections::{BTreeSet, HashMap};

use relopt_core::id::ExprId;
use relopt_logical::predicate::{conjoin, partition_by_references, split_conjunction, to_cnf};
use relopt_logical::{Expr, JoinType, LogicalPlan, Transformed, TreeNode};

use super::{alias_map, replace_references};
use crate::rule::Rule;

/// Fuse `Filter(outer, Filter(inner, x))` into `Filter(inner AND outer, x)`.
pub struct MergeFilters;

impl Rule for MergeFilters {
    fn name(&self) -> &'static str {
        "MergeFilters"
    }

    fn description(&self) -> &'static str {
        "Combine adjacent filters into one conjunction"
    }

    fn apply(&self, plan: LogicalPlan) -> Transformed<LogicalPlan> {
        plan.transform_up(|node| match node {
            LogicalPlan::Filter {
                condition: outer,
                input,
            } => match *input {
                LogicalPlan::Filter {
                    condition: inner,
                    input,
                } => Transformed::yes(LogicalPlan::Filter {
                    condition: inner.and(outer),
                    input,
                }),
                input => Transformed::no(LogicalPlan::Filter {
                    condition: outer,
                    input: Box::new(input),
                }),
            },
            other => Transformed::no(other),
        })
    }
}

/// Move a filter below a projection, rewriting its condition in terms of the
/// projection's input.
pub struct PushFiltersThroughProjects;

impl Rule for PushFiltersThroughProjects {
    fn name(&self) -> &'static str {
        "PushFiltersThroughProjects"
    }

    fn description(&self) -> &'static str {
        "Evaluate filters before projections"
    }

    fn apply(&self, plan: LogicalPlan) -> Transformed<LogicalPlan> {
        plan.transform_down(|node| match node {
            LogicalPlan::Filter { condition, input } => match *input {
                LogicalPlan::Project { list, input: below } if relocatable(&list) => {
                    let condition = replace_references(condition, &alias_map(&list));
                    Transformed::yes(LogicalPlan::Project {
                        list,
                        input: Box::new(LogicalPlan::Filter {
                            condition,
                            input: below,
                        }),
                    })
                }
                input => Transformed::no(LogicalPlan::Filter {
                    condition,
                    input: Box::new(input),
                }),
            },
            other => Transformed::no(other),
        })
    }
}

fn relocatable(list: &[Expr]) -> bool {
    list.iter()
        .all(|e| e.pure() && !e.contains_aggregate_or_window())
}

/// Split the conditions above and on an inner join into conjuncts and move
/// each one to the lowest side that can evaluate it.
///
/// Outer joins are left alone: filtering below them changes which rows get
/// null-padded.
pub struct PushFiltersThroughJoins;

impl Rule for PushFiltersThroughJoins {
    fn name(&self) -> &'static str {
        "PushFiltersThroughJoins"
    }

    fn description(&self) -> &'static str {
        "Push single-side predicates below inner joins"
    }

    fn apply(&self, plan: LogicalPlan) -> Transformed<LogicalPlan> {
        plan.transform_down(|node| match node {
            LogicalPlan::Filter { condition, input } => match *input {
                LogicalPlan::Join {
                    left,
                    right,
                    join_type: JoinType::Inner,
                    condition: on,
                } => {
                    let conjuncts = split_conjunction(to_cnf(condition));
                    let existing = on.map(split_conjunction).unwrap_or_default();
                    Transformed::yes(split_into_join(conjuncts, existing, *left, *right).0)
                }
                input => Transformed::no(LogicalPlan::Filter {
                    condition,
                    input: Box::new(input),
                }),
            },
            LogicalPlan::Join {
                left,
                right,
                join_type: JoinType::Inner,
                condition: Some(on),
            } => {
                let conjuncts = split_conjunction(on.clone());
                let (plan, moved) = split_into_join(conjuncts, Vec::new(), *left, *right);
                if moved {
                    Transformed::yes(plan)
                } else {
                    // Rebuild from the original condition so the tree is
                    // value-identical.
                    match plan {
                        LogicalPlan::Join {
                            left,
                            right,
                            join_type,
                            ..
                        } => Transformed::no(LogicalPlan::Join {
                            left,
                            right,
                            join_type,
                            condition: Some(on),
                        }),
                        other => Transformed::no(other),
                    }
                }
            }
            other => Transformed::no(other),
        })
    }
}

/// Place `conjuncts` on the join: single-side pure conjuncts become filters on
/// that side, the rest are appended to `existing` unless already present.
/// Returns the new join and whether any conjunct moved to a side.
fn split_into_join(
    conjuncts: Vec<Expr>,
    existing: Vec<Expr>,
    left: LogicalPlan,
    right: LogicalPlan,
) -> (LogicalPlan, bool) {
    let (pure, pinned): (Vec<Expr>, Vec<Expr>) = conjuncts.into_iter().partition(Expr::pure);
    let parts = partition_by_references(pure, &left.output_ids(), &right.output_ids());
    let moved = !parts.left.is_empty() || !parts.right.is_empty();

    let mut on = existing;
    for c in parts.common.into_iter().chain(pinned) {
        if !on.contains(&c) {
            on.push(c);
        }
    }

    let plan = LogicalPlan::Join {
        left: Box::new(filtered(left, parts.left)),
        right: Box::new(filtered(right, parts.right)),
        join_type: JoinType::Inner,
        condition: conjoin(on),
    };
    (plan, moved)
}

fn filtered(plan: LogicalPlan, conjuncts: Vec<Expr>) -> LogicalPlan {
    match conjoin(conjuncts) {
        Some(condition) => plan.filter(condition),
        None => plan,
    }
}

/// Push conjuncts that only read grouping keys below an aggregate. Conjuncts
/// on aggregated values stay above it.
pub struct PushFiltersThroughAggregates;

impl Rule for PushFiltersThroughAggregates {
    fn name(&self) -> &'static str {
        "PushFiltersThroughAggregates"
    }

    fn description(&self) -> &'static str {
        "Filter on grouping keys before aggregating"
    }

    fn apply(&self, plan: LogicalPlan) -> Transformed<LogicalPlan> {
        plan.transform_down(|node| match node {
            LogicalPlan::Filter { condition, input } => match *input {
                LogicalPlan::Aggregate {
                    group_by,
                    aggregates,
                    input: below,
                } if !group_by.is_empty() && aggregates.iter().all(Expr::pure) => {
                    push_below_aggregate(condition, group_by, aggregates, below)
                }
                input => Transformed::no(LogicalPlan::Filter {
                    condition,
                    input: Box::new(input),
                }),
            },
            other => Transformed::no(other),
        })
    }
}

fn push_below_aggregate(
    condition: Expr,
    group_by: Vec<Expr>,
    aggregates: Vec<Expr>,
    below: Box<LogicalPlan>,
) -> Transformed<LogicalPlan> {
    let key_refs: BTreeSet<ExprId> = group_by.iter().flat_map(Expr::references).collect();
    // Output id to the pre-aggregation expression it stands for, for outputs
    // computed from grouping keys alone.
    let key_outputs: HashMap<ExprId, Expr> = aggregates
        .iter()
        .filter_map(|e| {
            let id = e.expr_id()?;
            let value = e.clone().unalias();
            let key_only = !value.contains_aggregate_or_window()
                && value.references().is_subset(&key_refs);
            key_only.then_some((id, value))
        })
        .collect();

    let (pushed, kept): (Vec<Expr>, Vec<Expr>) = split_conjunction(to_cnf(condition.clone()))
        .into_iter()
        .partition(|c| {
            let refs = c.references();
            c.pure() && !refs.is_empty() && refs.iter().all(|id| key_outputs.contains_key(id))
        });

    if pushed.is_empty() {
        return Transformed::no(LogicalPlan::Filter {
            condition,
            input: Box::new(LogicalPlan::Aggregate {
                group_by,
                aggregates,
                input: below,
            }),
        });
    }

    let pushed = pushed
        .into_iter()
        .map(|c| replace_references(c, &key_outputs));
    let aggregate = LogicalPlan::Aggregate {
        group_by,
        aggregates,
        input: Box::new(filtered(*below, pushed.collect())),
    };
    Transformed::yes(match conjoin(kept) {
        Some(condition) => aggregate.filter(condition),
        None => aggregate,
    })
}
