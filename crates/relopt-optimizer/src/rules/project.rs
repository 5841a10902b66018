//! Projection cleanup: merging, alias reduction, and moving projections below
//! limits.

use relopt_logical::{Expr, LogicalPlan, Transformed, TreeNode};

use super::{alias_map, replace_references, strip_aliases};
use crate::rule::Rule;

/// Remove projections that return exactly their child's output, and fuse a
/// projection into the projection beneath it.
pub struct MergeProjects;

impl Rule for MergeProjects {
    fn name(&self) -> &'static str {
        "MergeProjects"
    }

    fn description(&self) -> &'static str {
        "Drop identity projections and collapse adjacent projections"
    }

    fn apply(&self, plan: LogicalPlan) -> Transformed<LogicalPlan> {
        plan.transform_up(merge_project)
    }
}

fn merge_project(plan: LogicalPlan) -> Transformed<LogicalPlan> {
    let (list, input) = match plan {
        LogicalPlan::Project { list, input } => (list, input),
        other => return Transformed::no(other),
    };

    if is_identity(&list, &input) {
        return Transformed::yes(*input);
    }

    match *input {
        LogicalPlan::Project {
            list: inner,
            input: grandchild,
        } if can_fuse(&inner) => {
            let aliases = alias_map(&inner);
            let list = list
                .into_iter()
                .map(|e| match e {
                    // A bare reference to an inner alias becomes that alias, so
                    // the output keeps the alias's id and name.
                    Expr::Attribute(a) if aliases.contains_key(&a.id) => inner
                        .iter()
                        .find(|i| i.expr_id() == Some(a.id))
                        .cloned()
                        .unwrap_or(Expr::Attribute(a)),
                    other => replace_references(other, &aliases),
                })
                .collect();
            Transformed::yes(LogicalPlan::Project {
                list,
                input: grandchild,
            })
        }
        input => Transformed::no(LogicalPlan::Project {
            list,
            input: Box::new(input),
        }),
    }
}

fn is_identity(list: &[Expr], input: &LogicalPlan) -> bool {
    let output = input.output();
    list.len() == output.len()
        && list.iter().zip(&output).all(|(e, a)| match e {
            Expr::Attribute(b) => b.id == a.id && b.name == a.name,
            _ => false,
        })
}

// Inlining duplicates inner expressions into every outer use.
fn can_fuse(inner: &[Expr]) -> bool {
    inner
        .iter()
        .all(|e| e.pure() && !e.contains_aggregate_or_window())
}

/// Strip aliases that are not the top-level name of a projected expression.
pub struct ReduceAliases;

impl Rule for ReduceAliases {
    fn name(&self) -> &'static str {
        "ReduceAliases"
    }

    fn description(&self) -> &'static str {
        "Remove aliases nested inside expressions"
    }

    fn apply(&self, plan: LogicalPlan) -> Transformed<LogicalPlan> {
        plan.transform_up(|node| match node {
            LogicalPlan::Project { list, input } => {
                let mut changed = false;
                let list = reduce_list(list, &mut changed);
                Transformed::new(LogicalPlan::Project { list, input }, changed)
            }
            LogicalPlan::Aggregate {
                group_by,
                aggregates,
                input,
            } => {
                let mut changed = false;
                let group_by = group_by
                    .into_iter()
                    .map(|e| {
                        let t = strip_aliases(e);
                        changed |= t.transformed;
                        t.data
                    })
                    .collect();
                let aggregates = reduce_list(aggregates, &mut changed);
                Transformed::new(
                    LogicalPlan::Aggregate {
                        group_by,
                        aggregates,
                        input,
                    },
                    changed,
                )
            }
            other => other.map_expressions(strip_aliases),
        })
    }
}

fn reduce_list(list: Vec<Expr>, changed: &mut bool) -> Vec<Expr> {
    list.into_iter()
        .map(|e| {
            let t = match e {
                Expr::Alias { child, name, id } => {
                    strip_aliases(*child).map_data(|child| Expr::Alias {
                        child: Box::new(child),
                        name,
                        id,
                    })
                }
                other => strip_aliases(other),
            };
            *changed |= t.transformed;
            t.data
        })
        .collect()
}

/// Move a narrowing projection below a limit so fewer columns flow through
/// it.
pub struct PushProjectsThroughLimits;

impl Rule for PushProjectsThroughLimits {
    fn name(&self) -> &'static str {
        "PushProjectsThroughLimits"
    }

    fn description(&self) -> &'static str {
        "Evaluate narrowing projections before limits"
    }

    fn apply(&self, plan: LogicalPlan) -> Transformed<LogicalPlan> {
        plan.transform_down(|node| match node {
            LogicalPlan::Project { list, input } => match *input {
                LogicalPlan::Limit { count, input: below }
                    if list.len() < below.output().len() && pushable(&list) =>
                {
                    Transformed::yes(LogicalPlan::Limit {
                        count,
                        input: Box::new(LogicalPlan::Project { list, input: below }),
                    })
                }
                input => Transformed::no(LogicalPlan::Project {
                    list,
                    input: Box::new(input),
                }),
            },
            other => Transformed::no(other),
        })
    }
}

// Window results depend on which rows are visible, so they must stay above
// the limit.
fn pushable(list: &[Expr]) -> bool {
    list.iter()
        .all(|e| e.pure() && !e.contains_aggregate_or_window())
}
