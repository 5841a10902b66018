//! Constant folding and boolean simplification.

use relopt_core::types::DataType;
use relopt_logical::{BinaryOp, Expr, LogicalPlan, Transformed, TreeNode, UnaryOp};

use crate::rule::Rule;

/// Replace foldable, pure expressions with the literal they evaluate to.
///
/// Evaluation failures (overflow, out-of-range casts) leave the expression in
/// place for the engine to report at runtime.
pub struct FoldConstants;

impl Rule for FoldConstants {
    fn name(&self) -> &'static str {
        "FoldConstants"
    }

    fn description(&self) -> &'static str {
        "Evaluate constant expressions at plan time"
    }

    fn apply(&self, plan: LogicalPlan) -> Transformed<LogicalPlan> {
        plan.transform_all_expressions_down(fold)
    }
}

fn fold(e: Expr) -> Transformed<Expr> {
    if matches!(e, Expr::Literal { .. }) || !e.foldable() || !e.pure() {
        return Transformed::no(e);
    }
    let Some(data_type) = e.data_type() else {
        return Transformed::no(e);
    };
    match e.evaluate() {
        Ok(value) if value.data_type().map_or(true, |t| t == data_type) => {
            Transformed::yes(Expr::Literal { value, data_type })
        }
        _ => Transformed::no(e),
    }
}

/// Boolean identities that need only one side to be constant, plus
/// idempotence and self-comparison.
pub struct FoldLogicalPredicates;

impl Rule for FoldLogicalPredicates {
    fn name(&self) -> &'static str {
        "FoldLogicalPredicates"
    }

    fn description(&self) -> &'static str {
        "Simplify AND/OR/NOT/IF with constant or duplicated operands"
    }

    fn apply(&self, plan: LogicalPlan) -> Transformed<LogicalPlan> {
        plan.transform_all_expressions_down(simplify)
    }
}

fn simplify(e: Expr) -> Transformed<Expr> {
    match e {
        Expr::Binary {
            op: BinaryOp::And,
            left,
            right,
        } => match (left.as_bool_literal(), right.as_bool_literal()) {
            (Some(false), _) => Transformed::yes(*left),
            (_, Some(false)) => Transformed::yes(*right),
            (Some(true), _) => Transformed::yes(*right),
            (_, Some(true)) => Transformed::yes(*left),
            _ if left == right && left.pure() => Transformed::yes(*left),
            _ => Transformed::no(Expr::Binary {
                op: BinaryOp::And,
                left,
                right,
            }),
        },
        Expr::Binary {
            op: BinaryOp::Or,
            left,
            right,
        } => match (left.as_bool_literal(), right.as_bool_literal()) {
            (Some(true), _) => Transformed::yes(*left),
            (_, Some(true)) => Transformed::yes(*right),
            (Some(false), _) => Transformed::yes(*right),
            (_, Some(false)) => Transformed::yes(*left),
            _ if left == right && left.pure() => Transformed::yes(*left),
            _ => Transformed::no(Expr::Binary {
                op: BinaryOp::Or,
                left,
                right,
            }),
        },
        Expr::Unary {
            op: UnaryOp::Not,
            child,
        } => match child.as_bool_literal() {
            Some(b) => Transformed::yes(relopt_logical::lit(!b)),
            None => Transformed::no(Expr::Unary {
                op: UnaryOp::Not,
                child,
            }),
        },
        Expr::If {
            predicate,
            then,
            otherwise,
        } => {
            if predicate.as_bool_literal() == Some(true) {
                Transformed::yes(*then)
            } else if predicate.as_bool_literal() == Some(false) || predicate.is_null_literal() {
                Transformed::yes(*otherwise)
            } else if then == otherwise && predicate.pure() {
                Transformed::yes(*then)
            } else {
                Transformed::no(Expr::If {
                    predicate,
                    then,
                    otherwise,
                })
            }
        }
        Expr::Binary { op, left, right }
            if op.is_comparison() && left == right && is_stable_operand(&left) =>
        {
            let reflexive = matches!(op, BinaryOp::Eq | BinaryOp::LtEq | BinaryOp::GtEq);
            Transformed::yes(relopt_logical::lit(reflexive))
        }
        other => Transformed::no(other),
    }
}

// `x = x` is only true when `x` is deterministic, never null and never NaN.
fn is_stable_operand(e: &Expr) -> bool {
    e.pure()
        && !e.nullable()
        && e
            .data_type()
            .is_some_and(|t| !matches!(t, DataType::Float32 | DataType::Float64))
}

/// Drop filters that always pass and replace filters that never pass with an
/// empty relation of the same output.
pub struct EliminateConstantFilters;

impl Rule for EliminateConstantFilters {
    fn name(&self) -> &'static str {
        "EliminateConstantFilters"
    }

    fn description(&self) -> &'static str {
        "Remove always-true filters and empty out always-false ones"
    }

    fn apply(&self, plan: LogicalPlan) -> Transformed<LogicalPlan> {
        plan.transform_up(|node| match node {
            LogicalPlan::Filter { condition, input } => match constant_verdict(&condition) {
                Some(true) => Transformed::yes(*input),
                Some(false) => Transformed::yes(LogicalPlan::empty(input.output())),
                None => Transformed::no(LogicalPlan::Filter { condition, input }),
            },
            other => Transformed::no(other),
        })
    }
}

// A null condition filters every row, same as false.
fn constant_verdict(condition: &Expr) -> Option<bool> {
    match condition {
        Expr::Literal { value, .. } if value.is_null() => Some(false),
        Expr::Literal { value, .. } => value.as_bool(),
        _ => None,
    }
}
