//! Negation pushdown and conjunctive normal form.

use relopt_logical::predicate::{is_cnf, to_cnf};
use relopt_logical::{BinaryOp, Expr, LogicalPlan, Transformed, TreeNode, UnaryOp};

use crate::rule::Rule;

/// Cancel or push down `NOT` using De Morgan's laws, comparison inversion and
/// null-check inversion.
pub struct ReduceNegations;

impl Rule for ReduceNegations {
    fn name(&self) -> &'static str {
        "ReduceNegations"
    }

    fn description(&self) -> &'static str {
        "Push NOT into comparisons, conjunctions, null checks and IF branches"
    }

    fn apply(&self, plan: LogicalPlan) -> Transformed<LogicalPlan> {
        plan.transform_all_expressions_down(reduce_negation)
    }
}

pub(crate) fn reduce_negation(e: Expr) -> Transformed<Expr> {
    match e {
        Expr::Unary {
            op: UnaryOp::Not,
            child,
        } => push_not(*child),
        Expr::If {
            predicate,
            then,
            otherwise,
        } => match *predicate {
            // Only safe when the condition is never null: a null condition
            // takes the else branch both before and after negation.
            Expr::Unary {
                op: UnaryOp::Not,
                child,
            } if !child.nullable() => Transformed::yes(Expr::If {
                predicate: child,
                then: otherwise,
                otherwise: then,
            }),
            predicate => Transformed::no(Expr::If {
                predicate: Box::new(predicate),
                then,
                otherwise,
            }),
        },
        other => Transformed::no(other),
    }
}

// Rewrite `NOT child`.
fn push_not(child: Expr) -> Transformed<Expr> {
    match child {
        Expr::Unary {
            op: UnaryOp::Not,
            child,
        } => Transformed::yes(*child),
        Expr::Unary {
            op: UnaryOp::IsNull,
            child,
        } => Transformed::yes(Expr::Unary {
            op: UnaryOp::IsNotNull,
            child,
        }),
        Expr::Unary {
            op: UnaryOp::IsNotNull,
            child,
        } => Transformed::yes(Expr::Unary {
            op: UnaryOp::IsNull,
            child,
        }),
        Expr::Binary {
            op: BinaryOp::And,
            left,
            right,
        } => Transformed::yes((*left).not().or((*right).not())),
        Expr::Binary {
            op: BinaryOp::Or,
            left,
            right,
        } => Transformed::yes((*left).not().and((*right).not())),
        Expr::Binary { op, left, right } => match op.negated() {
            Some(inverse) => Transformed::yes(Expr::Binary {
                op: inverse,
                left,
                right,
            }),
            None => Transformed::no(Expr::Binary { op, left, right }.not()),
        },
        Expr::If {
            predicate,
            then,
            otherwise,
        } => Transformed::yes(Expr::If {
            predicate,
            then: Box::new((*then).not()),
            otherwise: Box::new((*otherwise).not()),
        }),
        other => Transformed::no(other.not()),
    }
}

/// Rewrite filter conditions into conjunctive normal form so later rules can
/// split them into independently movable conjuncts.
pub struct CNFConversion;

impl Rule for CNFConversion {
    fn name(&self) -> &'static str {
        "CNFConversion"
    }

    fn description(&self) -> &'static str {
        "Normalize filter conditions to conjunctive normal form"
    }

    fn apply(&self, plan: LogicalPlan) -> Transformed<LogicalPlan> {
        plan.transform_down(|node| match node {
            LogicalPlan::Filter { condition, input } if !is_cnf(&condition) => {
                Transformed::yes(LogicalPlan::Filter {
                    condition: to_cnf(condition),
                    input,
                })
            }
            other => Transformed::no(other),
        })
    }
}
