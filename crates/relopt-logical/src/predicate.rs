//! Boolean formula normalization and conjunct bookkeeping.
//!
//! Conversion to CNF is unbounded: distributing `OR` over `AND` can grow a
//! formula exponentially in its nesting depth, and no cap is applied.

use std::collections::BTreeSet;

use relopt_core::id::ExprId;

use crate::expr::{BinaryOp, Expr, UnaryOp};

fn is_connective(e: &Expr) -> bool {
    matches!(
        e,
        Expr::Binary {
            op: BinaryOp::And | BinaryOp::Or,
            ..
        } | Expr::Unary {
            op: UnaryOp::Not,
            ..
        }
    )
}

/// Push every `NOT` down to the atoms.
pub fn negation_normal_form(e: Expr) -> Expr {
    match e {
        Expr::Binary { op, left, right } if op.is_logical() => {
            Expr::binary(op, negation_normal_form(*left), negation_normal_form(*right))
        }
        Expr::Unary {
            op: UnaryOp::Not,
            child,
        } => negate(*child),
        other => other,
    }
}

// NNF of `NOT e`.
fn negate(e: Expr) -> Expr {
    match e {
        Expr::Unary {
            op: UnaryOp::Not,
            child,
        } => negation_normal_form(*child),
        Expr::Binary {
            op: BinaryOp::And,
            left,
            right,
        } => negate(*left).or(negate(*right)),
        Expr::Binary {
            op: BinaryOp::Or,
            left,
            right,
        } => negate(*left).and(negate(*right)),
        Expr::Binary { op, left, right } if op.is_comparison() => match op.negated() {
            Some(inverse) => Expr::Binary {
                op: inverse,
                left,
                right,
            },
            None => Expr::Binary { op, left, right }.not(),
        },
        Expr::Unary {
            op: UnaryOp::IsNull,
            child,
        } => Expr::unary(UnaryOp::IsNotNull, *child),
        Expr::Unary {
            op: UnaryOp::IsNotNull,
            child,
        } => Expr::unary(UnaryOp::IsNull, *child),
        other => other.not(),
    }
}

/// Rewrite into a conjunction of disjunctions of (possibly negated) atoms.
pub fn to_cnf(e: Expr) -> Expr {
    distribute(negation_normal_form(e))
}

fn distribute(e: Expr) -> Expr {
    match e {
        Expr::Binary {
            op: BinaryOp::And,
            left,
            right,
        } => distribute(*left).and(distribute(*right)),
        Expr::Binary {
            op: BinaryOp::Or,
            left,
            right,
        } => {
            let left = split_conjunction(distribute(*left));
            let right = split_conjunction(distribute(*right));
            let mut clauses = Vec::with_capacity(left.len() * right.len());
            for l in &left {
                for r in &right {
                    clauses.push(l.clone().or(r.clone()));
                }
            }
            // Both sides are non-empty, so at least one clause exists.
            conjoin(clauses).unwrap_or_else(lit_true)
        }
        other => other,
    }
}

fn lit_true() -> Expr {
    crate::expr::lit(true)
}

/// True if no `NOT` sits over a connective and no `OR` has an `AND` operand.
pub fn is_cnf(e: &Expr) -> bool {
    split_conjunction_ref(e).into_iter().all(|clause| {
        split_disjunction_ref(clause)
            .into_iter()
            .all(|atom| match atom {
                Expr::Unary {
                    op: UnaryOp::Not,
                    child,
                } => !is_connective(child),
                other => !is_connective(other),
            })
    })
}

fn split_ref(e: &Expr, by: BinaryOp) -> Vec<&Expr> {
    let mut out = Vec::new();
    let mut stack = vec![e];
    while let Some(e) = stack.pop() {
        match e {
            Expr::Binary { op, left, right } if *op == by => {
                stack.push(right.as_ref());
                stack.push(left.as_ref());
            }
            other => out.push(other),
        }
    }
    out
}

pub fn split_conjunction_ref(e: &Expr) -> Vec<&Expr> {
    split_ref(e, BinaryOp::And)
}

pub fn split_disjunction_ref(e: &Expr) -> Vec<&Expr> {
    split_ref(e, BinaryOp::Or)
}

fn split_owned(e: Expr, by: BinaryOp, out: &mut Vec<Expr>) {
    match e {
        Expr::Binary { op, left, right } if op == by => {
            split_owned(*left, by, out);
            split_owned(*right, by, out);
        }
        other => out.push(other),
    }
}

/// Flatten a top-level `AND` chain, left to right.
pub fn split_conjunction(e: Expr) -> Vec<Expr> {
    let mut out = Vec::new();
    split_owned(e, BinaryOp::And, &mut out);
    out
}

pub fn split_disjunction(e: Expr) -> Vec<Expr> {
    let mut out = Vec::new();
    split_owned(e, BinaryOp::Or, &mut out);
    out
}

/// Left-associated `AND` of the predicates; `None` when there are none.
pub fn conjoin(preds: impl IntoIterator<Item = Expr>) -> Option<Expr> {
    preds.into_iter().reduce(Expr::and)
}

/// Predicates split by the side of a join they can be evaluated on.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Partitioned {
    pub left: Vec<Expr>,
    pub right: Vec<Expr>,
    /// References both sides, neither side, or something outside both.
    pub common: Vec<Expr>,
}

/// Bucket predicates by whether their references are a subset of `left` or
/// of `right`. A predicate that references nothing lands in `common`.
pub fn partition_by_references(
    preds: Vec<Expr>,
    left: &BTreeSet<ExprId>,
    right: &BTreeSet<ExprId>,
) -> Partitioned {
    let mut out = Partitioned::default();
    for p in preds {
        let refs = p.references();
        if refs.is_empty() {
            out.common.push(p);
        } else if refs.is_subset(left) {
            out.left.push(p);
        } else if refs.is_subset(right) {
            out.right.push(p);
        } else {
            out.common.push(p);
        }
    }
    out
}
