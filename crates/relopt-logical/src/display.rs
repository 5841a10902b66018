//! Human-readable rendering of expressions and plans.

use std::fmt::{self, Write as _};

use crate::expr::{Attribute, Expr, SortOrder, UnaryOp};
use crate::plan::LogicalPlan;
use crate::tree::TreeNode;

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for q in &self.qualifiers {
            write!(f, "{q}.")?;
        }
        write!(f, "{}{}", self.name, self.id)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal { value, .. } => write!(f, "{value}"),
            Expr::Attribute(a) => write!(f, "{a}"),
            Expr::Unresolved { name } => write!(f, "'{name}"),
            Expr::Alias { child, name, id } => write!(f, "{child} AS {name}{id}"),
            Expr::Cast { child, to } => write!(f, "CAST({child} AS {to})"),
            Expr::Unary { op, child } => match op {
                UnaryOp::Not => write!(f, "NOT {child}"),
                UnaryOp::Negate => write!(f, "-{child}"),
                UnaryOp::IsNull => write!(f, "{child} IS NULL"),
                UnaryOp::IsNotNull => write!(f, "{child} IS NOT NULL"),
            },
            Expr::Binary { op, left, right } => write!(f, "({left} {} {right})", op.symbol()),
            Expr::If {
                predicate,
                then,
                otherwise,
            } => write!(f, "IF({predicate}, {then}, {otherwise})"),
            Expr::Aggregate {
                func,
                child,
                distinct,
            } => {
                let d = if *distinct { "DISTINCT " } else { "" };
                write!(f, "{}({d}{child})", func.name())
            }
            Expr::Function { name, args, .. } => {
                write!(f, "{name}({})", join(args))
            }
            Expr::Window { function, spec } => write!(f, "{function} OVER ({spec})"),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = if self.ascending { "ASC" } else { "DESC" };
        let nulls = if self.nulls_first {
            "NULLS FIRST"
        } else {
            "NULLS LAST"
        };
        write!(f, "{} {dir} {nulls}", self.child)
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl LogicalPlan {
    /// One line describing this node without its children.
    pub fn describe(&self) -> String {
        match self {
            LogicalPlan::Relation { name, output } => {
                format!("Relation {name}[{}]", join(output))
            }
            LogicalPlan::LocalRelation { output, rows } => {
                format!("LocalRelation [{}], {} rows", join(output), rows.len())
            }
            LogicalPlan::Project { list, .. } => format!("Project [{}]", join(list)),
            LogicalPlan::Filter { condition, .. } => format!("Filter {condition}"),
            LogicalPlan::Join {
                join_type,
                condition,
                ..
            } => match condition {
                Some(c) => format!("Join {}, {c}", join_type.name()),
                None => format!("Join {}", join_type.name()),
            },
            LogicalPlan::Aggregate {
                group_by,
                aggregates,
                ..
            } => format!("Aggregate [{}], [{}]", join(group_by), join(aggregates)),
            LogicalPlan::Sort { order, .. } => format!("Sort [{}]", join(order)),
            LogicalPlan::Limit { count, .. } => format!("Limit {count}"),
            LogicalPlan::Union { .. } => "Union".to_string(),
            LogicalPlan::Subquery { alias, .. } => format!("Subquery {alias}"),
        }
    }

    /// Indented tree rendering, one node per line.
    pub fn explain(&self) -> String {
        let mut out = String::new();
        explain_into(self, 0, &mut out);
        out
    }
}

fn explain_into(plan: &LogicalPlan, depth: usize, out: &mut String) {
    if depth > 0 {
        out.push_str(&"   ".repeat(depth - 1));
        out.push_str("+- ");
    }
    let _ = writeln!(out, "{}", plan.describe());
    for child in plan.children() {
        explain_into(child, depth + 1, out);
    }
}

impl fmt::Display for LogicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.explain().trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{lit, AggregateFunction};
    use relopt_core::id::ExprId;
    use relopt_core::types::DataType;

    #[test]
    fn expression_rendering() {
        let a = Attribute::with_id(ExprId::new(1), "a", DataType::Int64);
        let e = a.to_expr().add(lit(1i64)).gt(lit(3i64)).not();
        assert_eq!(e.to_string(), "NOT ((a#1 + 1L) > 3L)");

        let s = Expr::aggregate(AggregateFunction::Sum, a.to_expr())
            .alias_with_id("total", ExprId::new(9));
        assert_eq!(s.to_string(), "SUM(a#1) AS total#9");

        let q = a.with_qualifiers(vec!["t".into()]);
        assert_eq!(q.to_expr().cast(DataType::Utf8).to_string(), "CAST(t.a#1 AS string)");
    }

    #[test]
    fn explain_indents_children() {
        let a = Attribute::with_id(ExprId::new(1), "a", DataType::Int64);
        let plan = LogicalPlan::relation("t", vec![a.clone()])
            .filter(a.to_expr().gt(lit(1i64)))
            .limit(5);
        assert_eq!(
            plan.explain(),
            "Limit 5\n+- Filter (a#1 > 1L)\n   +- Relation t[a#1]\n"
        );
    }
}
