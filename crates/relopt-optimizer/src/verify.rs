//! Post-batch sanity checks.
//!
//! Every rule must keep the plan resolved and keep its output schema
//! equivalent to the input's. A violation is a rule bug, reported as
//! `Error::Invariant` naming the batch that introduced it.

use relopt_core::error::{Error, Result};
use relopt_core::schema::Schema;
use relopt_logical::LogicalPlan;

pub fn check_batch_output(batch: &str, expected: &Schema, plan: &LogicalPlan) -> Result<()> {
    if let Some(reason) = plan.resolution_error() {
        return Err(Error::Invariant(format!(
            "batch '{batch}' produced an unresolved plan: {reason}"
        )));
    }
    let actual = plan.schema();
    if !actual.is_equivalent(expected) {
        let render = |s: &Schema| {
            s.fields
                .iter()
                .map(|f| format!("{}#{}:{}", f.name, f.id.get(), f.data_type))
                .collect::<Vec<_>>()
                .join(", ")
        };
        return Err(Error::Invariant(format!(
            "batch '{batch}' changed the output schema from [{}] to [{}]",
            render(expected),
            render(&actual)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relopt_core::types::DataType;
    use relopt_logical::{lit, Attribute};

    #[test]
    fn test_schema_change_is_invariant_error() {
        let a = Attribute::new("a", DataType::Int64);
        let b = Attribute::new("b", DataType::Int64);
        let t = LogicalPlan::relation("t", vec![a.clone(), b]);
        let expected = t.schema();
        assert!(check_batch_output("x", &expected, &t).is_ok());

        let narrowed = t.project(vec![a.to_expr()]);
        let err = check_batch_output("x", &expected, &narrowed).unwrap_err();
        assert!(matches!(err, Error::Invariant(ref m) if m.contains("'x'")));
    }

    #[test]
    fn test_unresolved_output_is_invariant_error() {
        let a = Attribute::new("a", DataType::Int64);
        let t = LogicalPlan::relation("t", vec![a]);
        let expected = t.schema();
        let bad = t.filter(lit(1i64));
        assert!(matches!(
            check_batch_output("x", &expected, &bad),
            Err(Error::Invariant(_))
        ));
    }
}
