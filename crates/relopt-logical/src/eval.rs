//! Constant evaluation of foldable expressions.
//!
//! Semantics are SQL-like: nulls propagate through arithmetic and comparison,
//! `AND`/`OR` use three-valued logic, and division by zero yields null. Integer
//! overflow and meaningless casts are errors; callers that fold constants treat
//! an error as "leave the expression alone" so the engine reports it at runtime.

use std::cmp::Ordering;

use relopt_core::error::{Error, Result};
use relopt_core::types::{DataType, Scalar};

use crate::expr::{BinaryOp, Expr, UnaryOp};

impl Expr {
    /// Evaluate an expression that needs no row input.
    pub fn evaluate(&self) -> Result<Scalar> {
        match self {
            Expr::Literal { value, .. } => Ok(value.clone()),
            Expr::Cast { child, to } => cast(child.evaluate()?, *to),
            Expr::Unary { op, child } => unary(*op, child.evaluate()?),
            Expr::Binary { op, left, right } => match op {
                BinaryOp::And => and(left, right),
                BinaryOp::Or => or(left, right),
                _ => binary(*op, left.evaluate()?, right.evaluate()?),
            },
            Expr::If {
                predicate,
                then,
                otherwise,
            } => match predicate.evaluate()? {
                Scalar::Bool(true) => then.evaluate(),
                Scalar::Bool(false) | Scalar::Null => otherwise.evaluate(),
                other => Err(Error::Evaluation(format!(
                    "IF predicate evaluated to non-boolean {other}"
                ))),
            },
            other => Err(Error::Evaluation(format!(
                "expression is not foldable: {other}"
            ))),
        }
    }
}

fn expect_bool(v: Scalar) -> Result<Option<bool>> {
    match v {
        Scalar::Null => Ok(None),
        Scalar::Bool(b) => Ok(Some(b)),
        other => Err(Error::Evaluation(format!("expected boolean, got {other}"))),
    }
}

// Kleene logic: a definite false on either side wins regardless of nulls.
fn and(left: &Expr, right: &Expr) -> Result<Scalar> {
    let l = expect_bool(left.evaluate()?)?;
    if l == Some(false) {
        return Ok(Scalar::Bool(false));
    }
    let r = expect_bool(right.evaluate()?)?;
    Ok(match (l, r) {
        (_, Some(false)) => Scalar::Bool(false),
        (Some(true), Some(true)) => Scalar::Bool(true),
        _ => Scalar::Null,
    })
}

fn or(left: &Expr, right: &Expr) -> Result<Scalar> {
    let l = expect_bool(left.evaluate()?)?;
    if l == Some(true) {
        return Ok(Scalar::Bool(true));
    }
    let r = expect_bool(right.evaluate()?)?;
    Ok(match (l, r) {
        (_, Some(true)) => Scalar::Bool(true),
        (Some(false), Some(false)) => Scalar::Bool(false),
        _ => Scalar::Null,
    })
}

fn unary(op: UnaryOp, v: Scalar) -> Result<Scalar> {
    match op {
        UnaryOp::IsNull => Ok(Scalar::Bool(v.is_null())),
        UnaryOp::IsNotNull => Ok(Scalar::Bool(!v.is_null())),
        UnaryOp::Not => Ok(match expect_bool(v)? {
            Some(b) => Scalar::Bool(!b),
            None => Scalar::Null,
        }),
        UnaryOp::Negate => match v {
            Scalar::Null => Ok(Scalar::Null),
            Scalar::I32(x) => x.checked_neg().map(Scalar::I32).ok_or_else(overflow),
            Scalar::I64(x) => x.checked_neg().map(Scalar::I64).ok_or_else(overflow),
            Scalar::F32(x) => Ok(Scalar::F32(-x)),
            Scalar::F64(x) => Ok(Scalar::F64(-x)),
            other => Err(Error::Evaluation(format!("cannot negate {other}"))),
        },
    }
}

fn overflow() -> Error {
    Error::Evaluation("integer overflow".to_string())
}

macro_rules! checked_arith {
    ($op:expr, $a:expr, $b:expr, $variant:ident) => {{
        let (a, b) = ($a, $b);
        let out = match $op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Subtract => a.checked_sub(b),
            BinaryOp::Multiply => a.checked_mul(b),
            BinaryOp::Divide if b == 0 => return Ok(Scalar::Null),
            BinaryOp::Remainder if b == 0 => return Ok(Scalar::Null),
            BinaryOp::Divide => a.checked_div(b),
            BinaryOp::Remainder => a.checked_rem(b),
            _ => None,
        };
        out.map(Scalar::$variant).ok_or_else(overflow)
    }};
}

macro_rules! float_arith {
    ($op:expr, $a:expr, $b:expr, $variant:ident) => {{
        let (a, b) = ($a, $b);
        Ok(match $op {
            BinaryOp::Add => Scalar::$variant(a + b),
            BinaryOp::Subtract => Scalar::$variant(a - b),
            BinaryOp::Multiply => Scalar::$variant(a * b),
            BinaryOp::Divide | BinaryOp::Remainder if b == 0.0 => Scalar::Null,
            BinaryOp::Divide => Scalar::$variant(a / b),
            _ => Scalar::$variant(a % b),
        })
    }};
}

fn binary(op: BinaryOp, l: Scalar, r: Scalar) -> Result<Scalar> {
    if l.is_null() || r.is_null() {
        return Ok(Scalar::Null);
    }
    if op.is_comparison() {
        let ord = compare(&l, &r)?;
        let b = match op {
            BinaryOp::Eq => ord == Ordering::Equal,
            BinaryOp::NotEq => ord != Ordering::Equal,
            BinaryOp::Lt => ord == Ordering::Less,
            BinaryOp::LtEq => ord != Ordering::Greater,
            BinaryOp::Gt => ord == Ordering::Greater,
            _ => ord != Ordering::Less,
        };
        return Ok(Scalar::Bool(b));
    }
    match (l, r) {
        (Scalar::I32(a), Scalar::I32(b)) => checked_arith!(op, a, b, I32),
        (Scalar::I64(a), Scalar::I64(b)) => checked_arith!(op, a, b, I64),
        (Scalar::F32(a), Scalar::F32(b)) => float_arith!(op, a, b, F32),
        (Scalar::F64(a), Scalar::F64(b)) => float_arith!(op, a, b, F64),
        (l, r) => Err(Error::Evaluation(format!(
            "cannot apply {} to {l} and {r}",
            op.symbol()
        ))),
    }
}

fn compare(l: &Scalar, r: &Scalar) -> Result<Ordering> {
    let ord = match (l, r) {
        (Scalar::Bool(a), Scalar::Bool(b)) => Some(a.cmp(b)),
        (Scalar::I32(a), Scalar::I32(b)) => Some(a.cmp(b)),
        (Scalar::I64(a), Scalar::I64(b)) => Some(a.cmp(b)),
        (Scalar::F32(a), Scalar::F32(b)) => a.partial_cmp(b),
        (Scalar::F64(a), Scalar::F64(b)) => a.partial_cmp(b),
        (Scalar::Str(a), Scalar::Str(b)) => Some(a.cmp(b)),
        _ => {
            return Err(Error::Evaluation(format!("cannot compare {l} and {r}")));
        }
    };
    ord.ok_or_else(|| Error::Evaluation(format!("NaN in comparison of {l} and {r}")))
}

fn out_of_range(v: &Scalar, to: DataType) -> Error {
    Error::Evaluation(format!("{v} is out of range for {to}"))
}

fn float_to_i64(v: f64, original: &Scalar, to: DataType) -> Result<i64> {
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
    if v.is_finite() && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Ok(v.trunc() as i64)
    } else {
        Err(out_of_range(original, to))
    }
}

/// Cast a constant. Unparseable strings become null; lossy numeric
/// conversions that would change the value are errors.
pub fn cast(v: Scalar, to: DataType) -> Result<Scalar> {
    if v.is_null() || v.data_type() == Some(to) {
        return Ok(v);
    }
    match to {
        DataType::Boolean => Ok(match &v {
            Scalar::I32(x) => Scalar::Bool(*x != 0),
            Scalar::I64(x) => Scalar::Bool(*x != 0),
            Scalar::F32(x) => Scalar::Bool(*x != 0.0),
            Scalar::F64(x) => Scalar::Bool(*x != 0.0),
            Scalar::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Scalar::Bool(true),
                "false" | "f" | "0" => Scalar::Bool(false),
                _ => Scalar::Null,
            },
            _ => return Err(out_of_range(&v, to)),
        }),
        DataType::Int32 | DataType::Int64 => {
            let wide = match &v {
                Scalar::Bool(b) => i64::from(*b),
                Scalar::I32(x) => i64::from(*x),
                Scalar::I64(x) => *x,
                Scalar::F32(x) => float_to_i64(f64::from(*x), &v, to)?,
                Scalar::F64(x) => float_to_i64(*x, &v, to)?,
                Scalar::Str(s) => match s.trim().parse::<i64>() {
                    Ok(x) => x,
                    Err(_) => return Ok(Scalar::Null),
                },
                Scalar::Null => return Ok(Scalar::Null),
            };
            if to == DataType::Int64 {
                Ok(Scalar::I64(wide))
            } else {
                i32::try_from(wide)
                    .map(Scalar::I32)
                    .map_err(|_| out_of_range(&v, to))
            }
        }
        DataType::Float32 | DataType::Float64 => {
            let wide = match &v {
                Scalar::Bool(b) => f64::from(u8::from(*b)),
                Scalar::Str(s) => match s.trim().parse::<f64>() {
                    Ok(x) => x,
                    Err(_) => return Ok(Scalar::Null),
                },
                other => other.as_f64().ok_or_else(|| out_of_range(other, to))?,
            };
            if to == DataType::Float64 {
                Ok(Scalar::F64(wide))
            } else {
                let narrow = wide as f32;
                if wide.is_finite() && narrow.is_infinite() {
                    Err(out_of_range(&v, to))
                } else {
                    Ok(Scalar::F32(narrow))
                }
            }
        }
        DataType::Utf8 => match &v {
            Scalar::Bool(b) => Ok(Scalar::Str(b.to_string())),
            Scalar::I32(x) => Ok(Scalar::Str(x.to_string())),
            Scalar::I64(x) => Ok(Scalar::Str(x.to_string())),
            // Float formatting is engine-specific; leave it to runtime.
            other => Err(Error::Evaluation(format!(
                "refusing to fold {other} to string"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::lit;

    fn null_bool() -> Expr {
        Expr::null(DataType::Boolean)
    }

    #[test]
    fn arithmetic_and_comparison() {
        let e = lit(1i64).add(lit(-1i64)).equal(lit(0i64));
        assert_eq!(e.evaluate().unwrap(), Scalar::Bool(true));
        assert_eq!(
            lit(7i32).rem(lit(3i32)).evaluate().unwrap(),
            Scalar::I32(1)
        );
        assert_eq!(
            lit(1.5f64).mul(lit(2.0f64)).evaluate().unwrap(),
            Scalar::F64(3.0)
        );
    }

    #[test]
    fn division_by_zero_is_null() {
        assert_eq!(lit(1i64).div(lit(0i64)).evaluate().unwrap(), Scalar::Null);
        assert_eq!(
            lit(1.0f64).div(lit(0.0f64)).evaluate().unwrap(),
            Scalar::Null
        );
    }

    #[test]
    fn overflow_is_an_error() {
        let e = lit(i64::MAX).add(lit(1i64));
        assert!(matches!(e.evaluate(), Err(Error::Evaluation(_))));
        assert!(lit(i32::MIN).negate().evaluate().is_err());
    }

    #[test]
    fn three_valued_logic() {
        let t = || lit(true);
        let f = || lit(false);
        assert_eq!(null_bool().and(f()).evaluate().unwrap(), Scalar::Bool(false));
        assert_eq!(null_bool().and(t()).evaluate().unwrap(), Scalar::Null);
        assert_eq!(null_bool().or(t()).evaluate().unwrap(), Scalar::Bool(true));
        assert_eq!(null_bool().or(f()).evaluate().unwrap(), Scalar::Null);
        assert_eq!(null_bool().not().evaluate().unwrap(), Scalar::Null);
        assert_eq!(
            null_bool().is_null().evaluate().unwrap(),
            Scalar::Bool(true)
        );
    }

    #[test]
    fn nulls_propagate() {
        let e = Expr::null(DataType::Int64).add(lit(1i64)).gt(lit(0i64));
        assert_eq!(e.evaluate().unwrap(), Scalar::Null);
    }

    #[test]
    fn if_takes_else_on_null() {
        let e = Expr::if_then(null_bool(), lit(1i64), lit(2i64));
        assert_eq!(e.evaluate().unwrap(), Scalar::I64(2));
    }

    #[test]
    fn casts() {
        assert_eq!(cast(Scalar::I32(5), DataType::Int64).unwrap(), Scalar::I64(5));
        assert_eq!(cast(Scalar::F64(2.9), DataType::Int32).unwrap(), Scalar::I32(2));
        assert_eq!(cast("12".into(), DataType::Int64).unwrap(), Scalar::I64(12));
        assert_eq!(cast("x".into(), DataType::Int64).unwrap(), Scalar::Null);
        assert_eq!(cast(Scalar::I64(3), DataType::Utf8).unwrap(), Scalar::Str("3".into()));
        assert!(cast(Scalar::I64(i64::MAX), DataType::Int32).is_err());
        assert!(cast(Scalar::F64(f64::NAN), DataType::Int64).is_err());
        assert!(cast(Scalar::F64(1.0), DataType::Utf8).is_err());
    }

    #[test]
    fn non_foldable_is_rejected() {
        let a = crate::expr::Attribute::new("a", DataType::Int64).to_expr();
        assert!(a.add(lit(1i64)).evaluate().is_err());
    }

    #[test]
    fn nan_comparison_is_an_error() {
        let e = lit(f64::NAN).equal(lit(f64::NAN));
        assert!(e.evaluate().is_err());
    }
}
