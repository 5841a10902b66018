//! Expression trees.
//!
//! Expressions are immutable values. Attributes and aliases carry an `ExprId`;
//! references are matched by that id, never by name.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use relopt_core::id::ExprId;
use relopt_core::schema::Field;
use relopt_core::types::{DataType, Scalar};

use crate::tree::{Transformed, TreeNode};
use crate::window::WindowSpec;

/// Set of attribute identities an expression reads.
pub type AttributeSet = BTreeSet<ExprId>;

/// A bound column reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    pub id: ExprId,
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub nullable: bool,
    /// Relation names the attribute may be addressed through. Only meaningful
    /// before subqueries are eliminated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qualifiers: Vec<String>,
}

impl Attribute {
    /// A nullable attribute with a freshly minted id.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self::with_id(ExprId::fresh(), name, data_type)
    }

    pub fn with_id(id: ExprId, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id,
            name: name.into(),
            data_type,
            nullable: true,
            qualifiers: Vec::new(),
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_qualifiers(mut self, qualifiers: Vec<String>) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    pub fn to_expr(&self) -> Expr {
        Expr::Attribute(self.clone())
    }

    pub fn to_field(&self) -> Field {
        Field::new(self.id, self.name.clone(), self.data_type, self.nullable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_arithmetic(&self) -> bool {
        use BinaryOp::*;
        matches!(self, Add | Subtract | Multiply | Divide | Remainder)
    }

    pub fn is_comparison(&self) -> bool {
        use BinaryOp::*;
        matches!(self, Eq | NotEq | Lt | LtEq | Gt | GtEq)
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    /// The comparison `op'` with `!(a op b) == (a op' b)`.
    pub fn negated(&self) -> Option<BinaryOp> {
        use BinaryOp::*;
        Some(match self {
            Eq => NotEq,
            NotEq => Eq,
            Lt => GtEq,
            LtEq => Gt,
            Gt => LtEq,
            GtEq => Lt,
            _ => return None,
        })
    }

    pub fn symbol(&self) -> &'static str {
        use BinaryOp::*;
        match self {
            Add => "+",
            Subtract => "-",
            Multiply => "*",
            Divide => "/",
            Remainder => "%",
            Eq => "=",
            NotEq => "!=",
            Lt => "<",
            LtEq => "<=",
            Gt => ">",
            GtEq => ">=",
            And => "AND",
            Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    fn result_type(&self, input: DataType) -> Option<DataType> {
        use AggregateFunction::*;
        match self {
            Count => Some(DataType::Int64),
            Sum if input.is_integral() => Some(DataType::Int64),
            Sum if input.is_floating() => Some(DataType::Float64),
            Avg if input.is_numeric() => Some(DataType::Float64),
            Min | Max => Some(input),
            Sum | Avg => None,
        }
    }

    pub fn name(&self) -> &'static str {
        use AggregateFunction::*;
        match self {
            Count => "COUNT",
            Sum => "SUM",
            Avg => "AVG",
            Min => "MIN",
            Max => "MAX",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortOrder {
    pub child: Expr,
    #[serde(default = "default_true")]
    pub ascending: bool,
    #[serde(default)]
    pub nulls_first: bool,
}

fn default_true() -> bool {
    true
}

impl SortOrder {
    pub fn asc(child: Expr) -> Self {
        Self {
            child,
            ascending: true,
            nulls_first: true,
        }
    }

    pub fn desc(child: Expr) -> Self {
        Self {
            child,
            ascending: false,
            nulls_first: false,
        }
    }

    pub fn map_child<F>(self, f: &mut F) -> SortOrder
    where
        F: FnMut(Expr) -> Expr,
    {
        SortOrder {
            child: f(self.child),
            ascending: self.ascending,
            nulls_first: self.nulls_first,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    Literal {
        value: Scalar,
        data_type: DataType,
    },
    Attribute(Attribute),
    /// A name the analyzer has not bound yet. Never optimizable.
    Unresolved {
        name: String,
    },
    Alias {
        child: Box<Expr>,
        name: String,
        id: ExprId,
    },
    Cast {
        child: Box<Expr>,
        to: DataType,
    },
    Unary {
        op: UnaryOp,
        child: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    If {
        predicate: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Aggregate {
        func: AggregateFunction,
        child: Box<Expr>,
        #[serde(default)]
        distinct: bool,
    },
    /// An engine function the optimizer cannot evaluate; `pure == false` marks
    /// side-effecting or non-deterministic calls such as `rand()`.
    Function {
        name: String,
        args: Vec<Expr>,
        return_type: DataType,
        pure: bool,
    },
    Window {
        function: Box<Expr>,
        spec: WindowSpec,
    },
}

/// Literal of the value's natural type. A bare `Scalar::Null` becomes a
/// boolean null; use [`Expr::null`] for other types.
pub fn lit(value: impl Into<Scalar>) -> Expr {
    let value = value.into();
    let data_type = value.data_type().unwrap_or(DataType::Boolean);
    Expr::Literal { value, data_type }
}

impl Expr {
    pub fn null(data_type: DataType) -> Expr {
        Expr::Literal {
            value: Scalar::Null,
            data_type,
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, child: Expr) -> Expr {
        Expr::Unary {
            op,
            child: Box::new(child),
        }
    }

    pub fn and(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::And, self, other)
    }

    pub fn or(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Or, self, other)
    }

    pub fn not(self) -> Expr {
        Expr::unary(UnaryOp::Not, self)
    }

    pub fn negate(self) -> Expr {
        Expr::unary(UnaryOp::Negate, self)
    }

    pub fn is_null(self) -> Expr {
        Expr::unary(UnaryOp::IsNull, self)
    }

    pub fn is_not_null(self) -> Expr {
        Expr::unary(UnaryOp::IsNotNull, self)
    }

    pub fn equal(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Eq, self, other)
    }

    pub fn not_equal(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::NotEq, self, other)
    }

    pub fn lt(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Lt, self, other)
    }

    pub fn lt_eq(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::LtEq, self, other)
    }

    pub fn gt(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Gt, self, other)
    }

    pub fn gt_eq(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::GtEq, self, other)
    }

    pub fn add(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Add, self, other)
    }

    pub fn sub(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Subtract, self, other)
    }

    pub fn mul(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Multiply, self, other)
    }

    pub fn div(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Divide, self, other)
    }

    pub fn rem(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Remainder, self, other)
    }

    pub fn cast(self, to: DataType) -> Expr {
        Expr::Cast {
            child: Box::new(self),
            to,
        }
    }

    pub fn if_then(predicate: Expr, then: Expr, otherwise: Expr) -> Expr {
        Expr::If {
            predicate: Box::new(predicate),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn aggregate(func: AggregateFunction, child: Expr) -> Expr {
        Expr::Aggregate {
            func,
            child: Box::new(child),
            distinct: false,
        }
    }

    /// Name the expression with a fresh id.
    pub fn alias(self, name: impl Into<String>) -> Expr {
        self.alias_with_id(name, ExprId::fresh())
    }

    pub fn alias_with_id(self, name: impl Into<String>, id: ExprId) -> Expr {
        Expr::Alias {
            child: Box::new(self),
            name: name.into(),
            id,
        }
    }

    /// The value of a boolean literal.
    pub fn as_bool_literal(&self) -> Option<bool> {
        match self {
            Expr::Literal { value, .. } => value.as_bool(),
            _ => None,
        }
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(self, Expr::Literal { value: Scalar::Null, .. })
    }

    /// Resolved type; `None` while any part of the tree is unbound or
    /// ill-typed.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Expr::Literal { value, data_type } => match value.data_type() {
                None => Some(*data_type),
                Some(t) if t == *data_type => Some(t),
                Some(_) => None,
            },
            Expr::Attribute(a) => Some(a.data_type),
            Expr::Unresolved { .. } => None,
            Expr::Alias { child, .. } => child.data_type(),
            Expr::Cast { child, to } => child.data_type().map(|_| *to),
            Expr::Unary { op, child } => {
                let t = child.data_type()?;
                match op {
                    UnaryOp::Not => (t == DataType::Boolean).then_some(t),
                    UnaryOp::Negate => t.is_numeric().then_some(t),
                    UnaryOp::IsNull | UnaryOp::IsNotNull => Some(DataType::Boolean),
                }
            }
            Expr::Binary { op, left, right } => {
                let l = left.data_type()?;
                if right.data_type()? != l {
                    return None;
                }
                if op.is_arithmetic() {
                    l.is_numeric().then_some(l)
                } else if op.is_comparison() {
                    Some(DataType::Boolean)
                } else {
                    (l == DataType::Boolean).then_some(l)
                }
            }
            Expr::If {
                predicate,
                then,
                otherwise,
            } => {
                if predicate.data_type()? != DataType::Boolean {
                    return None;
                }
                let t = then.data_type()?;
                (otherwise.data_type()? == t).then_some(t)
            }
            Expr::Aggregate { func, child, .. } => func.result_type(child.data_type()?),
            Expr::Function {
                args, return_type, ..
            } => {
                for arg in args {
                    arg.data_type()?;
                }
                Some(*return_type)
            }
            Expr::Window { function, spec } => {
                for e in spec.expressions() {
                    e.data_type()?;
                }
                function.data_type()
            }
        }
    }

    pub fn resolved(&self) -> bool {
        self.data_type().is_some()
    }

    pub fn nullable(&self) -> bool {
        match self {
            Expr::Literal { value, .. } => value.is_null(),
            Expr::Attribute(a) => a.nullable,
            Expr::Unresolved { .. } => true,
            Expr::Alias { child, .. } => child.nullable(),
            // Parsing a string yields null on malformed input.
            Expr::Cast { child, to } => {
                child.nullable()
                    || child
                        .data_type()
                        .map_or(true, |from| !from.widens_losslessly_to(*to))
            }
            Expr::Unary { op, child } => match op {
                UnaryOp::IsNull | UnaryOp::IsNotNull => false,
                UnaryOp::Not | UnaryOp::Negate => child.nullable(),
            },
            Expr::Binary { op, left, right } => {
                matches!(op, BinaryOp::Divide | BinaryOp::Remainder)
                    || left.nullable()
                    || right.nullable()
            }
            Expr::If {
                then, otherwise, ..
            } => then.nullable() || otherwise.nullable(),
            Expr::Aggregate { func, .. } => !matches!(func, AggregateFunction::Count),
            Expr::Function { .. } | Expr::Window { .. } => true,
        }
    }

    /// Computable without any row input.
    pub fn foldable(&self) -> bool {
        match self {
            Expr::Literal { .. } => true,
            Expr::Attribute(_)
            | Expr::Unresolved { .. }
            | Expr::Alias { .. }
            | Expr::Aggregate { .. }
            | Expr::Function { .. }
            | Expr::Window { .. } => false,
            Expr::Cast { .. } | Expr::Unary { .. } | Expr::Binary { .. } | Expr::If { .. } => {
                self.children().into_iter().all(Expr::foldable)
            }
        }
    }

    /// Deterministic and side-effect free, so safe to duplicate, reorder or
    /// relocate.
    pub fn pure(&self) -> bool {
        !self.exists(|e| matches!(e, Expr::Function { pure: false, .. }))
    }

    /// True for aggregate or window calls, which only have meaning at the
    /// operator that computes them.
    pub fn contains_aggregate_or_window(&self) -> bool {
        self.exists(|e| matches!(e, Expr::Aggregate { .. } | Expr::Window { .. }))
    }

    pub fn references(&self) -> AttributeSet {
        let mut refs = AttributeSet::new();
        self.apply(&mut |e: &Expr| {
            if let Expr::Attribute(a) = e {
                refs.insert(a.id);
            }
        });
        refs
    }

    /// The id this expression defines or refers to, for named expressions.
    pub fn expr_id(&self) -> Option<ExprId> {
        match self {
            Expr::Attribute(a) => Some(a.id),
            Expr::Alias { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// The attribute a named expression produces in an operator's output.
    pub fn to_attribute(&self) -> Option<Attribute> {
        match self {
            Expr::Attribute(a) => Some(a.clone()),
            Expr::Alias { child, name, id } => Some(Attribute {
                id: *id,
                name: name.clone(),
                data_type: child.data_type()?,
                nullable: child.nullable(),
                qualifiers: Vec::new(),
            }),
            _ => None,
        }
    }

    /// Drop a top-level alias.
    pub fn unalias(self) -> Expr {
        match self {
            Expr::Alias { child, .. } => *child,
            other => other,
        }
    }
}

impl TreeNode for Expr {
    fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Literal { .. } | Expr::Attribute(_) | Expr::Unresolved { .. } => vec![],
            Expr::Alias { child, .. }
            | Expr::Cast { child, .. }
            | Expr::Unary { child, .. }
            | Expr::Aggregate { child, .. } => vec![child.as_ref()],
            Expr::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expr::If {
                predicate,
                then,
                otherwise,
            } => vec![predicate.as_ref(), then.as_ref(), otherwise.as_ref()],
            Expr::Function { args, .. } => args.iter().collect(),
            Expr::Window { function, spec } => {
                let mut children = vec![function.as_ref()];
                children.extend(spec.expressions());
                children
            }
        }
    }

    fn map_children<F>(self, mut f: F) -> Transformed<Expr>
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
            Expr::Literal { .. } | Expr::Attribute(_) | Expr::Unresolved { .. } => {
                return Transformed::no(self)
            }
            Expr::Alias { child, name, id } => Expr::Alias {
                child: Box::new(go(*child)),
                name,
                id,
            },
            Expr::Cast { child, to } => Expr::Cast {
                child: Box::new(go(*child)),
                to,
            },
            Expr::Unary { op, child } => Expr::Unary {
                op,
                child: Box::new(go(*child)),
            },
            Expr::Binary { op, left, right } => {
                let left = Box::new(go(*left));
                let right = Box::new(go(*right));
                Expr::Binary { op, left, right }
            }
            Expr::If {
                predicate,
                then,
                otherwise,
            } => {
                let predicate = Box::new(go(*predicate));
                let then = Box::new(go(*then));
                let otherwise = Box::new(go(*otherwise));
                Expr::If {
                    predicate,
                    then,
                    otherwise,
                }
            }
            Expr::Aggregate {
                func,
                child,
                distinct,
            } => Expr::Aggregate {
                func,
                child: Box::new(go(*child)),
                distinct,
            },
            Expr::Function {
                name,
                args,
                return_type,
                pure,
            } => Expr::Function {
                name,
                args: args.into_iter().map(&mut go).collect(),
                return_type,
                pure,
            },
            Expr::Window { function, spec } => {
                let function = Box::new(go(*function));
                let spec = spec.map_expressions(&mut go);
                Expr::Window { function, spec }
            }
        };
        Transformed::new(data, changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(name: &str) -> Attribute {
        Attribute::new(name, DataType::Int64)
    }

    #[test]
    fn types_follow_operators() {
        let a = int("a").to_expr();
        assert_eq!(a.clone().add(lit(1i64)).data_type(), Some(DataType::Int64));
        assert_eq!(a.clone().gt(lit(1i64)).data_type(), Some(DataType::Boolean));
        // Mixed operand types are the analyzer's job; left alone they are unresolved.
        assert_eq!(a.clone().add(lit(1i32)).data_type(), None);
        assert_eq!(
            Expr::aggregate(AggregateFunction::Avg, a).data_type(),
            Some(DataType::Float64)
        );
        assert_eq!(
            Expr::Unresolved { name: "x".into() }.data_type(),
            None
        );
    }

    #[test]
    fn foldable_and_pure() {
        let a = int("a").to_expr();
        assert!(lit(1i64).add(lit(2i64)).foldable());
        assert!(!a.clone().add(lit(2i64)).foldable());
        assert!(!lit(1i64).alias("one").foldable());

        let rand = Expr::Function {
            name: "rand".into(),
            args: vec![],
            return_type: DataType::Float64,
            pure: false,
        };
        assert!(!rand.clone().gt(lit(0.5f64)).pure());
        assert!(a.gt(lit(1i64)).pure());
    }

    #[test]
    fn references_collect_ids() {
        let a = int("a");
        let b = int("b");
        let e = a.to_expr().add(b.to_expr()).alias("s");
        let refs = e.references();
        assert_eq!(refs.len(), 2);
        assert!(refs.contains(&a.id) && refs.contains(&b.id));
        // An alias defines its id; it does not read it.
        assert!(!refs.contains(&e.expr_id().unwrap()));
    }

    #[test]
    fn alias_to_attribute_keeps_identity() {
        let a = int("a").not_null();
        let e = a.to_expr().add(lit(1i64)).alias("a1");
        let attr = e.to_attribute().unwrap();
        assert_eq!(attr.id, e.expr_id().unwrap());
        assert_eq!(attr.name, "a1");
        assert_eq!(attr.data_type, DataType::Int64);
        assert!(!attr.nullable);
    }

    #[test]
    fn cast_nullability_tracks_failure_modes() {
        let s = Attribute::new("s", DataType::Utf8).not_null();
        let i = Attribute::new("i", DataType::Int32).not_null();
        // Malformed strings cast to null.
        assert!(s.to_expr().cast(DataType::Int64).nullable());
        assert!(!i.to_expr().cast(DataType::Int32).nullable());
        assert!(!i.to_expr().cast(DataType::Int64).nullable());
        assert!(i.to_expr().cast(DataType::Utf8).nullable());
        assert!(int("n").to_expr().cast(DataType::Float64).nullable());
    }

    #[test]
    fn negated_comparisons_round_trip() {
        for op in [
            BinaryOp::Eq,
            BinaryOp::NotEq,
            BinaryOp::Lt,
            BinaryOp::LtEq,
            BinaryOp::Gt,
            BinaryOp::GtEq,
        ] {
            assert_eq!(op.negated().and_then(|n| n.negated()), Some(op));
        }
        assert_eq!(BinaryOp::And.negated(), None);
    }

    #[test]
    fn window_children_are_traversed() {
        let a = int("a");
        let b = int("b");
        let w = Expr::Window {
            function: Box::new(Expr::aggregate(AggregateFunction::Sum, a.to_expr())),
            spec: WindowSpec {
                partition_by: vec![b.to_expr()],
                order_by: vec![SortOrder::asc(a.to_expr())],
                frame: None,
            },
        };
        assert_eq!(w.children().len(), 3);
        assert_eq!(w.data_type(), Some(DataType::Int64));
        assert!(w.contains_aggregate_or_window());
    }
}
