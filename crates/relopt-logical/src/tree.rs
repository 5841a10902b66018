//! Generic rewrite kernel over immutable trees.
//!
//! Every rewrite consumes a tree and returns a new one wrapped in
//! [`Transformed`]. A rewrite function that matches nothing must hand its input
//! back untouched with `transformed == false`; the traversals preserve that, so
//! a pass that fires nowhere returns a value-identical tree. The fixed-point
//! executor depends on this to detect convergence.

/// A rewritten value plus whether anything actually changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed<T> {
    pub data: T,
    pub transformed: bool,
}

impl<T> Transformed<T> {
    pub fn new(data: T, transformed: bool) -> Self {
        Self { data, transformed }
    }

    /// The value was rewritten.
    pub fn yes(data: T) -> Self {
        Self::new(data, true)
    }

    /// The value is the unchanged input.
    pub fn no(data: T) -> Self {
        Self::new(data, false)
    }

    /// Fold an earlier change flag into this one.
    pub fn or(mut self, transformed: bool) -> Self {
        self.transformed |= transformed;
        self
    }

    pub fn map_data<U>(self, f: impl FnOnce(T) -> U) -> Transformed<U> {
        Transformed::new(f(self.data), self.transformed)
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

/// A node in an immutable tree with an ordered, fixed-arity list of children.
pub trait TreeNode: Sized {
    /// Direct children in order.
    fn children(&self) -> Vec<&Self>;

    /// Apply `f` once to each direct child and rebuild this node around the
    /// results. Arity and order are preserved.
    fn map_children<F>(self, f: F) -> Transformed<Self>
    where
        F: FnMut(Self) -> Transformed<Self>;

    /// Pre-order rewrite: `f` runs on a node before its children, and the
    /// traversal continues into the children of whatever `f` returned.
    fn transform_down<F>(self, mut f: F) -> Transformed<Self>
    where
        F: FnMut(Self) -> Transformed<Self>,
    {
        transform_down_impl(self, &mut f)
    }

    /// Post-order rewrite: children are rewritten first, the node is rebuilt
    /// from them, then `f` runs on the rebuilt node.
    fn transform_up<F>(self, mut f: F) -> Transformed<Self>
    where
        F: FnMut(Self) -> Transformed<Self>,
    {
        transform_up_impl(self, &mut f)
    }

    /// Pre-order read-only visit.
    fn apply<F>(&self, f: &mut F)
    where
        F: FnMut(&Self),
    {
        f(self);
        for child in self.children() {
            child.apply(f);
        }
    }

    /// True if any node in the tree satisfies `pred`.
    fn exists<F>(&self, mut pred: F) -> bool
    where
        F: FnMut(&Self) -> bool,
    {
        exists_impl(self, &mut pred)
    }

    fn node_count(&self) -> usize {
        let mut n = 0;
        self.apply(&mut |_: &Self| n += 1);
        n
    }
}

fn transform_down_impl<N, F>(node: N, f: &mut F) -> Transformed<N>
where
    N: TreeNode,
    F: FnMut(N) -> Transformed<N>,
{
    let Transformed { data, transformed } = f(node);
    data.map_children(|child| transform_down_impl(child, f))
        .or(transformed)
}

fn transform_up_impl<N, F>(node: N, f: &mut F) -> Transformed<N>
where
    N: TreeNode,
    F: FnMut(N) -> Transformed<N>,
{
    let Transformed { data, transformed } =
        node.map_children(|child| transform_up_impl(child, f));
    f(data).or(transformed)
}

fn exists_impl<N, F>(node: &N, pred: &mut F) -> bool
where
    N: TreeNode,
    F: FnMut(&N) -> bool,
{
    pred(node) || node.children().into_iter().any(|c| exists_impl(c, pred))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{lit, Attribute, BinaryOp, Expr};
    use relopt_core::types::{DataType, Scalar};

    fn x() -> Expr {
        Attribute::new("x", DataType::Int64).to_expr()
    }

    #[test]
    fn unmatched_rewrite_is_identity() {
        let e = x().add(lit(1i64)).gt(lit(3i64));
        let out = e.clone().transform_down(Transformed::no);
        assert!(!out.transformed);
        assert_eq!(out.data, e);

        let out = e.clone().transform_up(Transformed::no);
        assert!(!out.transformed);
        assert_eq!(out.data, e);
    }

    #[test]
    fn down_visits_rewritten_children() {
        // (1 + 2) rewritten to a Multiply at the root; the new children are
        // then visited, so the literal bump applies to both operands.
        let e = lit(1i64).add(lit(2i64));
        let out = e.transform_down(|n| match n {
            Expr::Binary {
                op: BinaryOp::Add,
                left,
                right,
            } => Transformed::yes(Expr::Binary {
                op: BinaryOp::Multiply,
                left,
                right,
            }),
            Expr::Literal {
                value: Scalar::I64(v),
                data_type,
            } if v < 10 => Transformed::yes(Expr::Literal {
                value: Scalar::I64(v + 10),
                data_type,
            }),
            other => Transformed::no(other),
        });
        assert!(out.transformed);
        assert_eq!(out.data, lit(11i64).mul(lit(12i64)));
    }

    #[test]
    fn up_sees_rebuilt_children() {
        let mut seen = Vec::new();
        let e = lit(1i64).add(lit(2i64));
        let _ = e.transform_up(|n| {
            seen.push(n.to_string());
            Transformed::no(n)
        });
        assert_eq!(seen, vec!["1L", "2L", "(1L + 2L)"]);
    }

    #[test]
    fn exists_and_count() {
        let e = x().add(lit(1i64)).gt(lit(3i64));
        assert_eq!(e.node_count(), 5);
        assert!(e.exists(|n| matches!(n, Expr::Attribute(_))));
        assert!(!e.exists(|n| matches!(n, Expr::Alias { .. })));
    }
}
