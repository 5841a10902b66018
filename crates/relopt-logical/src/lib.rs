#![forbid(unsafe_code)]
//! relopt-logical: the trees the optimizer rewrites.
//!
//! - `tree`: the `TreeNode` rewrite kernel and `Transformed`
//! - `expr`: expression trees, attributes, builders
//! - `eval`: constant evaluation for folding
//! - `plan`: logical plan operators
//! - `predicate`: CNF normalization and conjunct partitioning
//! - `window`: window specifications carried inside expressions
//! - `display`: expression `Display` and plan explain output

pub mod display;
pub mod eval;
pub mod expr;
pub mod plan;
pub mod predicate;
pub mod tree;
pub mod window;

pub use expr::{lit, AggregateFunction, Attribute, BinaryOp, Expr, SortOrder, UnaryOp};
pub use plan::{JoinType, LogicalPlan};
pub use tree::{Transformed, TreeNode};
