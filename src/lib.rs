#![forbid(unsafe_code)]
//! relopt: a rule-based rewriter for resolved logical query plans.
//!
//! This crate stitches the workspace together for tests and benches:
//! - `relopt_core`: types, ids, schemas, config, errors, hashing
//! - `relopt_logical`: expression and plan trees, the rewrite kernel, predicate algebra
//! - `relopt_optimizer`: rules, batches, and the fixed-point executor
//!
//! ```ignore
//! let optimized = relopt::optimize(plan)?;
//! ```

pub use relopt_core;
pub use relopt_logical;
pub use relopt_optimizer;

pub use relopt_core::prelude::*;
pub use relopt_logical::{
    lit, AggregateFunction, Attribute, BinaryOp, Expr, JoinType, LogicalPlan, SortOrder,
    Transformed, TreeNode, UnaryOp,
};
pub use relopt_optimizer::{
    optimize, Batch, BatchOutcome, OptimizedPlan, Optimizer, Rule, RulesExecutor, Strategy,
};
