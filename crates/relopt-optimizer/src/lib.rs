#![forbid(unsafe_code)]
//! relopt-optimizer: rule-based rewriting of resolved logical plans.
//!
//! - `rule`: the `Rule` trait
//! - `batch`: named rule groups and their iteration strategy
//! - `executor`: runs batches to a fixed point and reports what happened
//! - `rules`: the concrete rewrite rules
//! - `optimizer`: the default batch layout and entry points
//! - `verify`: post-batch resolution and schema checks
//!
//! Deterministic and single-threaded per call. An `Optimizer` holds no mutable
//! state and can be shared across threads.

pub mod batch;
mod events;
pub mod executor;
pub mod optimizer;
pub mod rule;
pub mod rules;
pub mod verify;

pub use batch::{Batch, Strategy};
pub use executor::{BatchOutcome, BatchReport, OptimizedPlan, RuleFiring, RulesExecutor};
pub use optimizer::{default_batches, optimize, Optimizer};
pub use rule::Rule;
