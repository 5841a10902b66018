//! The default optimizer: an explicit, ordered list of batches.

use relopt_core::config::OptimizerConfig;
use relopt_core::error::Result;
use relopt_logical::LogicalPlan;

use crate::batch::{Batch, Strategy};
use crate::executor::{OptimizedPlan, RulesExecutor};
use crate::rules::{self, EliminateSubqueries};

/// The standard batch layout.
///
/// 1. `Subqueries`, once: subquery wrappers go before anything else looks at
///    the plan.
/// 2. `Operator Optimizations`, to a fixed point: folding, normalization,
///    cleanup, then pushdown. Unbounded unless the config caps iterations.
pub fn default_batches(config: &OptimizerConfig) -> Vec<Batch> {
    let fixed_point = Strategy::FixedPoint {
        max_iterations: config.max_iterations,
    };
    vec![
        Batch::new("Subqueries", Strategy::Once, vec![Box::new(EliminateSubqueries)]),
        Batch::new(
            "Operator Optimizations",
            fixed_point,
            rules::operator_optimizations(),
        ),
    ]
}

pub struct Optimizer {
    batches: Vec<Batch>,
    config: OptimizerConfig,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}

impl Optimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            batches: default_batches(&config),
            config,
        }
    }

    /// Replace the batch layout, keeping the config.
    pub fn with_batches(mut self, batches: Vec<Batch>) -> Self {
        self.batches = batches;
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// `(batch name, strategy, rule names)` in execution order.
    pub fn layout(&self) -> Vec<(String, Strategy, Vec<&'static str>)> {
        self.batches
            .iter()
            .map(|b| (b.name.clone(), b.strategy, b.rule_names()))
            .collect()
    }

    pub fn optimize(&self, plan: LogicalPlan) -> Result<LogicalPlan> {
        Ok(self.optimize_with_report(plan)?.plan)
    }

    pub fn optimize_with_report(&self, plan: LogicalPlan) -> Result<OptimizedPlan> {
        RulesExecutor::new(&self.batches, &self.config).execute(plan)
    }
}

/// Optimize with the default batches and config.
pub fn optimize(plan: LogicalPlan) -> Result<LogicalPlan> {
    Optimizer::default().optimize(plan)
}
