//! Runs batches of rules over a plan.
//!
//! Batches run strictly in order, each seeing the previous batch's output.
//! Within one pass every rule sees the output of the rule before it. A
//! fixed-point batch stops when a whole pass leaves the plan structurally
//! equal to the plan the pass started from.

use serde::Serialize;

use relopt_core::config::OptimizerConfig;
use relopt_core::error::{Error, Result};
use relopt_core::hash::{hash_serde, Hash256};
use relopt_logical::{LogicalPlan, TreeNode};

use crate::batch::{Batch, Strategy};
use crate::events;
use crate::verify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// A pass made no change after `iterations` passes.
    Converged { iterations: usize },
    /// The iteration cap was reached while the plan was still changing.
    NonConverged { iterations: usize },
    SinglePass,
}

impl BatchOutcome {
    pub fn iterations(&self) -> usize {
        match self {
            BatchOutcome::Converged { iterations } | BatchOutcome::NonConverged { iterations } => {
                *iterations
            }
            BatchOutcome::SinglePass => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BatchOutcome::Converged { .. } => "converged",
            BatchOutcome::NonConverged { .. } => "non_converged",
            BatchOutcome::SinglePass => "single_pass",
        }
    }
}

/// A rule that reported a change, and the pass it fired in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleFiring {
    pub rule: &'static str,
    pub iteration: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub name: String,
    pub outcome: BatchOutcome,
    pub rules_fired: Vec<RuleFiring>,
    pub before: Hash256,
    pub after: Hash256,
    /// Explain output, recorded only when plan tracing is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_plan: Option<String>,
}

impl BatchReport {
    pub fn changed(&self) -> bool {
        self.before != self.after
    }
}

/// The optimized plan plus one report per batch, in execution order.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizedPlan {
    pub plan: LogicalPlan,
    pub batches: Vec<BatchReport>,
}

impl OptimizedPlan {
    /// False if any bounded batch stopped at its cap.
    pub fn converged(&self) -> bool {
        !self
            .batches
            .iter()
            .any(|b| matches!(b.outcome, BatchOutcome::NonConverged { .. }))
    }

    pub fn rules_applied(&self) -> usize {
        self.batches.iter().map(|b| b.rules_fired.len()).sum()
    }

    /// Human-readable summary of every batch.
    pub fn format_trace(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "Optimization ran {} batches, {} rules applied\n",
            self.batches.len(),
            self.rules_applied()
        ));

        for report in &self.batches {
            output.push_str(&format!(
                "\n=== {} ({}, {} iterations) {} -> {} ===\n",
                report.name,
                report.outcome.label(),
                report.outcome.iterations(),
                report.before.short(),
                report.after.short()
            ));
            for firing in &report.rules_fired {
                output.push_str(&format!("  [{}] {}\n", firing.iteration, firing.rule));
            }
            if let (Some(before), Some(after)) = (&report.before_plan, &report.after_plan) {
                output.push_str("Before:\n");
                output.push_str(before);
                output.push_str("After:\n");
                output.push_str(after);
            }
        }

        output
    }
}

/// Applies a fixed sequence of batches to one plan per call. Holds no state
/// between calls.
pub struct RulesExecutor<'a> {
    batches: &'a [Batch],
    config: &'a OptimizerConfig,
}

impl<'a> RulesExecutor<'a> {
    pub fn new(batches: &'a [Batch], config: &'a OptimizerConfig) -> Self {
        Self { batches, config }
    }

    pub fn execute(&self, plan: LogicalPlan) -> Result<OptimizedPlan> {
        self.config.validate()?;
        if let Some(reason) = plan.resolution_error() {
            return Err(Error::Unresolved(reason));
        }

        let expected = plan.schema();
        let mut plan = plan;
        let mut reports = Vec::with_capacity(self.batches.len());

        for batch in self.batches {
            let before = hash_serde(&plan)?;
            let before_plan = self.config.trace_plans.then(|| plan.explain());
            events::batch_started(&batch.name, &batch.strategy.to_string(), plan.node_count());

            let mut rules_fired = Vec::new();
            let outcome;
            match batch.strategy {
                Strategy::Once => {
                    plan = run_pass(batch, plan, 1, &mut rules_fired);
                    outcome = BatchOutcome::SinglePass;
                }
                Strategy::FixedPoint { max_iterations } => {
                    let mut iteration = 0;
                    outcome = loop {
                        iteration += 1;
                        let start = plan.clone();
                        plan = run_pass(batch, plan, iteration, &mut rules_fired);
                        if plan == start {
                            break BatchOutcome::Converged {
                                iterations: iteration,
                            };
                        }
                        if max_iterations.is_some_and(|max| iteration >= max) {
                            events::non_converged(&batch.name, iteration);
                            if self.config.strict_convergence {
                                return Err(Error::NonConverged {
                                    batch: batch.name.clone(),
                                    iterations: iteration,
                                });
                            }
                            break BatchOutcome::NonConverged {
                                iterations: iteration,
                            };
                        }
                    };
                }
            }

            if self.config.verify {
                verify::check_batch_output(&batch.name, &expected, &plan)?;
            }

            let after = hash_serde(&plan)?;
            events::batch_finished(
                &batch.name,
                outcome.label(),
                outcome.iterations(),
                &after.short(),
            );
            reports.push(BatchReport {
                name: batch.name.clone(),
                outcome,
                rules_fired,
                before,
                after,
                before_plan,
                after_plan: self.config.trace_plans.then(|| plan.explain()),
            });
        }

        Ok(OptimizedPlan {
            plan,
            batches: reports,
        })
    }
}

fn run_pass(
    batch: &Batch,
    mut plan: LogicalPlan,
    iteration: usize,
    fired: &mut Vec<RuleFiring>,
) -> LogicalPlan {
    for rule in &batch.rules {
        let result = rule.apply(plan);
        if result.transformed {
            events::rule_applied(&batch.name, rule.name(), iteration);
            fired.push(RuleFiring {
                rule: rule.name(),
                iteration,
            });
        }
        plan = result.data;
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Rule;
    use relopt_core::types::DataType;
    use relopt_logical::{Attribute, Transformed};

    /// Wraps the plan in a Limit until the limit count reaches `target`.
    struct CountUp {
        target: u64,
    }

    impl Rule for CountUp {
        fn name(&self) -> &'static str {
            "CountUp"
        }

        fn apply(&self, plan: LogicalPlan) -> Transformed<LogicalPlan> {
            match plan {
                LogicalPlan::Limit { count, input } if count < self.target => {
                    Transformed::yes(LogicalPlan::Limit {
                        count: count + 1,
                        input,
                    })
                }
                other => Transformed::no(other),
            }
        }
    }

    fn limited() -> LogicalPlan {
        LogicalPlan::relation("t", vec![Attribute::new("a", DataType::Int64)]).limit(0)
    }

    fn count_of(plan: &LogicalPlan) -> u64 {
        match plan {
            LogicalPlan::Limit { count, .. } => *count,
            _ => panic!("expected a limit"),
        }
    }

    #[test]
    fn test_fixed_point_counts_iterations() {
        let batches = vec![Batch::new(
            "count",
            Strategy::UNBOUNDED,
            vec![Box::new(CountUp { target: 3 })],
        )];
        let config = OptimizerConfig::default();
        let out = RulesExecutor::new(&batches, &config)
            .execute(limited())
            .unwrap();
        assert_eq!(count_of(&out.plan), 3);
        // Three changing passes plus the one that observes no change.
        assert_eq!(
            out.batches[0].outcome,
            BatchOutcome::Converged { iterations: 4 }
        );
        assert_eq!(out.rules_applied(), 3);
        assert!(out.converged());
    }

    #[test]
    fn test_bounded_batch_returns_best_plan() {
        let batches = vec![Batch::new(
            "count",
            Strategy::bounded(2),
            vec![Box::new(CountUp { target: 10 })],
        )];
        let config = OptimizerConfig::default();
        let out = RulesExecutor::new(&batches, &config)
            .execute(limited())
            .unwrap();
        assert_eq!(count_of(&out.plan), 2);
        assert_eq!(
            out.batches[0].outcome,
            BatchOutcome::NonConverged { iterations: 2 }
        );
        assert!(!out.converged());
    }

    #[test]
    fn test_strict_convergence_fails() {
        let batches = vec![Batch::new(
            "count",
            Strategy::bounded(2),
            vec![Box::new(CountUp { target: 10 })],
        )];
        let config = OptimizerConfig::default().with_strict_convergence(true);
        let err = RulesExecutor::new(&batches, &config)
            .execute(limited())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NonConverged { ref batch, iterations: 2 } if batch == "count"
        ));
    }

    #[test]
    fn test_once_runs_a_single_pass() {
        let batches = vec![Batch::new(
            "once",
            Strategy::Once,
            vec![Box::new(CountUp { target: 10 })],
        )];
        let config = OptimizerConfig::default().with_trace(true);
        let out = RulesExecutor::new(&batches, &config)
            .execute(limited())
            .unwrap();
        assert_eq!(count_of(&out.plan), 1);
        let report = &out.batches[0];
        assert_eq!(report.outcome, BatchOutcome::SinglePass);
        assert!(report.changed());
        assert!(report.before_plan.as_deref().unwrap().starts_with("Limit 0"));
        assert!(report.after_plan.as_deref().unwrap().starts_with("Limit 1"));
        assert!(out.format_trace().contains("CountUp"));
    }

    #[test]
    fn test_unresolved_input_rejected_before_rules_run() {
        let batches = vec![Batch::new(
            "count",
            Strategy::UNBOUNDED,
            vec![Box::new(CountUp { target: 3 })],
        )];
        let config = OptimizerConfig::default();
        let bad = limited().filter(relopt_logical::Expr::Unresolved { name: "x".into() });
        assert!(matches!(
            RulesExecutor::new(&batches, &config).execute(bad),
            Err(Error::Unresolved(_))
        ));
    }
}
