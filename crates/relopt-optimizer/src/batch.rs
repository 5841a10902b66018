//! Named, ordered groups of rules and how often they run.

use std::fmt;

use crate::rule::Rule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Apply every rule exactly once.
    Once,
    /// Repeat until an iteration leaves the plan unchanged, or until
    /// `max_iterations` passes have run.
    FixedPoint { max_iterations: Option<usize> },
}

impl Strategy {
    pub const UNBOUNDED: Strategy = Strategy::FixedPoint {
        max_iterations: None,
    };

    pub fn bounded(max_iterations: usize) -> Self {
        Strategy::FixedPoint {
            max_iterations: Some(max_iterations),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Once => f.write_str("once"),
            Strategy::FixedPoint {
                max_iterations: None,
            } => f.write_str("fixed point"),
            Strategy::FixedPoint {
                max_iterations: Some(n),
            } => write!(f, "fixed point (max {n})"),
        }
    }
}

pub struct Batch {
    pub name: String,
    pub strategy: Strategy,
    pub rules: Vec<Box<dyn Rule>>,
}

impl Batch {
    pub fn new(name: impl Into<String>, strategy: Strategy, rules: Vec<Box<dyn Rule>>) -> Self {
        Self {
            name: name.into(),
            strategy,
            rules,
        }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}

impl fmt::Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("name", &self.name)
            .field("strategy", &self.strategy)
            .field("rules", &self.rule_names())
            .finish()
    }
}
