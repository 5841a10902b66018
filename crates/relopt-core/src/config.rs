//! Optimizer configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Iteration cap for fixed-point batches. `None` runs them to convergence.
    pub max_iterations: Option<usize>,

    /// Record explain strings before and after every batch.
    pub trace_plans: bool,

    /// Fail the optimize call when a bounded batch does not converge, instead
    /// of returning the best plan reached.
    pub strict_convergence: bool,

    /// Check resolution and output schema after every batch.
    pub verify: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            trace_plans: false,
            strict_convergence: false,
            verify: true,
        }
    }
}

impl OptimizerConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `RELOPT_MAX_ITERATIONS`: iteration cap for fixed-point batches
    /// - `RELOPT_TRACE_PLANS`: record before/after plans per batch
    /// - `RELOPT_STRICT_CONVERGENCE`: treat non-convergence as an error
    /// - `RELOPT_VERIFY`: post-batch resolution/schema checks
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("RELOPT_MAX_ITERATIONS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_iterations = Some(v);
            }
        }

        if let Ok(s) = std::env::var("RELOPT_TRACE_PLANS") {
            if let Some(v) = parse_flag(&s) {
                cfg.trace_plans = v;
            }
        }

        if let Ok(s) = std::env::var("RELOPT_STRICT_CONVERGENCE") {
            if let Some(v) = parse_flag(&s) {
                cfg.strict_convergence = v;
            }
        }

        if let Ok(s) = std::env::var("RELOPT_VERIFY") {
            if let Some(v) = parse_flag(&s) {
                cfg.verify = v;
            }
        }

        cfg
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    pub fn with_trace(mut self, enable: bool) -> Self {
        self.trace_plans = enable;
        self
    }

    pub fn with_strict_convergence(mut self, enable: bool) -> Self {
        self.strict_convergence = enable;
        self
    }

    pub fn with_verify(mut self, enable: bool) -> Self {
        self.verify = enable;
        self
    }

    /// Reject settings that can never make progress.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == Some(0) {
            return Err(Error::Config(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_run_to_convergence() {
        let cfg = OptimizerConfig::default();
        assert_eq!(cfg.max_iterations, None);
        assert!(cfg.verify);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_iterations_rejected() {
        let cfg = OptimizerConfig::default().with_max_iterations(0);
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn flags_parse_loosely() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: OptimizerConfig = serde_json::from_str(r#"{"max_iterations": 5}"#).unwrap();
        assert_eq!(cfg.max_iterations, Some(5));
        assert!(cfg.verify);
        assert!(!cfg.trace_plans);
    }
}
