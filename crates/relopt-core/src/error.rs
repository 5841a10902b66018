use thiserror::Error;

/// Canonical result for relopt.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The input plan still carries unresolved references or untyped expressions.
    #[error("plan is not resolved: {0}")]
    Unresolved(String),

    /// A bounded batch hit its iteration cap under strict convergence.
    #[error("batch '{batch}' did not converge within {iterations} iterations")]
    NonConverged { batch: String, iterations: usize },

    #[error("constant evaluation failed: {0}")]
    Evaluation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Hashing error: {0}")]
    Hash(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}
