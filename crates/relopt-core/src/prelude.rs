//! Convenient re-exports for downstream crates.

pub use crate::config::OptimizerConfig;
pub use crate::error::{Error, Result};
pub use crate::hash::{hash_serde, Hash256};
pub use crate::id::ExprId;
pub use crate::schema::{Field, Schema};
pub use crate::types::{DataType, Scalar};
