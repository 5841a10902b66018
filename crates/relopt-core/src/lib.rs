#![forbid(unsafe_code)]
//! relopt-core: shared vocabulary for the relopt plan rewriter.
//!
//! - `types`: data types and constant scalar values
//! - `id`: strongly-typed expression identities
//! - `schema`: flattened output schemas for display and comparison
//! - `config`: optimizer configuration (defaults + environment overrides)
//! - `hash`: stable plan fingerprints
//!
//! **No plan trees here.** Expressions and plans live in `relopt-logical`.

pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod prelude;
pub mod schema;
pub mod types;

/// Crate version, stamped into batch reports.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
