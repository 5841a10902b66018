//! Strongly-typed identifiers used across the rewriter.
//!
//! Attribute and alias identity is by `ExprId`, never by name: two columns
//! called `id` from different relations are different attributes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! new_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(v: u64) -> Self {
                Self(v)
            }
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    };
}

new_id!(ExprId);

// Starts high so ids minted here never collide with small hand-written ids in
// serialized plans.
static NEXT_EXPR_ID: AtomicU64 = AtomicU64::new(1 << 32);

impl ExprId {
    /// Mint a process-unique id for a new attribute or alias.
    pub fn fresh() -> Self {
        Self(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_distinct() {
        let a = ExprId::fresh();
        let b = ExprId::fresh();
        assert_ne!(a, b);
        assert_eq!(ExprId::new(7).to_string(), "#7");
    }
}
