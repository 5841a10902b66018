//! Window specifications carried inside `Expr::Window`.
//!
//! These are already-typed data from the analyzer. The optimizer has no
//! frame-specific rules; it only needs to walk and rebuild the embedded
//! partition and ordering expressions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::expr::{Expr, SortOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameBoundary {
    UnboundedPreceding,
    Preceding(u64),
    CurrentRow,
    Following(u64),
    UnboundedFollowing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameUnits {
    Rows,
    Range,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowFrame {
    pub units: FrameUnits,
    pub start: FrameBoundary,
    pub end: FrameBoundary,
}

impl Default for WindowFrame {
    fn default() -> Self {
        Self {
            units: FrameUnits::Range,
            start: FrameBoundary::UnboundedPreceding,
            end: FrameBoundary::CurrentRow,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct WindowSpec {
    #[serde(default)]
    pub partition_by: Vec<Expr>,
    #[serde(default)]
    pub order_by: Vec<SortOrder>,
    #[serde(default)]
    pub frame: Option<WindowFrame>,
}

impl WindowSpec {
    /// Embedded expressions in traversal order: partitions, then orderings.
    pub fn expressions(&self) -> Vec<&Expr> {
        self.partition_by
            .iter()
            .chain(self.order_by.iter().map(|o| &o.child))
            .collect()
    }

    pub fn map_expressions<F>(self, f: &mut F) -> WindowSpec
    where
        F: FnMut(Expr) -> Expr,
    {
        WindowSpec {
            partition_by: self.partition_by.into_iter().map(&mut *f).collect(),
            order_by: self
                .order_by
                .into_iter()
                .map(|o| o.map_child(&mut *f))
                .collect(),
            frame: self.frame,
        }
    }
}

impl fmt::Display for FrameBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameBoundary::UnboundedPreceding => f.write_str("UNBOUNDED PRECEDING"),
            FrameBoundary::Preceding(n) => write!(f, "{n} PRECEDING"),
            FrameBoundary::CurrentRow => f.write_str("CURRENT ROW"),
            FrameBoundary::Following(n) => write!(f, "{n} FOLLOWING"),
            FrameBoundary::UnboundedFollowing => f.write_str("UNBOUNDED FOLLOWING"),
        }
    }
}

impl fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.partition_by.is_empty() {
            let keys: Vec<String> = self.partition_by.iter().map(|e| e.to_string()).collect();
            parts.push(format!("PARTITION BY {}", keys.join(", ")));
        }
        if !self.order_by.is_empty() {
            let keys: Vec<String> = self.order_by.iter().map(|o| o.to_string()).collect();
            parts.push(format!("ORDER BY {}", keys.join(", ")));
        }
        if let Some(frame) = &self.frame {
            let units = match frame.units {
                FrameUnits::Rows => "ROWS",
                FrameUnits::Range => "RANGE",
            };
            parts.push(format!(
                "{units} BETWEEN {} AND {}",
                frame.start, frame.end
            ));
        }
        f.write_str(&parts.join(" "))
    }
}
