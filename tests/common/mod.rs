//! Plan fixtures shared by the integration tests.
#![allow(dead_code)]

use relopt::{Attribute, DataType, LogicalPlan};

/// `l(id, a)` and `r(id, b)`, all Int64.
pub struct TwoTables {
    pub l_id: Attribute,
    pub l_a: Attribute,
    pub r_id: Attribute,
    pub r_b: Attribute,
}

impl TwoTables {
    pub fn new() -> Self {
        Self {
            l_id: Attribute::new("id", DataType::Int64),
            l_a: Attribute::new("a", DataType::Int64),
            r_id: Attribute::new("id", DataType::Int64),
            r_b: Attribute::new("b", DataType::Int64),
        }
    }

    pub fn left(&self) -> LogicalPlan {
        LogicalPlan::relation("l", vec![self.l_id.clone(), self.l_a.clone()])
    }

    pub fn right(&self) -> LogicalPlan {
        LogicalPlan::relation("r", vec![self.r_id.clone(), self.r_b.clone()])
    }
}

pub fn single_column(name: &str) -> (Attribute, LogicalPlan) {
    let a = Attribute::new("a", DataType::Int64);
    let plan = LogicalPlan::relation(name, vec![a.clone()]);
    (a, plan)
}
