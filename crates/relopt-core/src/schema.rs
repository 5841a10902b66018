//! Flattened output schemas. Pure data; plan nodes derive these from their
//! attribute lists for display and for schema-equivalence checks.

use serde::{Deserialize, Serialize};

use crate::id::ExprId;
use crate::types::DataType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub id: ExprId,
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(id: ExprId, name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            id,
            name: name.into(),
            data_type,
            nullable,
        }
    }

    /// Same identity, name and type. Nullability is not part of equivalence:
    /// folding a nullable-typed constant may legitimately tighten it.
    pub fn is_equivalent(&self, other: &Field) -> bool {
        self.id == other.id && self.name == other.name && self.data_type == other.data_type
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field-wise equivalence in order.
    pub fn is_equivalent(&self, other: &Schema) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.is_equivalent(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equivalence_ignores_nullability_but_not_order() {
        let a = Field::new(ExprId::new(1), "a", DataType::Int64, true);
        let b = Field::new(ExprId::new(2), "b", DataType::Utf8, false);
        let left = Schema::new(vec![a.clone(), b.clone()]);
        let mut tightened = a.clone();
        tightened.nullable = false;
        assert!(left.is_equivalent(&Schema::new(vec![tightened, b.clone()])));
        assert!(!left.is_equivalent(&Schema::new(vec![b, a])));
    }
}
