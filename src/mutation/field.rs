use crate::store::ModelType;
use std::fmt;

/// Lifecycle of one mutable field: `Idle -> Pending -> {Committed | Reverted}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPhase {
    Idle,
    Pending,
    Committed,
    Reverted,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldKey {
    pub model_type: ModelType,
    pub id: String,
    pub field: String,
}

impl FieldKey {
    pub fn new(model_type: ModelType, id: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            model_type,
            id: id.into(),
            field: field.into(),
        }
    }

    pub fn unit(id: impl Into<String>, field: UnitField) -> Self {
        Self::new(ModelType::Unit, id, field.as_str())
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.model_type, self.id, self.field)
    }
}

/// Unit fields that learners toggle directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitField {
    Bookmarked,
    Complete,
}

impl UnitField {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitField::Bookmarked => "bookmarked",
            UnitField::Complete => "complete",
        }
    }
}
