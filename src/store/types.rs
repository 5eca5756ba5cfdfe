use serde_json::{Map, Value};
use std::fmt;

/// Namespace a model is committed under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelType {
    Course,
    Section,
    Sequence,
    Unit,
    CourseMeta,
    CourseHomeMeta,
    /// Data backing a course home tab (`outline`, `dates`, `progress`, ...).
    Tab(String),
}

impl ModelType {
    pub fn as_str(&self) -> &str {
        match self {
            ModelType::Course => "course",
            ModelType::Section => "section",
            ModelType::Sequence => "sequence",
            ModelType::Unit => "unit",
            ModelType::CourseMeta => "courseMeta",
            ModelType::CourseHomeMeta => "courseHomeMeta",
            ModelType::Tab(name) => name,
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotAnObject { model_type: ModelType },
    MissingId { model_type: ModelType },
    NotFound { model_type: ModelType, id: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotAnObject { model_type } => {
                write!(f, "{model_type} model must be a JSON object")
            }
            StoreError::MissingId { model_type } => {
                write!(f, "{model_type} model is missing a string id")
            }
            StoreError::NotFound { model_type, id } => {
                write!(f, "{model_type} model {id} is not loaded")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Outbound commit interface.
///
/// Every model is a JSON object with a string `id`. `add_model` replaces any
/// previous entry for the same type/id pair wholesale; `update_model` is the
/// only operation that merges fields.
pub trait ModelStore: Send + Sync {
    fn add_model(&self, model_type: ModelType, model: Value) -> Result<(), StoreError>;

    /// Commits a batch; either every model is accepted or none is.
    fn add_models(&self, model_type: ModelType, models: Vec<Value>) -> Result<(), StoreError>;

    fn model(&self, model_type: &ModelType, id: &str) -> Option<Value>;

    /// Write counter of one entry. It changes on every add, replace or patch
    /// of that entry and never repeats.
    fn revision(&self, model_type: &ModelType, id: &str) -> Option<u64>;

    /// Merges `patch` into an existing model without touching other entries
    /// and returns the entry's new revision.
    fn update_model(
        &self,
        model_type: &ModelType,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<u64, StoreError>;
}

/// Extracts the `id` of a model, validating its shape.
pub fn model_id(model_type: &ModelType, model: &Value) -> Result<String, StoreError> {
    let object = model.as_object().ok_or_else(|| StoreError::NotAnObject {
        model_type: model_type.clone(),
    })?;
    object
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| StoreError::MissingId {
            model_type: model_type.clone(),
        })
}
