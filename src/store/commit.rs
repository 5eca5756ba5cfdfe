use super::types::{ModelStore, ModelType};
use crate::blocks::CourseTree;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Commits every collection of a freshly normalized tree.
///
/// The tree is rebuilt on each fetch, so entries are replaced rather than
/// patched.
pub fn commit_tree<S: ModelStore + ?Sized>(store: &S, tree: &CourseTree) -> Result<()> {
    for (model_type, models) in tree_models(tree)? {
        store
            .add_models(model_type.clone(), models)
            .with_context(|| format!("failed to commit {model_type} models"))?;
    }
    Ok(())
}

/// Serializes the four collections of a tree, courses first.
pub fn tree_models(tree: &CourseTree) -> Result<Vec<(ModelType, Vec<Value>)>> {
    Ok(vec![
        (ModelType::Course, serialize_collection(&ModelType::Course, tree.courses())?),
        (ModelType::Section, serialize_collection(&ModelType::Section, tree.sections())?),
        (ModelType::Sequence, serialize_collection(&ModelType::Sequence, tree.sequences())?),
        (ModelType::Unit, serialize_collection(&ModelType::Unit, tree.units())?),
    ])
}

fn serialize_collection<T: Serialize>(
    model_type: &ModelType,
    collection: &BTreeMap<String, T>,
) -> Result<Vec<Value>> {
    collection
        .values()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to serialize {model_type} models"))
}
