use super::types::{model_id, ModelStore, ModelType, StoreError};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

type ModelKey = (ModelType, String);

#[derive(Debug)]
struct Entry {
    revision: u64,
    model: Value,
}

#[derive(Debug, Default)]
struct Entries {
    by_key: HashMap<ModelKey, Entry>,
    last_revision: u64,
}

impl Entries {
    fn put(&mut self, key: ModelKey, model: Value) {
        self.last_revision += 1;
        let revision = self.last_revision;
        self.by_key.insert(key, Entry { revision, model });
    }
}

/// Session-scoped store backed by a single map. Writes are single insertions
/// under the lock, so the last writer wins for a given type/id pair.
#[derive(Debug, Default)]
pub struct InMemoryModelStore {
    entries: RwLock<Entries>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.read().by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, model_type: &ModelType, id: &str) -> bool {
        self.read()
            .by_key
            .contains_key(&(model_type.clone(), id.to_owned()))
    }

    /// All models of one type, ordered by id.
    pub fn models_of(&self, model_type: &ModelType) -> Vec<Value> {
        let guard = self.read();
        let mut entries: Vec<(&String, &Value)> = guard
            .by_key
            .iter()
            .filter(|((kind, _), _)| kind == model_type)
            .map(|((_, id), entry)| (id, &entry.model))
            .collect();
        entries.sort_by(|lhs, rhs| lhs.0.cmp(rhs.0));
        entries.into_iter().map(|(_, model)| model.clone()).collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().expect("model store lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().expect("model store lock poisoned")
    }
}

impl ModelStore for InMemoryModelStore {
    fn add_model(&self, model_type: ModelType, model: Value) -> Result<(), StoreError> {
        let id = model_id(&model_type, &model)?;
        tracing::trace!(model_type = %model_type, id = %id, "committing model");
        self.write().put((model_type, id), model);
        Ok(())
    }

    fn add_models(&self, model_type: ModelType, models: Vec<Value>) -> Result<(), StoreError> {
        let keyed = models
            .into_iter()
            .map(|model| model_id(&model_type, &model).map(|id| (id, model)))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::trace!(model_type = %model_type, count = keyed.len(), "committing models");
        let mut guard = self.write();
        for (id, model) in keyed {
            guard.put((model_type.clone(), id), model);
        }
        Ok(())
    }

    fn model(&self, model_type: &ModelType, id: &str) -> Option<Value> {
        self.read()
            .by_key
            .get(&(model_type.clone(), id.to_owned()))
            .map(|entry| entry.model.clone())
    }

    fn revision(&self, model_type: &ModelType, id: &str) -> Option<u64> {
        self.read()
            .by_key
            .get(&(model_type.clone(), id.to_owned()))
            .map(|entry| entry.revision)
    }

    fn update_model(
        &self,
        model_type: &ModelType,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<u64, StoreError> {
        let mut guard = self.write();
        let Entries {
            by_key,
            last_revision,
        } = &mut *guard;
        let entry = by_key
            .get_mut(&(model_type.clone(), id.to_owned()))
            .ok_or_else(|| StoreError::NotFound {
                model_type: model_type.clone(),
                id: id.to_owned(),
            })?;
        let fields = entry.model.as_object_mut().ok_or_else(|| StoreError::NotAnObject {
            model_type: model_type.clone(),
        })?;

        for (field, value) in patch {
            if field == "id" {
                continue;
            }
            fields.insert(field, value);
        }
        *last_revision += 1;
        entry.revision = *last_revision;
        Ok(entry.revision)
    }
}
