use crate::store::ModelType;
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;

pub type SourceFuture = BoxFuture<'static, Result<SourcePayload>>;

/// What a settled source hands to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum SourcePayload {
    /// One model, committed under the composite's request id.
    Model(Value),
    /// Collections of models that carry their own ids, such as a normalized
    /// course tree.
    Batch(Vec<(ModelType, Vec<Value>)>),
}

/// One independent data source of a composite fetch, tagged with the store
/// namespace its payload is committed under.
pub struct SourceFetch {
    model_type: ModelType,
    future: SourceFuture,
}

impl SourceFetch {
    pub fn new<F>(model_type: ModelType, future: F) -> Self
    where
        F: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            model_type,
            future: Box::pin(async move { future.await.map(SourcePayload::Model) }),
        }
    }

    /// A source whose payload spans several model types. `model_type` only
    /// labels the source in outcomes and logs.
    pub fn batch<F>(model_type: ModelType, future: F) -> Self
    where
        F: Future<Output = Result<Vec<(ModelType, Vec<Value>)>>> + Send + 'static,
    {
        Self {
            model_type,
            future: Box::pin(async move { future.await.map(SourcePayload::Batch) }),
        }
    }

    /// Wraps a source that yields a typed payload; the payload is serialized
    /// to JSON once it resolves.
    pub fn typed<T, F>(model_type: ModelType, future: F) -> Self
    where
        T: Serialize + Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let label = model_type.clone();
        Self::new(model_type, async move {
            let payload = future.await?;
            serde_json::to_value(payload)
                .with_context(|| format!("failed to serialize {label} payload"))
        })
    }

    pub fn model_type(&self) -> &ModelType {
        &self.model_type
    }

    pub(crate) fn into_parts(self) -> (ModelType, SourceFuture) {
        (self.model_type, self.future)
    }
}

impl std::fmt::Debug for SourceFetch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFetch")
            .field("model_type", &self.model_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Committed,
    Failed { error: String },
    /// The source settled after a newer request for the same entity started.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    pub model_type: ModelType,
    pub status: SourceStatus,
}

impl SourceOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self.status, SourceStatus::Committed)
    }
}
