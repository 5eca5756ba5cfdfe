//! Fan-out/fan-in over independent sources.
//!
//! Every source of a composite request is polled concurrently and awaited to
//! settlement; nothing short-circuits on the first failure or success. Each
//! successful model payload is committed under `(model_type, request_id)`
//! while batch payloads keep the ids they carry and commit all or nothing. Failed
//! sources are logged and skipped, and the composite status is computed only
//! after all sources settled. A failure status is advisory: data already
//! committed by sibling sources stays committed.

use super::source::{SourceFetch, SourceOutcome, SourcePayload, SourceStatus};
use super::state::{request_key, FetchState, RequestGenerations, RequestKey};
use crate::runtime::telemetry::Telemetry;
use crate::store::{model_id, ModelStore, ModelType, StoreError};
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeStatus {
    /// Every source succeeded and was committed.
    Success,
    /// At least one source failed; the others were still committed.
    Failure,
    /// A newer request for the same entity started before this one settled.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeOutcome {
    pub request_id: String,
    pub generation: u64,
    pub status: CompositeStatus,
    pub sources: Vec<SourceOutcome>,
}

impl CompositeOutcome {
    pub fn is_success(&self) -> bool {
        self.status == CompositeStatus::Success
    }

    pub fn committed(&self) -> impl Iterator<Item = &ModelType> {
        self.sources
            .iter()
            .filter(|source| source.is_committed())
            .map(|source| &source.model_type)
    }

    pub fn failed(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.sources
            .iter()
            .filter(|source| matches!(source.status, SourceStatus::Failed { .. }))
    }
}

pub struct FetchOrchestrator<S: ModelStore + ?Sized> {
    store: Arc<S>,
    generations: RequestGenerations,
    states: Mutex<HashMap<RequestKey, FetchState>>,
    telemetry: Arc<Telemetry>,
}

impl<S: ModelStore + ?Sized> FetchOrchestrator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_telemetry(store, Arc::new(Telemetry::default()))
    }

    pub fn with_telemetry(store: Arc<S>, telemetry: Arc<Telemetry>) -> Self {
        Self {
            store,
            generations: RequestGenerations::new(),
            states: Mutex::new(HashMap::new()),
            telemetry,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    /// Returns the load state of the latest request issued for `request_id`.
    pub fn fetch_state(&self, request_id: &str) -> Option<FetchState> {
        self.scoped_fetch_state("", request_id)
    }

    pub fn scoped_fetch_state(&self, scope: &str, request_id: &str) -> Option<FetchState> {
        self.states
            .lock()
            .expect("fetch state lock poisoned")
            .get(&request_key(scope, request_id))
            .copied()
    }

    /// Runs every source concurrently and commits each one that succeeds.
    pub async fn fetch_composite(
        &self,
        request_id: &str,
        sources: Vec<SourceFetch>,
    ) -> CompositeOutcome {
        self.fetch_scoped("", request_id, sources).await
    }

    /// Like [`fetch_composite`](Self::fetch_composite), with generations and
    /// fetch state tracked per `(scope, request_id)`. Composites in different
    /// scopes never supersede each other even when they share a request id.
    pub async fn fetch_scoped(
        &self,
        scope: &str,
        request_id: &str,
        sources: Vec<SourceFetch>,
    ) -> CompositeOutcome {
        let key = request_key(scope, request_id);
        let generation = self.generations.begin(&key);
        self.set_state(&key, FetchState::Loading);
        self.telemetry.record_composite_fetch();

        let (model_types, futures): (Vec<ModelType>, Vec<_>) =
            sources.into_iter().map(SourceFetch::into_parts).unzip();

        tracing::debug!(
            scope,
            request_id,
            generation,
            sources = model_types.len(),
            "starting composite fetch"
        );

        let results = join_all(futures).await;

        if !self.generations.is_current(&key, generation) {
            tracing::info!(
                request_id,
                generation,
                "discarding composite fetch superseded by a newer request"
            );
            self.telemetry.record_superseded();
            return CompositeOutcome {
                request_id: request_id.to_owned(),
                generation,
                status: CompositeStatus::Superseded,
                sources: model_types
                    .into_iter()
                    .map(|model_type| SourceOutcome {
                        model_type,
                        status: SourceStatus::Discarded,
                    })
                    .collect(),
            };
        }

        let mut outcomes = Vec::with_capacity(results.len());
        for (model_type, result) in model_types.into_iter().zip(results) {
            let status = match result {
                Ok(payload) => match self.commit(request_id, &model_type, payload) {
                    Ok(()) => SourceStatus::Committed,
                    Err(err) => {
                        tracing::error!(
                            request_id,
                            model_type = %model_type,
                            error = %err,
                            "source payload rejected by model store"
                        );
                        SourceStatus::Failed {
                            error: err.to_string(),
                        }
                    }
                },
                Err(err) => {
                    tracing::error!(
                        request_id,
                        model_type = %model_type,
                        error = %err,
                        "source fetch failed"
                    );
                    SourceStatus::Failed {
                        error: format!("{err:#}"),
                    }
                }
            };
            if matches!(status, SourceStatus::Failed { .. }) {
                self.telemetry.record_source_failure();
            }
            outcomes.push(SourceOutcome { model_type, status });
        }

        let status = if outcomes.iter().all(SourceOutcome::is_committed) {
            self.set_state(&key, FetchState::Loaded);
            CompositeStatus::Success
        } else {
            self.set_state(&key, FetchState::Failed);
            self.telemetry.record_composite_failure();
            CompositeStatus::Failure
        };

        tracing::debug!(request_id, generation, status = ?status, "composite fetch settled");

        CompositeOutcome {
            request_id: request_id.to_owned(),
            generation,
            status,
            sources: outcomes,
        }
    }

    fn commit(
        &self,
        request_id: &str,
        model_type: &ModelType,
        payload: SourcePayload,
    ) -> Result<(), StoreError> {
        match payload {
            SourcePayload::Model(Value::Object(mut model)) => {
                model.insert("id".to_owned(), Value::String(request_id.to_owned()));
                self.store.add_model(model_type.clone(), Value::Object(model))
            }
            SourcePayload::Model(_) => Err(StoreError::NotAnObject {
                model_type: model_type.clone(),
            }),
            SourcePayload::Batch(collections) => {
                // Validate every collection first so a bad one commits nothing.
                for (collection_type, models) in &collections {
                    for model in models {
                        model_id(collection_type, model)?;
                    }
                }
                for (collection_type, models) in collections {
                    self.store.add_models(collection_type, models)?;
                }
                Ok(())
            }
        }
    }

    fn set_state(&self, key: &RequestKey, state: FetchState) {
        self.states
            .lock()
            .expect("fetch state lock poisoned")
            .insert(key.clone(), state);
    }
}
