//! Optimistic mutation tracking.
//!
//! Each mutation writes its value into the store before the confirming request
//! resolves and takes a ticket for the field. When the request settles, only
//! the holder of the field's current ticket may commit or revert; a settlement
//! for an older ticket never touches the store, so a late failure cannot undo
//! a newer change. A revert is also skipped when anything outside the tracker
//! wrote the entity after the optimistic update, such as a fresh fetch.

use super::field::{FieldKey, FieldPhase};
use crate::runtime::telemetry::Telemetry;
use crate::store::{ModelStore, ModelType, StoreError};
use anyhow::Result;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The server confirmed the change; the optimistic value is authoritative.
    Committed,
    /// The server rejected the change. The field was restored unless a newer
    /// commit replaced the entity in the meantime.
    Reverted { error: String },
    /// A newer mutation of the same field started before this one settled.
    Superseded,
}

#[derive(Debug)]
struct FieldState {
    phase: FieldPhase,
    ticket: u64,
    /// Last value known to be authoritative, restored on failure.
    baseline: Value,
}

#[derive(Debug, Default)]
struct TrackerState {
    fields: HashMap<FieldKey, FieldState>,
    /// Store revision left by this tracker's latest write to each entity.
    written: HashMap<(ModelType, String), u64>,
}

#[derive(Debug, Default)]
pub struct MutationTracker {
    state: Mutex<TrackerState>,
    next_ticket: AtomicU64,
    telemetry: Arc<Telemetry>,
}

impl MutationTracker {
    pub fn new(telemetry: Arc<Telemetry>) -> Self {
        Self {
            state: Mutex::new(TrackerState::default()),
            next_ticket: AtomicU64::new(0),
            telemetry,
        }
    }

    pub fn phase(&self, key: &FieldKey) -> FieldPhase {
        self.lock()
            .fields
            .get(key)
            .map_or(FieldPhase::Idle, |state| state.phase)
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().expect("mutation tracker lock poisoned")
    }

    /// Applies `value` optimistically, then settles it against `confirm`.
    ///
    /// Errors only when the entity is not in the store; a failing `confirm`
    /// is reported as [`MutationOutcome::Reverted`].
    pub async fn apply<S, F>(
        &self,
        store: &S,
        key: FieldKey,
        value: Value,
        confirm: F,
    ) -> Result<MutationOutcome>
    where
        S: ModelStore + ?Sized,
        F: Future<Output = Result<()>>,
    {
        let ticket = self.begin(store, &key, value.clone())?;
        tracing::debug!(field = %key, ticket, "optimistic update applied");

        let result = confirm.await;
        Ok(self.settle(store, &key, ticket, value, result))
    }

    fn begin<S>(&self, store: &S, key: &FieldKey, value: Value) -> Result<u64>
    where
        S: ModelStore + ?Sized,
    {
        let current = store
            .model(&key.model_type, &key.id)
            .ok_or_else(|| StoreError::NotFound {
                model_type: key.model_type.clone(),
                id: key.id.clone(),
            })?;
        let stored_value = current.get(&key.field).cloned().unwrap_or(Value::Null);

        let mut guard = self.lock();
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        let baseline = match guard.fields.get(key) {
            Some(state) if state.phase == FieldPhase::Pending => state.baseline.clone(),
            _ => stored_value,
        };

        let revision = store.update_model(&key.model_type, &key.id, patch(&key.field, value))?;
        guard.written.insert(entity(key), revision);
        guard.fields.insert(
            key.clone(),
            FieldState {
                phase: FieldPhase::Pending,
                ticket,
                baseline,
            },
        );
        Ok(ticket)
    }

    fn settle<S>(
        &self,
        store: &S,
        key: &FieldKey,
        ticket: u64,
        value: Value,
        result: Result<()>,
    ) -> MutationOutcome
    where
        S: ModelStore + ?Sized,
    {
        let mut guard = self.lock();
        let TrackerState { fields, written } = &mut *guard;
        let Some(state) = fields.get_mut(key) else {
            return MutationOutcome::Superseded;
        };

        if state.ticket != ticket {
            // An older request that the server accepted moves the baseline the
            // newer request would revert to.
            if result.is_ok() && state.phase == FieldPhase::Pending {
                state.baseline = value;
            }
            tracing::debug!(field = %key, ticket, current = state.ticket, "stale mutation settled");
            return MutationOutcome::Superseded;
        }

        match result {
            Ok(()) => {
                state.phase = FieldPhase::Committed;
                state.baseline = value;
                self.telemetry.record_mutation_committed();
                tracing::debug!(field = %key, ticket, "optimistic update confirmed");
                MutationOutcome::Committed
            }
            Err(err) => {
                let entity_key = entity(key);
                let untouched =
                    store.revision(&key.model_type, &key.id) == written.get(&entity_key).copied();
                if untouched {
                    let restore = patch(&key.field, state.baseline.clone());
                    match store.update_model(&key.model_type, &key.id, restore) {
                        Ok(revision) => {
                            written.insert(entity_key, revision);
                        }
                        Err(store_err) => {
                            tracing::warn!(field = %key, error = %store_err, "entity vanished before revert");
                        }
                    }
                } else {
                    tracing::debug!(field = %key, ticket, "entity recommitted since the optimistic update; keeping it");
                }
                state.phase = FieldPhase::Reverted;
                self.telemetry.record_mutation_reverted();
                tracing::warn!(field = %key, ticket, error = %err, "optimistic update reverted");
                MutationOutcome::Reverted {
                    error: format!("{err:#}"),
                }
            }
        }
    }
}

fn entity(key: &FieldKey) -> (ModelType, String) {
    (key.model_type.clone(), key.id.clone())
}

fn patch(field: &str, value: Value) -> Map<String, Value> {
    let mut patch = Map::new();
    patch.insert(field.to_owned(), value);
    patch
}
