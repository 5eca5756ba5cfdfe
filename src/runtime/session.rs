//! Session facade: one learner, one LMS, one shared model store.
//!
//! The session wires the endpoint client into the fetch orchestrator and the
//! mutation tracker, keeps the normalized course trees and live sequence
//! positions it loaded, and feeds every component the same telemetry.

use crate::api::{is_paywalled, CourseMetadata, CoursewareClient, HttpTransport, RestTransport};
use crate::blocks::CourseTree;
use crate::fetch::{
    request_key, CompositeOutcome, CourseTab, FetchOrchestrator, FetchState, RequestGenerations,
    SourceFetch,
};
use crate::mutation::{FieldKey, FieldPhase, MutationOutcome, MutationTracker, UnitField};
use crate::runtime::config::CoursewareConfig;
use crate::runtime::telemetry::{spawn_metrics_reporter, Telemetry};
use crate::sequence::{
    adjacent_sequence, AdjacentSequence, Direction, Navigation, NavigationError, SequencePosition,
    SequenceUnit,
};
use crate::store::{tree_models, InMemoryModelStore, ModelStore, ModelType};
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const COURSE_SCOPE: &str = "course";
const TAB_SCOPE: &str = "tab";
const SEQUENCE_SCOPE: &str = "sequence";

/// Result of [`CoursewareSession::load_course`].
#[derive(Debug, Clone)]
pub struct CourseLoad {
    pub outcome: CompositeOutcome,
    /// The normalized tree, present when the blocks source was committed.
    pub tree: Option<Arc<CourseTree>>,
}

impl CourseLoad {
    /// Sequence a learner lands on when no position was requested.
    pub fn default_sequence_id(&self) -> Option<&str> {
        self.tree.as_deref().and_then(CourseTree::first_sequence_id)
    }
}

/// Result of [`CoursewareSession::load_sequence`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceLoad {
    Loaded(SequencePosition),
    /// A newer load of the same sequence started first; nothing was written.
    Superseded,
}

impl SequenceLoad {
    pub fn position(&self) -> Option<&SequencePosition> {
        match self {
            Self::Loaded(position) => Some(position),
            Self::Superseded => None,
        }
    }
}

pub struct CoursewareSession<T, S: ModelStore + ?Sized = InMemoryModelStore> {
    client: Arc<CoursewareClient<T>>,
    orchestrator: FetchOrchestrator<S>,
    mutations: MutationTracker,
    telemetry: Arc<Telemetry>,
    courses: Mutex<HashMap<String, Arc<CourseTree>>>,
    sequences: Mutex<HashMap<String, SequencePosition>>,
    sequence_generations: RequestGenerations,
}

impl CoursewareSession<RestTransport, InMemoryModelStore> {
    pub fn from_config(config: &CoursewareConfig) -> Result<Self> {
        let client = CoursewareClient::from_config(config)?;
        Ok(Self::new(client, Arc::new(InMemoryModelStore::new())))
    }
}

impl<T, S> CoursewareSession<T, S>
where
    T: HttpTransport + 'static,
    S: ModelStore + ?Sized,
{
    pub fn new(client: CoursewareClient<T>, store: Arc<S>) -> Self {
        Self::with_telemetry(client, store, Arc::new(Telemetry::default()))
    }

    pub fn with_telemetry(
        client: CoursewareClient<T>,
        store: Arc<S>,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        Self {
            client: Arc::new(client),
            orchestrator: FetchOrchestrator::with_telemetry(store, telemetry.clone()),
            mutations: MutationTracker::new(telemetry.clone()),
            telemetry,
            courses: Mutex::new(HashMap::new()),
            sequences: Mutex::new(HashMap::new()),
            sequence_generations: RequestGenerations::new(),
        }
    }

    pub fn client(&self) -> &CoursewareClient<T> {
        &self.client
    }

    pub fn store(&self) -> &Arc<S> {
        self.orchestrator.store()
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    pub fn course_state(&self, course_id: &str) -> Option<FetchState> {
        self.orchestrator.scoped_fetch_state(COURSE_SCOPE, course_id)
    }

    pub fn tab_state(&self, course_id: &str) -> Option<FetchState> {
        self.orchestrator.scoped_fetch_state(TAB_SCOPE, course_id)
    }

    pub fn course_tree(&self, course_id: &str) -> Option<Arc<CourseTree>> {
        self.courses
            .lock()
            .expect("course tree lock poisoned")
            .get(course_id)
            .cloned()
    }

    pub fn sequence_position(&self, sequence_id: &str) -> Option<SequencePosition> {
        self.sequences
            .lock()
            .expect("sequence position lock poisoned")
            .get(sequence_id)
            .cloned()
    }

    /// Fetches course metadata and the block tree together. Either half is
    /// committed on its own when the other fails.
    pub async fn load_course(&self, course_id: &str) -> CourseLoad {
        let metadata = {
            let client = self.client.clone();
            let course_id = course_id.to_owned();
            SourceFetch::typed(ModelType::CourseMeta, async move {
                client.course_metadata(&course_id).await
            })
        };

        let fetched_tree: Arc<Mutex<Option<CourseTree>>> = Arc::default();
        let blocks = {
            let client = self.client.clone();
            let telemetry = self.telemetry.clone();
            let slot = fetched_tree.clone();
            let course_id = course_id.to_owned();
            SourceFetch::batch(ModelType::Course, async move {
                let normalized = client.course_blocks(&course_id).await?;
                telemetry.record_anomalies(normalized.anomalies.len() as u64);
                let models = tree_models(&normalized.tree)?;
                *slot.lock().expect("course tree slot poisoned") = Some(normalized.tree);
                Ok(models)
            })
        };

        let outcome = self
            .orchestrator
            .fetch_scoped(COURSE_SCOPE, course_id, vec![metadata, blocks])
            .await;

        let blocks_committed = outcome
            .committed()
            .any(|model_type| *model_type == ModelType::Course);
        let tree = if blocks_committed {
            let taken = fetched_tree
                .lock()
                .expect("course tree slot poisoned")
                .take();
            taken.map(Arc::new)
        } else {
            None
        };

        if let Some(tree) = &tree {
            self.courses
                .lock()
                .expect("course tree lock poisoned")
                .insert(course_id.to_owned(), tree.clone());
        }

        tracing::info!(
            course_id,
            status = ?outcome.status,
            tree_loaded = tree.is_some(),
            "course load settled"
        );

        CourseLoad { outcome, tree }
    }

    /// Fetches the course home metadata alongside one tab's data.
    pub async fn fetch_tab(&self, course_id: &str, tab: CourseTab) -> CompositeOutcome {
        let home = {
            let client = self.client.clone();
            let course_id = course_id.to_owned();
            SourceFetch::new(ModelType::CourseHomeMeta, async move {
                client.course_home_metadata(&course_id).await
            })
        };
        let tab_data = {
            let client = self.client.clone();
            let course_id = course_id.to_owned();
            SourceFetch::new(tab.model_type(), async move {
                client.tab_data(&course_id, tab).await
            })
        };

        self.orchestrator
            .fetch_scoped(TAB_SCOPE, course_id, vec![home, tab_data])
            .await
    }

    /// Fetches a sequence, merges its per-unit flags into the store and makes
    /// its position the live one for navigation. A response that arrives
    /// after a newer load of the same sequence started is dropped.
    pub async fn load_sequence(&self, sequence_id: &str) -> Result<SequenceLoad> {
        let key = request_key(SEQUENCE_SCOPE, sequence_id);
        let generation = self.sequence_generations.begin(&key);

        let metadata = self
            .client
            .sequence_metadata(sequence_id)
            .await
            .with_context(|| format!("failed to load sequence {sequence_id}"))?;

        let sequence_model = serde_json::to_value(&metadata.sequence)
            .context("failed to serialize sequence position")?;
        let unit_models = metadata
            .units
            .iter()
            .map(|unit| Ok((unit.id.as_str(), unit_model(unit)?)))
            .collect::<Result<Vec<_>>>()?;

        let mut sequences = self
            .sequences
            .lock()
            .expect("sequence position lock poisoned");
        if !self.sequence_generations.is_current(&key, generation) {
            tracing::info!(
                sequence_id,
                generation,
                "discarding sequence load superseded by a newer request"
            );
            self.telemetry.record_superseded();
            return Ok(SequenceLoad::Superseded);
        }

        let store = self.store();
        merge_model(
            store.as_ref(),
            ModelType::Sequence,
            &metadata.sequence.id,
            sequence_model,
        )?;
        for (unit_id, model) in unit_models {
            merge_model(store.as_ref(), ModelType::Unit, unit_id, model)?;
        }
        sequences.insert(sequence_id.to_owned(), metadata.sequence.clone());

        tracing::debug!(
            sequence_id,
            generation,
            units = metadata.units.len(),
            active_unit = ?metadata.sequence.active_unit_id,
            "sequence loaded"
        );
        Ok(SequenceLoad::Loaded(metadata.sequence))
    }

    /// Moves within a loaded sequence. Reaching an edge returns
    /// [`Navigation::Boundary`]; use [`Self::adjacent_sequence`] to cross it.
    pub fn step(&self, sequence_id: &str, direction: Direction) -> Result<Navigation, NavigationError> {
        let mut sequences = self
            .sequences
            .lock()
            .expect("sequence position lock poisoned");
        let position = sequences
            .get_mut(sequence_id)
            .ok_or_else(|| NavigationError::UnknownSequence {
                sequence_id: sequence_id.to_owned(),
            })?;
        Ok(position.step(direction))
    }

    pub fn jump_to(&self, sequence_id: &str, unit_id: &str) -> Result<Navigation, NavigationError> {
        let mut sequences = self
            .sequences
            .lock()
            .expect("sequence position lock poisoned");
        let position = sequences
            .get_mut(sequence_id)
            .ok_or_else(|| NavigationError::UnknownSequence {
                sequence_id: sequence_id.to_owned(),
            })?;
        position.jump_to(unit_id)
    }

    pub fn adjacent_sequence(
        &self,
        course_id: &str,
        sequence_id: &str,
        direction: Direction,
    ) -> Result<AdjacentSequence, NavigationError> {
        let tree = self
            .course_tree(course_id)
            .ok_or_else(|| NavigationError::UnknownSequence {
                sequence_id: sequence_id.to_owned(),
            })?;
        adjacent_sequence(&tree, sequence_id, direction)
    }

    /// Optimistically flips a unit's bookmark, confirming against the
    /// bookmarks API and reverting if the LMS refuses.
    pub async fn toggle_bookmark(&self, unit_id: &str, bookmarked: bool) -> Result<MutationOutcome> {
        let key = FieldKey::unit(unit_id, UnitField::Bookmarked);
        let confirm = async {
            if bookmarked {
                self.client.add_bookmark(unit_id).await
            } else {
                self.client.remove_bookmark(unit_id).await
            }
        };

        let outcome = self
            .mutations
            .apply(self.store().as_ref(), key, Value::Bool(bookmarked), confirm)
            .await?;
        tracing::debug!(unit_id, bookmarked, outcome = ?outcome, "bookmark toggle settled");
        Ok(outcome)
    }

    /// Whether the unit is locked behind the verified upgrade. `None` until
    /// both the course tree and its metadata are loaded.
    pub fn unit_paywalled(&self, course_id: &str, unit_id: &str) -> Option<bool> {
        let tree = self.course_tree(course_id)?;
        let unit = tree.unit(unit_id)?;
        let stored = self.store().model(&ModelType::CourseMeta, course_id)?;
        match serde_json::from_value::<CourseMetadata>(stored) {
            Ok(course) => Some(is_paywalled(unit, &course)),
            Err(err) => {
                tracing::warn!(course_id, error = %err, "stored course metadata is unreadable");
                None
            }
        }
    }

    pub fn mutation_phase(&self, key: &FieldKey) -> FieldPhase {
        self.mutations.phase(key)
    }

    pub fn spawn_metrics_reporter(
        &self,
        shutdown: CancellationToken,
        interval: std::time::Duration,
    ) -> JoinHandle<()> {
        spawn_metrics_reporter(self.telemetry.clone(), shutdown, interval)
    }
}

fn unit_model(unit: &SequenceUnit) -> Result<Value> {
    serde_json::to_value(unit).context("failed to serialize sequence unit")
}

/// Patches an existing model in place, or adds it when not yet loaded.
fn merge_model<S: ModelStore + ?Sized>(
    store: &S,
    model_type: ModelType,
    id: &str,
    model: Value,
) -> Result<()> {
    if store.model(&model_type, id).is_none() {
        return store
            .add_model(model_type.clone(), model)
            .with_context(|| format!("failed to add {model_type} {id}"));
    }

    let Value::Object(patch) = model else {
        bail!("{model_type} {id} is not a JSON object");
    };
    store
        .update_model(&model_type, id, patch)
        .with_context(|| format!("failed to update {model_type} {id}"))?;
    Ok(())
}
