use std::collections::HashMap;
use std::sync::Mutex;

/// Load state of a logical request, as shown to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Loading,
    Loaded,
    Failed,
}

/// `(scope, entity_id)`. The scope is the empty string for unscoped requests.
pub type RequestKey = (String, String);

pub fn request_key(scope: &str, entity_id: &str) -> RequestKey {
    (scope.to_owned(), entity_id.to_owned())
}

/// Monotonic per-entity request counters used to discard stale completions.
#[derive(Debug, Default)]
pub struct RequestGenerations {
    current: Mutex<HashMap<RequestKey, u64>>,
}

impl RequestGenerations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new request for `key` and returns its generation.
    pub fn begin(&self, key: &RequestKey) -> u64 {
        let mut guard = self.current.lock().expect("generation lock poisoned");
        let generation = guard.entry(key.clone()).or_insert(0);
        *generation = generation.saturating_add(1);
        *generation
    }

    pub fn is_current(&self, key: &RequestKey, generation: u64) -> bool {
        self.current
            .lock()
            .expect("generation lock poisoned")
            .get(key)
            .is_some_and(|current| *current == generation)
    }
}
