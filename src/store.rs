//! Shared model store that composite fetches and targeted mutations commit
//! into, keyed by model type and entity id.

pub mod commit;
pub mod memory;
pub mod types;

pub use commit::{commit_tree, tree_models};
pub use memory::InMemoryModelStore;
pub use types::{model_id, ModelStore, ModelType, StoreError};
