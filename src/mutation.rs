//! Optimistic field updates with an explicit per-field state machine.

pub mod field;
pub mod tracker;

pub use field::{FieldKey, FieldPhase, UnitField};
pub use tracker::{MutationOutcome, MutationTracker};
