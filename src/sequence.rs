//! Sequence position state rebuilt on every sequence fetch, plus the
//! within-sequence and cross-sequence navigation rules built on top of it.

pub mod metadata;
pub mod navigation;

pub use metadata::{
    GatedContent, RawGatedContent, RawSequenceItem, RawSequenceMetadata, SequenceMetadata,
    SequencePosition, SequenceUnit,
};
pub use navigation::{
    adjacent_sequence, AdjacentSequence, Direction, Navigation, NavigationError, NavigationEvent,
};
