//! Course block records and the two-pass normalizer that turns the flat
//! blocks API payload into a typed course tree with parent back-references.

pub mod model;
pub mod normalize;
pub mod raw;

pub use model::{Course, CourseTree, Section, Sequence, Unit};
pub use normalize::{
    classify, decorate, normalize, normalize_course, BlockAnomaly, ClassifiedBlocks,
    NormalizedBlocks,
};
pub use raw::{BlockKind, RawBlock, RawBlocksResponse};
