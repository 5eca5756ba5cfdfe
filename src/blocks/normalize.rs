//! Flat block map to course tree.
//!
//! Normalization runs as two explicit passes over immutable snapshots:
//! - [`classify`] routes every record into its typed collection and records
//!   unrecognised types as anomalies.
//! - [`decorate`] walks the forward child lists and attaches each child's
//!   parent id. A child's parent is unknown while the child itself is being
//!   classified, so this cannot happen in the first pass.
//!
//! Neither pass fails: dangling child ids are skipped and unexpected records
//! are dropped and reported, so one malformed block never hides its siblings.

use super::model::{Course, CourseTree, Section, Sequence, Unit};
use super::raw::{BlockKind, RawBlock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// Non-fatal deviation from the expected block shape.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum BlockAnomaly {
    /// The block's `type` is not part of the course hierarchy.
    UnexpectedType { id: String, block_type: String },
    /// The block is listed by more than one parent; the last parent visited in
    /// id order owns the back-reference.
    SharedChild {
        id: String,
        kind: BlockKind,
        kept_parent: String,
        dropped_parent: String,
    },
    /// Two map entries carry the same block id; the entry with the smaller
    /// map key is kept.
    DuplicateId { id: String, dropped_key: String },
}

impl fmt::Display for BlockAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockAnomaly::UnexpectedType { id, block_type } => write!(
                f,
                "unexpected course block type {block_type} with id {id}; expected course, \
                 chapter, sequential or vertical"
            ),
            BlockAnomaly::SharedChild {
                id,
                kind,
                kept_parent,
                dropped_parent,
            } => write!(
                f,
                "{} {id} is listed by {dropped_parent} and {kept_parent}; keeping {kept_parent}",
                kind.as_str()
            ),
            BlockAnomaly::DuplicateId { id, dropped_key } => {
                write!(f, "block {id} is listed again under key {dropped_key}; ignoring it")
            }
        }
    }
}

/// Output of the classification pass: typed collections without parent ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedBlocks {
    pub courses: BTreeMap<String, Course>,
    pub sections: BTreeMap<String, Section>,
    pub sequences: BTreeMap<String, Sequence>,
    pub units: BTreeMap<String, Unit>,
    pub anomalies: Vec<BlockAnomaly>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedBlocks {
    pub tree: CourseTree,
    pub anomalies: Vec<BlockAnomaly>,
}

/// Builds the course tree rooted at `root_id` from the flat block map, for
/// listings whose root block id is also the course id.
pub fn normalize(root_id: &str, blocks: &HashMap<String, RawBlock>) -> NormalizedBlocks {
    normalize_course(root_id, root_id, blocks)
}

/// Builds the tree of `course_id` from a listing whose root is the block
/// `root_block_id`.
///
/// The root course entity takes `course_id` as its id, so sections point at
/// the same id that course metadata is stored under.
pub fn normalize_course(
    course_id: &str,
    root_block_id: &str,
    blocks: &HashMap<String, RawBlock>,
) -> NormalizedBlocks {
    let classified = classify(course_id, root_block_id, blocks);
    let (tree, mut anomalies) = decorate(course_id, classified);
    anomalies.sort();

    for anomaly in &anomalies {
        tracing::warn!(course_id, anomaly = %anomaly, "course block anomaly");
    }
    if tree.root_course().is_none() {
        tracing::debug!(course_id, root_block_id, "root block missing from blocks payload");
    }
    tracing::debug!(
        course_id,
        courses = tree.courses.len(),
        sections = tree.sections.len(),
        sequences = tree.sequences.len(),
        units = tree.units.len(),
        anomalies = anomalies.len(),
        "normalized course blocks"
    );

    NormalizedBlocks { tree, anomalies }
}

/// First pass: route each block into its typed collection.
///
/// Entries are visited in map-key order so duplicate block ids resolve the
/// same way for any input ordering. The course block `root_block_id` is
/// renamed to `course_id`.
pub fn classify(
    course_id: &str,
    root_block_id: &str,
    blocks: &HashMap<String, RawBlock>,
) -> ClassifiedBlocks {
    let mut classified = ClassifiedBlocks::default();
    let mut entries: Vec<_> = blocks.iter().collect();
    entries.sort_by(|(left, _), (right, _)| left.cmp(right));
    let mut seen = HashSet::new();

    for (key, block) in entries {
        if !seen.insert(block.id.as_str()) {
            classified.anomalies.push(BlockAnomaly::DuplicateId {
                id: block.id.clone(),
                dropped_key: key.clone(),
            });
            continue;
        }

        let kind = block.kind();
        let id = if kind == Some(BlockKind::Course) && block.id == root_block_id {
            course_id.to_owned()
        } else {
            block.id.clone()
        };
        match kind {
            Some(BlockKind::Course) => {
                classified.courses.insert(
                    id.clone(),
                    Course {
                        id,
                        title: block.display_name.clone(),
                        section_ids: block.child_ids(),
                    },
                );
            }
            Some(BlockKind::Section) => {
                classified.sections.insert(
                    id.clone(),
                    Section {
                        id,
                        title: block.display_name.clone(),
                        sequence_ids: block.child_ids(),
                        course_id: None,
                    },
                );
            }
            Some(BlockKind::Sequence) => {
                classified.sequences.insert(
                    id.clone(),
                    Sequence {
                        id,
                        title: block.display_name.clone(),
                        lms_web_url: block.lms_web_url.clone(),
                        unit_ids: block.child_ids(),
                        section_id: None,
                    },
                );
            }
            Some(BlockKind::Unit) => {
                classified.units.insert(
                    id.clone(),
                    Unit {
                        id,
                        title: block.display_name.clone(),
                        graded: block.graded.unwrap_or(false),
                        sequence_id: None,
                    },
                );
            }
            None => classified.anomalies.push(BlockAnomaly::UnexpectedType {
                id: block.id.clone(),
                block_type: block.block_type.clone(),
            }),
        }
    }

    classified.anomalies.sort();
    classified
}

/// Second pass: attach parent ids to every child that was classified.
///
/// Returns the decorated tree together with the anomalies gathered by both
/// passes.
pub fn decorate(root_id: &str, classified: ClassifiedBlocks) -> (CourseTree, Vec<BlockAnomaly>) {
    let ClassifiedBlocks {
        courses,
        mut sections,
        mut sequences,
        mut units,
        mut anomalies,
    } = classified;

    for course in courses.values() {
        for section_id in &course.section_ids {
            if let Some(section) = sections.get_mut(section_id) {
                link_parent(
                    &mut section.course_id,
                    section_id,
                    BlockKind::Section,
                    &course.id,
                    &mut anomalies,
                );
            }
        }
    }

    for section in sections.values() {
        for sequence_id in &section.sequence_ids {
            if let Some(sequence) = sequences.get_mut(sequence_id) {
                link_parent(
                    &mut sequence.section_id,
                    sequence_id,
                    BlockKind::Sequence,
                    &section.id,
                    &mut anomalies,
                );
            }
        }
    }

    for sequence in sequences.values() {
        for unit_id in &sequence.unit_ids {
            if let Some(unit) = units.get_mut(unit_id) {
                link_parent(
                    &mut unit.sequence_id,
                    unit_id,
                    BlockKind::Unit,
                    &sequence.id,
                    &mut anomalies,
                );
            }
        }
    }

    let tree = CourseTree {
        root_id: root_id.to_owned(),
        courses,
        sections,
        sequences,
        units,
    };
    (tree, anomalies)
}

fn link_parent(
    slot: &mut Option<String>,
    child_id: &str,
    kind: BlockKind,
    parent_id: &str,
    anomalies: &mut Vec<BlockAnomaly>,
) {
    if let Some(previous) = slot.as_deref() {
        if previous != parent_id {
            anomalies.push(BlockAnomaly::SharedChild {
                id: child_id.to_owned(),
                kind,
                kept_parent: parent_id.to_owned(),
                dropped_parent: previous.to_owned(),
            });
        }
    }
    *slot = Some(parent_id.to_owned());
}
