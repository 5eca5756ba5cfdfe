//! Within-sequence navigation and the separate cross-sequence path.
//!
//! Moving past the first or last unit never wraps or indexes out of range; it
//! yields [`Navigation::Boundary`], and the caller resolves the neighbouring
//! sequence through [`adjacent_sequence`].

use super::metadata::SequencePosition;
use crate::blocks::CourseTree;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// The active unit moved to this unit inside the current sequence.
    Unit(String),
    /// The sequence edge was reached: `Next` means end of sequence, `Previous`
    /// means the learner should go to the previous sequence.
    Boundary(Direction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdjacentSequence {
    Sequence(String),
    /// No sequence exists beyond the current one in this direction.
    CourseBoundary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    UnknownUnit { sequence_id: String, unit_id: String },
    UnknownSequence { sequence_id: String },
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationError::UnknownUnit {
                sequence_id,
                unit_id,
            } => write!(f, "unit {unit_id} is not part of sequence {sequence_id}"),
            NavigationError::UnknownSequence { sequence_id } => {
                write!(f, "sequence {sequence_id} is not reachable from the course root")
            }
        }
    }
}

impl std::error::Error for NavigationError {}

/// Tab-selection payload. Tabs are 1-indexed here even though positions are
/// 0-indexed everywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationEvent {
    pub name: &'static str,
    pub id: String,
    pub current_tab: usize,
    pub tab_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_tab: Option<usize>,
    pub widget_placement: String,
}

impl SequencePosition {
    /// Advances to the following unit, or reports the end of the sequence.
    pub fn next(&mut self) -> Navigation {
        let target = match self.active_unit_index() {
            Some(index) => index + 1,
            None => 0,
        };
        match self.unit_ids.get(target).cloned() {
            Some(unit_id) => self.activate(unit_id),
            None => Navigation::Boundary(Direction::Next),
        }
    }

    /// Steps back to the preceding unit, or reports the start of the sequence.
    pub fn previous(&mut self) -> Navigation {
        match self.active_unit_index().and_then(|index| index.checked_sub(1)) {
            Some(target) => match self.unit_ids.get(target).cloned() {
                Some(unit_id) => self.activate(unit_id),
                None => Navigation::Boundary(Direction::Previous),
            },
            None => Navigation::Boundary(Direction::Previous),
        }
    }

    pub fn step(&mut self, direction: Direction) -> Navigation {
        match direction {
            Direction::Next => self.next(),
            Direction::Previous => self.previous(),
        }
    }

    /// Jumps directly to a unit of this sequence.
    pub fn jump_to(&mut self, unit_id: &str) -> Result<Navigation, NavigationError> {
        if self.index_of(unit_id).is_none() {
            return Err(NavigationError::UnknownUnit {
                sequence_id: self.id.clone(),
                unit_id: unit_id.to_owned(),
            });
        }
        Ok(self.activate(unit_id.to_owned()))
    }

    pub fn navigation_event(
        &self,
        name: &'static str,
        widget_placement: &str,
        target_unit_id: Option<&str>,
    ) -> NavigationEvent {
        let current_tab = self.active_unit_index().map_or(0, |index| index + 1);
        let target_tab = target_unit_id
            .and_then(|unit_id| self.index_of(unit_id))
            .map(|index| index + 1);
        let event = NavigationEvent {
            name,
            id: self.active_unit_id.clone().unwrap_or_default(),
            current_tab,
            tab_count: self.unit_ids.len(),
            target_tab,
            widget_placement: widget_placement.to_owned(),
        };
        tracing::debug!(
            event = name,
            sequence_id = %self.id,
            current_tab,
            target_tab = ?event.target_tab,
            widget_placement,
            "sequence navigation"
        );
        event
    }

    fn activate(&mut self, unit_id: String) -> Navigation {
        self.active_unit_id = Some(unit_id.clone());
        Navigation::Unit(unit_id)
    }
}

/// Resolves the sequence next to `sequence_id` in course outline order.
pub fn adjacent_sequence(
    tree: &CourseTree,
    sequence_id: &str,
    direction: Direction,
) -> Result<AdjacentSequence, NavigationError> {
    let ordered = tree.sequence_ids_in_order();
    let index = ordered
        .iter()
        .position(|id| *id == sequence_id)
        .ok_or_else(|| NavigationError::UnknownSequence {
            sequence_id: sequence_id.to_owned(),
        })?;

    let neighbour = match direction {
        Direction::Next => ordered.get(index + 1),
        Direction::Previous => index.checked_sub(1).and_then(|prev| ordered.get(prev)),
    };

    Ok(match neighbour {
        Some(id) => AdjacentSequence::Sequence((*id).to_owned()),
        None => AdjacentSequence::CourseBoundary,
    })
}
