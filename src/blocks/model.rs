//! Typed course entities and the tree that indexes them by id.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub section_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub title: String,
    pub sequence_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sequence {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lms_web_url: Option<String>,
    pub unit_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub graded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_id: Option<String>,
}

/// Normalized course hierarchy.
///
/// Collections are ordered maps so two trees built from the same blocks compare
/// equal no matter how the input map was iterated. Lookups for ids that were
/// referenced but never delivered return `None`; callers treat that as "not
/// loaded".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseTree {
    pub(crate) root_id: String,
    pub(crate) courses: BTreeMap<String, Course>,
    pub(crate) sections: BTreeMap<String, Section>,
    pub(crate) sequences: BTreeMap<String, Sequence>,
    pub(crate) units: BTreeMap<String, Unit>,
}

impl CourseTree {
    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn courses(&self) -> &BTreeMap<String, Course> {
        &self.courses
    }

    pub fn sections(&self) -> &BTreeMap<String, Section> {
        &self.sections
    }

    pub fn sequences(&self) -> &BTreeMap<String, Sequence> {
        &self.sequences
    }

    pub fn units(&self) -> &BTreeMap<String, Unit> {
        &self.units
    }

    pub fn course(&self, id: &str) -> Option<&Course> {
        self.courses.get(id)
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.get(id)
    }

    pub fn sequence(&self, id: &str) -> Option<&Sequence> {
        self.sequences.get(id)
    }

    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.units.get(id)
    }

    pub fn root_course(&self) -> Option<&Course> {
        self.courses.get(&self.root_id)
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
            && self.sections.is_empty()
            && self.sequences.is_empty()
            && self.units.is_empty()
    }

    /// Sequence a learner lands on when no sequence was requested: the first
    /// sequence of the first section of the root course.
    pub fn first_sequence_id(&self) -> Option<&str> {
        let course = self.root_course()?;
        let section = self.section(course.section_ids.first()?)?;
        section.sequence_ids.first().map(String::as_str)
    }

    /// Sequences reachable from the root course, in outline order.
    ///
    /// Dangling section or sequence ids are skipped.
    pub fn sequence_ids_in_order(&self) -> Vec<&str> {
        let Some(course) = self.root_course() else {
            return Vec::new();
        };

        course
            .section_ids
            .iter()
            .filter_map(|section_id| self.section(section_id))
            .flat_map(|section| section.sequence_ids.iter())
            .filter(|sequence_id| self.sequences.contains_key(sequence_id.as_str()))
            .map(String::as_str)
            .collect()
    }
}
