//! Course-level metadata as served by the courseware API, and the shape the
//! rest of the crate consumes.

use crate::api::keys::camel_case_keys;
use crate::blocks::Unit;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEnrollment {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCourseMetadata {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub org: String,
    #[serde(default)]
    pub content_type_gating_enabled: bool,
    #[serde(default)]
    pub course_expired_message: Option<String>,
    #[serde(default)]
    pub enrollment_start: Option<String>,
    #[serde(default)]
    pub enrollment_end: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub enrollment: RawEnrollment,
    #[serde(default)]
    pub can_load_courseware: bool,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub verified_mode: Option<Value>,
    #[serde(default)]
    pub tabs: Vec<Value>,
    #[serde(default)]
    pub show_calculator: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseMetadata {
    pub id: String,
    pub title: String,
    pub number: String,
    pub org: String,
    pub content_type_gating_enabled: bool,
    pub course_expired_message: Option<String>,
    pub enrollment_start: Option<String>,
    pub enrollment_end: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub enrollment_mode: Option<String>,
    pub is_enrolled: bool,
    pub can_load_courseware: bool,
    pub is_staff: bool,
    pub verified_mode: Option<Value>,
    pub tabs: Vec<Value>,
    pub show_calculator: bool,
}

impl From<RawCourseMetadata> for CourseMetadata {
    fn from(raw: RawCourseMetadata) -> Self {
        Self {
            id: raw.id,
            title: raw.name,
            number: raw.number,
            org: raw.org,
            content_type_gating_enabled: raw.content_type_gating_enabled,
            course_expired_message: raw.course_expired_message,
            enrollment_start: raw.enrollment_start,
            enrollment_end: raw.enrollment_end,
            start: raw.start,
            end: raw.end,
            enrollment_mode: raw.enrollment.mode,
            is_enrolled: raw.enrollment.is_active,
            can_load_courseware: raw.can_load_courseware,
            is_staff: raw.is_staff,
            verified_mode: raw.verified_mode.map(camel_case_keys),
            tabs: raw.tabs.into_iter().map(camel_case_keys).collect(),
            show_calculator: raw.show_calculator,
        }
    }
}

/// A graded unit is locked for audit learners when the course sells a
/// verified upgrade.
pub fn is_paywalled(unit: &Unit, course: &CourseMetadata) -> bool {
    let sells_upgrade = course
        .verified_mode
        .as_ref()
        .is_some_and(|mode| !mode.is_null());
    unit.graded && sells_upgrade && course.enrollment_mode.as_deref() == Some("audit")
}
