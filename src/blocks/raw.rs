//! Wire shapes returned by the course blocks endpoint.

use serde::Deserialize;
use std::collections::HashMap;

/// Structural level of a block once its `type` tag has been recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockKind {
    Course,
    Section,
    Sequence,
    Unit,
}

impl BlockKind {
    /// Maps the upstream `type` tag to a structural level.
    ///
    /// Returns `None` for anything outside `course`, `chapter`, `sequential`
    /// and `vertical`; callers treat that as a non-fatal anomaly.
    pub fn from_type_tag(tag: &str) -> Option<Self> {
        match tag {
            "course" => Some(Self::Course),
            "chapter" => Some(Self::Section),
            "sequential" => Some(Self::Sequence),
            "vertical" => Some(Self::Unit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Course => "course",
            Self::Section => "section",
            Self::Sequence => "sequence",
            Self::Unit => "unit",
        }
    }
}

/// A single block record as delivered by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub children: Option<Vec<String>>,
    #[serde(default)]
    pub graded: Option<bool>,
    #[serde(default)]
    pub lms_web_url: Option<String>,
}

impl RawBlock {
    pub fn kind(&self) -> Option<BlockKind> {
        BlockKind::from_type_tag(&self.block_type)
    }

    /// Child ids in upstream order; an absent list is an empty one.
    pub fn child_ids(&self) -> Vec<String> {
        self.children.clone().unwrap_or_default()
    }
}

/// Top-level envelope of the blocks endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBlocksResponse {
    pub root: String,
    pub blocks: HashMap<String, RawBlock>,
}
