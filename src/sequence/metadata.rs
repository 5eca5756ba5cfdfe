use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawGatedContent {
    #[serde(default)]
    pub gated: bool,
    #[serde(default)]
    pub prereq_id: Option<String>,
    #[serde(default)]
    pub prereq_url: Option<String>,
    #[serde(default)]
    pub prereq_section_name: Option<String>,
    #[serde(default)]
    pub gated_section_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawSequenceItem {
    pub id: String,
    #[serde(default)]
    pub bookmarked: bool,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub page_title: String,
    #[serde(rename = "type", default)]
    pub content_type: String,
}

/// Body of the sequence metadata endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawSequenceMetadata {
    pub item_id: String,
    #[serde(default)]
    pub display_name: String,
    pub items: Vec<RawSequenceItem>,
    #[serde(default)]
    pub banner_text: Option<String>,
    #[serde(default)]
    pub gated_content: Option<RawGatedContent>,
    #[serde(default)]
    pub is_time_limited: bool,
    /// 1-indexed position of the last visited unit.
    #[serde(default)]
    pub position: Option<u64>,
    #[serde(default)]
    pub save_position: bool,
    #[serde(default)]
    pub show_completion: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatedContent {
    pub gated: bool,
    pub prereq_id: Option<String>,
    pub prereq_url: Option<String>,
    pub prereq_section_name: Option<String>,
    pub gated_section_name: Option<String>,
}

impl From<RawGatedContent> for GatedContent {
    fn from(raw: RawGatedContent) -> Self {
        Self {
            gated: raw.gated,
            prereq_id: raw.prereq_id,
            prereq_url: raw.prereq_url,
            prereq_section_name: raw.prereq_section_name,
            gated_section_name: raw.gated_section_name,
        }
    }
}

/// Navigation state for one sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencePosition {
    pub id: String,
    pub title: String,
    pub unit_ids: Vec<String>,
    /// `None` only when the sequence has no units.
    pub active_unit_id: Option<String>,
    pub banner_text: Option<String>,
    pub gated_content: GatedContent,
    pub is_time_limited: bool,
    pub save_unit_position: bool,
    pub show_completion: bool,
}

impl SequencePosition {
    pub fn active_unit_index(&self) -> Option<usize> {
        let active = self.active_unit_id.as_deref()?;
        self.index_of(active)
    }

    pub fn index_of(&self, unit_id: &str) -> Option<usize> {
        self.unit_ids.iter().position(|id| id == unit_id)
    }

    pub fn is_first_unit(&self) -> bool {
        self.active_unit_index() == Some(0)
    }

    pub fn is_last_unit(&self) -> bool {
        match self.active_unit_index() {
            Some(index) => index + 1 == self.unit_ids.len(),
            None => false,
        }
    }

    pub fn is_gated(&self) -> bool {
        self.gated_content.gated
    }
}

/// Per-unit state delivered alongside the sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceUnit {
    pub id: String,
    pub sequence_id: String,
    pub bookmarked: bool,
    pub complete: bool,
    pub title: String,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceMetadata {
    pub sequence: SequencePosition,
    pub units: Vec<SequenceUnit>,
}

impl SequenceMetadata {
    pub fn from_raw(raw: RawSequenceMetadata) -> Self {
        let unit_ids: Vec<String> = raw.items.iter().map(|item| item.id.clone()).collect();
        let active_index = active_index(raw.position, unit_ids.len());
        let active_unit_id = active_index.and_then(|index| unit_ids.get(index).cloned());

        let units = raw
            .items
            .into_iter()
            .map(|item| SequenceUnit {
                id: item.id,
                sequence_id: raw.item_id.clone(),
                bookmarked: item.bookmarked,
                complete: item.complete,
                title: item.page_title,
                content_type: item.content_type,
            })
            .collect();

        let sequence = SequencePosition {
            id: raw.item_id,
            title: raw.display_name,
            unit_ids,
            active_unit_id,
            banner_text: raw.banner_text,
            gated_content: raw.gated_content.map(GatedContent::from).unwrap_or_default(),
            is_time_limited: raw.is_time_limited,
            save_unit_position: raw.save_position,
            show_completion: raw.show_completion,
        };

        Self { sequence, units }
    }
}

/// Converts the backend's 1-indexed position into a 0-indexed one.
///
/// A missing or zero position selects the first unit; positions past the end
/// select the last unit.
fn active_index(position: Option<u64>, unit_count: usize) -> Option<usize> {
    if unit_count == 0 {
        return None;
    }
    let index = match position {
        Some(position) if position > 0 => {
            usize::try_from(position - 1).unwrap_or(usize::MAX)
        }
        _ => 0,
    };
    Some(index.min(unit_count - 1))
}
