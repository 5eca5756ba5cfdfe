use crate::store::ModelType;
use std::fmt;
use std::str::FromStr;

/// Course home tabs whose data is fetched alongside the course home metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CourseTab {
    Outline,
    Dates,
    Progress,
}

impl CourseTab {
    pub const ALL: [CourseTab; 3] = [CourseTab::Outline, CourseTab::Dates, CourseTab::Progress];

    pub fn as_str(&self) -> &'static str {
        match self {
            CourseTab::Outline => "outline",
            CourseTab::Dates => "dates",
            CourseTab::Progress => "progress",
        }
    }

    pub fn model_type(&self) -> ModelType {
        ModelType::Tab(self.as_str().to_owned())
    }
}

impl fmt::Display for CourseTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CourseTab {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        CourseTab::ALL
            .into_iter()
            .find(|tab| tab.as_str() == value.trim())
            .ok_or_else(|| anyhow::anyhow!("unknown course tab {value}"))
    }
}
