//! Typed access to the LMS endpoints a courseware session needs.

use crate::api::course::{CourseMetadata, RawCourseMetadata};
use crate::api::error::ApiError;
use crate::api::keys::camel_case_keys;
use crate::api::rest::RestTransport;
use crate::api::transport::HttpTransport;
use crate::blocks::{normalize_course, NormalizedBlocks, RawBlocksResponse};
use crate::fetch::CourseTab;
use crate::runtime::config::CoursewareConfig;
use crate::sequence::{RawSequenceMetadata, SequenceMetadata};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use urlencoding::encode;

const BLOCKS_REQUESTED_FIELDS: &str = "children,show_gated_sections,graded";
const BLOCKS_DEPTH: u32 = 3;

pub struct CoursewareClient<T> {
    transport: T,
    lms_base_url: String,
    username: String,
}

impl CoursewareClient<RestTransport> {
    pub fn from_config(config: &CoursewareConfig) -> Result<Self> {
        let transport = RestTransport::from_config(config)?;
        Ok(Self::new(transport, config.lms_base_url(), config.username()))
    }
}

impl<T: HttpTransport> CoursewareClient<T> {
    pub fn new(transport: T, lms_base_url: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            transport,
            lms_base_url: lms_base_url.into().trim_end_matches('/').to_owned(),
            username: username.into(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub async fn course_metadata(&self, course_id: &str) -> Result<CourseMetadata> {
        let path = format!("/api/courseware/course/{}", encode(course_id));
        let raw: RawCourseMetadata = self.get_decoded(&path).await?;
        Ok(raw.into())
    }

    /// Fetches the learner's block listing and normalizes it into a tree.
    pub async fn course_blocks(&self, course_id: &str) -> Result<NormalizedBlocks> {
        let path = format!(
            "/api/courses/v2/blocks/?course_id={}&username={}&depth={}&requested_fields={}",
            encode(course_id),
            encode(&self.username),
            BLOCKS_DEPTH,
            encode(BLOCKS_REQUESTED_FIELDS),
        );
        let response: RawBlocksResponse = self.get_decoded(&path).await?;
        let normalized = normalize_course(course_id, &response.root, &response.blocks);
        tracing::debug!(
            course_id,
            root = %response.root,
            blocks = response.blocks.len(),
            anomalies = normalized.anomalies.len(),
            "course blocks normalized"
        );
        Ok(normalized)
    }

    pub async fn sequence_metadata(&self, sequence_id: &str) -> Result<SequenceMetadata> {
        let path = format!("/api/courseware/sequence/{}", encode(sequence_id));
        let raw: RawSequenceMetadata = self.get_decoded(&path).await?;
        Ok(SequenceMetadata::from_raw(raw))
    }

    pub async fn course_home_metadata(&self, course_id: &str) -> Result<Value> {
        let path = format!("/api/course_home/v1/course_metadata/{}", encode(course_id));
        self.get_object(&path).await
    }

    pub async fn tab_data(&self, course_id: &str, tab: CourseTab) -> Result<Value> {
        let path = format!("/api/course_home/v1/{}/{}", tab.as_str(), encode(course_id));
        self.get_object(&path).await
    }

    pub async fn add_bookmark(&self, usage_id: &str) -> Result<()> {
        let body = json!({ "usage_id": usage_id });
        self.transport
            .post_json("/api/bookmarks/v1/bookmarks/", &body)
            .await
            .with_context(|| format!("failed to bookmark {usage_id}"))?;
        Ok(())
    }

    pub async fn remove_bookmark(&self, usage_id: &str) -> Result<()> {
        let path = format!(
            "/api/bookmarks/v1/bookmarks/{},{}/",
            encode(&self.username),
            encode(usage_id)
        );
        self.transport
            .delete(&path)
            .await
            .with_context(|| format!("failed to remove bookmark {usage_id}"))?;
        Ok(())
    }

    /// Absolute URL of the embeddable student view for a unit.
    pub fn xblock_url(&self, unit_id: &str, format: Option<&str>) -> String {
        let mut url = format!(
            "{}/xblock/{}?show_title=0&show_bookmark_button=0&in_mfe=1",
            self.lms_base_url, unit_id
        );
        if let Some(format) = format {
            url.push_str("&format=");
            url.push_str(&encode(format));
        }
        url
    }

    async fn get_decoded<D: DeserializeOwned>(&self, path: &str) -> Result<D> {
        let value = self.transport.get(path).await?;
        serde_json::from_value(value).map_err(|err| {
            ApiError::MalformedResponse {
                path: path.to_owned(),
                reason: err.to_string(),
            }
            .into()
        })
    }

    async fn get_object(&self, path: &str) -> Result<Value> {
        let value = self.transport.get(path).await?;
        if !value.is_object() {
            return Err(ApiError::MalformedResponse {
                path: path.to_owned(),
                reason: "expected a JSON object".to_owned(),
            }
            .into());
        }
        Ok(camel_case_keys(value))
    }
}
