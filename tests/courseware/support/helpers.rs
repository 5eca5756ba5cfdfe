use std::time::Duration;

use anyhow::Result;
use courseblock::{CoursewareClient, CoursewareConfig, RestTransport};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

static TRACING_SUBSCRIBER: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn init_tracing() {
    Lazy::force(&TRACING_SUBSCRIBER);
}

pub const COURSE_ID: &str = "course-v1:edX+DemoX+2024";
pub const USERNAME: &str = "learner";

pub fn test_config(base_url: &str) -> Result<CoursewareConfig> {
    CoursewareConfig::builder()
        .lms_base_url(base_url)
        .username(USERNAME)
        .access_token("test-token")
        .request_timeout(Duration::from_millis(500))
        .max_attempts(2)
        .initial_backoff(Duration::from_millis(5))
        .max_backoff(Duration::from_millis(10))
        .build()
}

pub fn test_client(base_url: &str) -> Result<CoursewareClient<RestTransport>> {
    CoursewareClient::from_config(&test_config(base_url)?)
}

pub fn blocks_path(course_id: &str) -> String {
    format!(
        "/api/courses/v2/blocks/?course_id={}&username={USERNAME}&depth=3&requested_fields=children%2Cshow_gated_sections%2Cgraded",
        urlencoding::encode(course_id)
    )
}

pub fn metadata_path(course_id: &str) -> String {
    format!("/api/courseware/course/{}", urlencoding::encode(course_id))
}

pub fn course_home_path(course_id: &str) -> String {
    format!(
        "/api/course_home/v1/course_metadata/{}",
        urlencoding::encode(course_id)
    )
}

pub fn tab_path(tab: &str, course_id: &str) -> String {
    format!("/api/course_home/v1/{tab}/{}", urlencoding::encode(course_id))
}

pub fn course_metadata() -> Value {
    json!({
        "id": COURSE_ID,
        "name": "Demonstration Course",
        "number": "DemoX",
        "org": "edX",
        "enrollment": { "mode": "verified", "is_active": true },
        "can_load_courseware": true,
        "is_staff": false,
        "tabs": [{ "tab_id": "courseware", "title": "Course", "url": "/course" }]
    })
}

pub fn course_blocks() -> Value {
    json!({
        "root": "block-v1:edX+DemoX+2024+type@course+block@course",
        "blocks": {
            "block-v1:edX+DemoX+2024+type@course+block@course": {
                "id": "block-v1:edX+DemoX+2024+type@course+block@course",
                "type": "course",
                "display_name": "Demonstration Course",
                "children": ["chapter-1", "chapter-2"]
            },
            "chapter-1": { "id": "chapter-1", "type": "chapter", "display_name": "Introduction", "children": ["seq-1"] },
            "chapter-2": { "id": "chapter-2", "type": "chapter", "display_name": "Example Week", "children": ["seq-2"] },
            "seq-1": {
                "id": "seq-1",
                "type": "sequential",
                "display_name": "Demo Sequence",
                "lms_web_url": "https://lms.test/jump/seq-1",
                "children": ["unit-1", "unit-2"]
            },
            "seq-2": { "id": "seq-2", "type": "sequential", "display_name": "Homework", "children": ["unit-3"] },
            "unit-1": { "id": "unit-1", "type": "vertical", "display_name": "Welcome" },
            "unit-2": { "id": "unit-2", "type": "vertical", "display_name": "Video", "graded": false },
            "unit-3": { "id": "unit-3", "type": "vertical", "display_name": "Quiz", "graded": true },
            "discussion-1": { "id": "discussion-1", "type": "discussion", "display_name": "Forum" }
        }
    })
}

pub fn sequence_metadata() -> Value {
    json!({
        "item_id": "seq-1",
        "display_name": "Demo Sequence",
        "items": [
            { "id": "unit-1", "bookmarked": false, "complete": true, "page_title": "Welcome", "type": "other" },
            { "id": "unit-2", "bookmarked": true, "complete": false, "page_title": "Video", "type": "video" }
        ],
        "banner_text": null,
        "gated_content": { "gated": false },
        "is_time_limited": false,
        "position": 2,
        "save_position": true,
        "show_completion": true
    })
}
