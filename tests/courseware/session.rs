use std::sync::Arc;

use anyhow::Result;
use courseblock::{
    AdjacentSequence, CompositeStatus, CourseTab, CoursewareClient, CoursewareSession,
    Direction, FetchState, FieldKey, FieldPhase, InMemoryModelStore, ModelStore, ModelType,
    MutationOutcome, Navigation, RestTransport, UnitField,
};
use hyper::{Method, StatusCode};
use serde_json::json;

use crate::support::helpers::{
    blocks_path, course_blocks, course_home_path, course_metadata, init_tracing, metadata_path,
    sequence_metadata, tab_path, test_config, COURSE_ID,
};
use crate::support::mock_lms::{MockLms, MockLmsServer};

fn session_for(server: &MockLmsServer) -> Result<CoursewareSession<RestTransport>> {
    CoursewareSession::from_config(&test_config(server.url())?)
}

fn serve_course(lms: &MockLms) {
    lms.respond(Method::GET, metadata_path(COURSE_ID), course_metadata());
    lms.respond(Method::GET, blocks_path(COURSE_ID), course_blocks());
    lms.respond(
        Method::GET,
        "/api/courseware/sequence/seq-1",
        sequence_metadata(),
    );
}

#[tokio::test]
async fn course_load_commits_metadata_and_tree() -> Result<()> {
    init_tracing();
    let lms = MockLms::new();
    serve_course(&lms);
    let server = MockLmsServer::start(lms.clone()).await?;
    let session = session_for(&server)?;

    let load = session.load_course(COURSE_ID).await;

    assert_eq!(load.outcome.status, CompositeStatus::Success);
    assert_eq!(load.default_sequence_id(), Some("seq-1"));
    assert_eq!(session.course_state(COURSE_ID), Some(FetchState::Loaded));

    let store = session.store();
    let meta = store
        .model(&ModelType::CourseMeta, COURSE_ID)
        .expect("course metadata committed");
    assert_eq!(meta["title"], "Demonstration Course");
    assert!(store.model(&ModelType::Course, COURSE_ID).is_some());
    assert!(store
        .models_of(&ModelType::Section)
        .iter()
        .all(|section| section["courseId"] == COURSE_ID));
    assert_eq!(store.models_of(&ModelType::Section).len(), 2);
    assert_eq!(store.models_of(&ModelType::Sequence).len(), 2);
    assert_eq!(store.models_of(&ModelType::Unit).len(), 3);

    let unit = store.model(&ModelType::Unit, "unit-3").expect("unit committed");
    assert_eq!(unit["sequenceId"], "seq-2");

    let snapshot = session.telemetry().snapshot();
    assert_eq!(snapshot.anomalies, 1, "discussion block is reported, not fatal");

    let requests = lms.requests();
    assert!(requests
        .iter()
        .all(|request| request.authorization.as_deref() == Some("Bearer test-token")));

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn failed_blocks_request_still_commits_metadata() -> Result<()> {
    init_tracing();
    let lms = MockLms::new();
    serve_course(&lms);
    lms.fail(Method::GET, blocks_path(COURSE_ID), StatusCode::FORBIDDEN);
    let server = MockLmsServer::start(lms.clone()).await?;
    let session = session_for(&server)?;

    let load = session.load_course(COURSE_ID).await;

    assert_eq!(load.outcome.status, CompositeStatus::Failure);
    assert!(load.tree.is_none());
    assert!(session.course_tree(COURSE_ID).is_none());
    assert_eq!(session.course_state(COURSE_ID), Some(FetchState::Failed));
    assert!(session
        .store()
        .model(&ModelType::CourseMeta, COURSE_ID)
        .is_some());
    assert!(session.store().models_of(&ModelType::Unit).is_empty());
    assert_eq!(lms.hits(&Method::GET, &blocks_path(COURSE_ID)), 1, "403 is not retried");

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn tab_fetch_keeps_home_metadata_when_tab_fails() -> Result<()> {
    init_tracing();
    let lms = MockLms::new();
    lms.respond(
        Method::GET,
        course_home_path(COURSE_ID),
        json!({ "is_staff": false, "tabs": [{ "tab_id": "dates" }] }),
    );
    lms.fail(Method::GET, tab_path("dates", COURSE_ID), StatusCode::INTERNAL_SERVER_ERROR);
    let server = MockLmsServer::start(lms.clone()).await?;
    let session = session_for(&server)?;

    let outcome = session.fetch_tab(COURSE_ID, CourseTab::Dates).await;

    assert_eq!(outcome.status, CompositeStatus::Failure);
    assert_eq!(session.tab_state(COURSE_ID), Some(FetchState::Failed));
    let home = session
        .store()
        .model(&ModelType::CourseHomeMeta, COURSE_ID)
        .expect("home metadata committed despite tab failure");
    assert_eq!(home["isStaff"], false);
    assert!(session
        .store()
        .model(&CourseTab::Dates.model_type(), COURSE_ID)
        .is_none());
    assert_eq!(
        lms.hits(&Method::GET, &tab_path("dates", COURSE_ID)),
        2,
        "server errors are retried up to max_attempts"
    );

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn sequence_navigation_crosses_into_next_sequence() -> Result<()> {
    init_tracing();
    let lms = MockLms::new();
    serve_course(&lms);
    let server = MockLmsServer::start(lms).await?;
    let session = session_for(&server)?;

    session.load_course(COURSE_ID).await;
    let load = session.load_sequence("seq-1").await?;
    let position = load.position().expect("only load of seq-1 is current");
    assert_eq!(position.active_unit_id.as_deref(), Some("unit-2"));
    assert!(position.is_last_unit());

    assert_eq!(
        session.step("seq-1", Direction::Next)?,
        Navigation::Boundary(Direction::Next)
    );
    assert_eq!(
        session.adjacent_sequence(COURSE_ID, "seq-1", Direction::Next)?,
        AdjacentSequence::Sequence("seq-2".to_owned())
    );
    assert_eq!(
        session.adjacent_sequence(COURSE_ID, "seq-2", Direction::Next)?,
        AdjacentSequence::CourseBoundary
    );
    assert_eq!(
        session.step("seq-1", Direction::Previous)?,
        Navigation::Unit("unit-1".to_owned())
    );

    let unit = session
        .store()
        .model(&ModelType::Unit, "unit-2")
        .expect("unit merged");
    assert_eq!(unit["bookmarked"], true);
    assert_eq!(unit["sequenceId"], "seq-1");

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn rejected_bookmark_is_reverted() -> Result<()> {
    init_tracing();
    let lms = MockLms::new();
    serve_course(&lms);
    lms.fail(
        Method::POST,
        "/api/bookmarks/v1/bookmarks/",
        StatusCode::INTERNAL_SERVER_ERROR,
    );
    let server = MockLmsServer::start(lms.clone()).await?;
    let session = session_for(&server)?;
    session.load_sequence("seq-1").await?;

    let outcome = session.toggle_bookmark("unit-1", true).await?;

    assert!(matches!(outcome, MutationOutcome::Reverted { .. }));
    let unit = session
        .store()
        .model(&ModelType::Unit, "unit-1")
        .expect("unit present");
    assert_eq!(unit["bookmarked"], false);
    assert_eq!(
        session.mutation_phase(&FieldKey::unit("unit-1", UnitField::Bookmarked)),
        FieldPhase::Reverted
    );

    let posted = lms
        .requests()
        .into_iter()
        .find(|request| request.method == Method::POST)
        .expect("bookmark request sent");
    assert_eq!(posted.body, Some(json!({ "usage_id": "unit-1" })));

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn accepted_bookmark_removal_commits() -> Result<()> {
    init_tracing();
    let lms = MockLms::new();
    serve_course(&lms);
    lms.respond(
        Method::DELETE,
        "/api/bookmarks/v1/bookmarks/learner,unit-2/",
        json!(null),
    );
    let server = MockLmsServer::start(lms.clone()).await?;
    let store = Arc::new(InMemoryModelStore::new());
    let client = CoursewareClient::from_config(&test_config(server.url())?)?;
    let session = CoursewareSession::new(client, store.clone());
    session.load_sequence("seq-1").await?;

    let outcome = session.toggle_bookmark("unit-2", false).await?;

    assert_eq!(outcome, MutationOutcome::Committed);
    let unit = store.model(&ModelType::Unit, "unit-2").expect("unit present");
    assert_eq!(unit["bookmarked"], false);
    assert_eq!(
        lms.hits(&Method::DELETE, "/api/bookmarks/v1/bookmarks/learner,unit-2/"),
        1
    );
    assert_eq!(session.telemetry().snapshot().mutations_committed, 1);

    server.shutdown().await;
    Ok(())
}
