use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use courseblock::api::{CircuitBreaker, CircuitState, ClientOptions};
use courseblock::{ApiError, CoursewareClient, HttpTransport, RestTransport};
use hyper::{Method, StatusCode};
use serde_json::json;

use crate::support::helpers::{
    course_home_path, init_tracing, sequence_metadata, test_client, COURSE_ID, USERNAME,
};
use crate::support::mock_lms::{MockLms, MockLmsServer};

fn fast_options(max_attempts: usize) -> ClientOptions {
    ClientOptions {
        request_timeout: Duration::from_millis(300),
        max_attempts,
        initial_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_millis(10),
        access_token: None,
    }
}

#[tokio::test]
async fn transient_server_errors_are_retried() -> Result<()> {
    init_tracing();
    let lms = MockLms::new();
    let path = "/api/courseware/sequence/seq-1";
    lms.respond(Method::GET, path, sequence_metadata());
    lms.fail_times(Method::GET, path, StatusCode::SERVICE_UNAVAILABLE, 2);
    let server = MockLmsServer::start(lms.clone()).await?;
    let transport = RestTransport::new(server.url(), fast_options(3))?;

    let body = transport.get(path).await?;

    assert_eq!(body["item_id"], "seq-1");
    assert_eq!(lms.hits(&Method::GET, path), 3);
    let metrics = transport.metrics();
    assert_eq!(metrics.total_retries, 2);
    assert_eq!(metrics.breaker_state, CircuitState::Closed);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn client_errors_fail_without_retry() -> Result<()> {
    init_tracing();
    let lms = MockLms::new();
    let server = MockLmsServer::start(lms.clone()).await?;
    let transport = RestTransport::new(server.url(), fast_options(3))?;

    let err = transport
        .get("/api/courseware/sequence/missing")
        .await
        .expect_err("unknown path is a 404");

    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::Status { status: 404, .. })
    ));
    assert_eq!(lms.hits(&Method::GET, "/api/courseware/sequence/missing"), 1);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn slow_reads_time_out_and_are_retried() -> Result<()> {
    init_tracing();
    let lms = MockLms::new();
    let path = course_home_path(COURSE_ID);
    lms.respond_slowly(Method::GET, path.clone(), json!({}), Duration::from_secs(2));
    let server = MockLmsServer::start(lms.clone()).await?;
    let transport = RestTransport::new(server.url(), fast_options(2))?;

    let err = transport.get(&path).await.expect_err("every attempt times out");

    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::Timeout { .. })
    ));
    assert_eq!(lms.hits(&Method::GET, &path), 2);
    assert_eq!(transport.metrics().total_timeouts, 2);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn slow_writes_are_not_replayed() -> Result<()> {
    init_tracing();
    let lms = MockLms::new();
    let path = "/api/bookmarks/v1/bookmarks/";
    lms.respond_slowly(Method::POST, path, json!({}), Duration::from_secs(2));
    let server = MockLmsServer::start(lms.clone()).await?;
    let transport = RestTransport::new(server.url(), fast_options(3))?;

    let err = transport
        .post_json(path, &json!({ "usage_id": "unit-1" }))
        .await
        .expect_err("write times out");

    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::Timeout { .. })
    ));
    assert_eq!(lms.hits(&Method::POST, path), 1);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn open_breaker_short_circuits_requests() -> Result<()> {
    init_tracing();
    let lms = MockLms::new();
    let path = "/api/courseware/sequence/seq-1";
    lms.fail(Method::GET, path, StatusCode::BAD_GATEWAY);
    let server = MockLmsServer::start(lms.clone()).await?;
    let breaker = Arc::new(CircuitBreaker::new(2, Duration::from_secs(60)));
    let transport = RestTransport::with_breaker(server.url(), fast_options(2), breaker.clone())?;

    transport.get(path).await.expect_err("upstream is down");
    assert_eq!(breaker.snapshot().state, CircuitState::Open);

    let err = transport.get(path).await.expect_err("breaker is open");
    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::CircuitOpen)
    ));
    assert_eq!(lms.hits(&Method::GET, path), 2, "open breaker sends nothing");

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn malformed_blocks_envelope_is_a_hard_error() -> Result<()> {
    init_tracing();
    let lms = MockLms::new();
    let server = MockLmsServer::start(lms.clone()).await?;
    let blocks = crate::support::helpers::blocks_path(COURSE_ID);
    lms.respond(Method::GET, blocks.clone(), json!({ "blocks": [] }));
    let client: CoursewareClient<RestTransport> = test_client(server.url())?;

    let err = client
        .course_blocks(COURSE_ID)
        .await
        .expect_err("envelope without root is rejected");

    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::MalformedResponse { .. })
    ));
    assert_eq!(lms.hits(&Method::GET, &blocks), 1);
    assert_eq!(client.username(), USERNAME);

    server.shutdown().await;
    Ok(())
}
