use std::{
    collections::{HashMap, VecDeque},
    convert::Infallible,
    sync::{Arc, RwLock},
    time::Duration,
};

use anyhow::{Context, Result};
use hyper::service::{make_service_fn, service_fn};
use hyper::{body, header, Body, Method, Request, Response, Server, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Clone)]
struct Reply {
    status: StatusCode,
    body: Value,
    delay: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

/// Canned LMS routes keyed by method and raw path-and-query.
///
/// Each route holds a queue of replies; the last one repeats once the queue
/// drains, so `fail_times` followed by a success models a flaky endpoint.
#[derive(Clone, Default)]
pub struct MockLms {
    inner: Arc<RwLock<MockLmsInner>>,
}

#[derive(Default)]
struct MockLmsInner {
    routes: HashMap<(Method, String), VecDeque<Reply>>,
    requests: Vec<RecordedRequest>,
}

impl MockLms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: Method, path: impl Into<String>, body: Value) {
        self.set_route(
            method,
            path.into(),
            Reply {
                status: StatusCode::OK,
                body,
                delay: None,
            },
        );
    }

    pub fn respond_slowly(&self, method: Method, path: impl Into<String>, body: Value, delay: Duration) {
        self.set_route(
            method,
            path.into(),
            Reply {
                status: StatusCode::OK,
                body,
                delay: Some(delay),
            },
        );
    }

    pub fn fail(&self, method: Method, path: impl Into<String>, status: StatusCode) {
        self.set_route(method, path.into(), error_reply(status));
    }

    /// Queues `times` failures ahead of whatever the route currently serves.
    pub fn fail_times(&self, method: Method, path: impl Into<String>, status: StatusCode, times: usize) {
        let mut inner = self.inner.write().expect("mock LMS poisoned");
        let queue = inner.routes.entry((method, path.into())).or_default();
        for _ in 0..times {
            queue.push_front(error_reply(status));
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.read().expect("mock LMS poisoned").requests.clone()
    }

    pub fn hits(&self, method: &Method, path: &str) -> usize {
        self.inner
            .read()
            .expect("mock LMS poisoned")
            .requests
            .iter()
            .filter(|request| request.method == *method && request.path == path)
            .count()
    }

    fn set_route(&self, method: Method, path: String, reply: Reply) {
        let mut inner = self.inner.write().expect("mock LMS poisoned");
        inner.routes.insert((method, path), VecDeque::from([reply]));
    }

    fn next_reply(&self, request: RecordedRequest) -> Option<Reply> {
        let mut inner = self.inner.write().expect("mock LMS poisoned");
        let key = (request.method.clone(), request.path.clone());
        inner.requests.push(request);
        let queue = inner.routes.get_mut(&key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

fn error_reply(status: StatusCode) -> Reply {
    Reply {
        status,
        body: json!({ "detail": status.canonical_reason().unwrap_or("error") }),
        delay: None,
    }
}

pub struct MockLmsServer {
    url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MockLmsServer {
    pub async fn start(lms: MockLms) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind mock LMS listener")?;
        let addr = listener
            .local_addr()
            .context("failed to read mock listener address")?;
        let std_listener = listener
            .into_std()
            .context("failed to convert mock listener")?;
        std_listener
            .set_nonblocking(true)
            .context("failed to set mock listener non-blocking")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let make_service = make_service_fn(move |_| {
            let lms = lms.clone();
            async move { Ok::<_, Infallible>(service_fn(move |req| serve_request(lms.clone(), req))) }
        });

        let server = Server::from_tcp(std_listener)
            .context("failed to build mock HTTP server")?
            .serve(make_service);
        let graceful = server.with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });

        let handle = tokio::spawn(async move {
            if let Err(err) = graceful.await {
                eprintln!("mock LMS server stopped: {err}");
            }
        });

        Ok(Self {
            url: format!("http://{}", addr),
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn serve_request(lms: MockLms, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req
        .uri()
        .path_and_query()
        .map(|value| value.as_str().to_owned())
        .unwrap_or_else(|| "/".to_owned());
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let bytes = match body::to_bytes(req.into_body()).await {
        Ok(bytes) => bytes,
        Err(err) => return Ok(json_response(StatusCode::BAD_REQUEST, json!({ "detail": err.to_string() }))),
    };
    let body = if bytes.is_empty() {
        None
    } else {
        serde_json::from_slice(&bytes).ok()
    };

    let recorded = RecordedRequest {
        method,
        path,
        authorization,
        body,
    };
    let Some(reply) = lms.next_reply(recorded) else {
        return Ok(json_response(StatusCode::NOT_FOUND, json!({ "detail": "Not found." })));
    };

    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }
    Ok(json_response(reply.status, reply.body))
}

fn json_response(status: StatusCode, body: Value) -> Response<Body> {
    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}
