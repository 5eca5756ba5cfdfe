//! `reqwest`-backed transport with per-request timeout, exponential backoff
//! and a shared circuit breaker.

use crate::api::auth::build_default_headers;
use crate::api::circuit_breaker::{CircuitBreaker, CircuitBreakerError};
use crate::api::error::ApiError;
use crate::api::metrics::{ApiMetrics, ApiMetricsSnapshot};
use crate::api::options::ClientOptions;
use crate::api::retry::{RetryContext, RetryMessages, READ_RETRY, WRITE_RETRY};
use crate::api::transport::HttpTransport;
use crate::runtime::config::CoursewareConfig;
use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use reqwest::{Client, Method};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

#[derive(Debug, Clone)]
pub struct RestTransport {
    base_url: Arc<String>,
    client: Client,
    options: ClientOptions,
    metrics: Arc<ApiMetrics>,
    breaker: Arc<CircuitBreaker>,
}

impl RestTransport {
    pub fn new(base_url: impl Into<String>, options: ClientOptions) -> Result<Self> {
        Self::with_breaker(base_url, options, Arc::new(CircuitBreaker::default()))
    }

    pub fn with_breaker(
        base_url: impl Into<String>,
        options: ClientOptions,
        breaker: Arc<CircuitBreaker>,
    ) -> Result<Self> {
        options.validate()?;

        let base_url = base_url.into().trim_end_matches('/').to_owned();
        let headers = build_default_headers(options.access_token.as_deref())?;
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| anyhow!("failed to build HTTP client: {err}"))?;

        Ok(Self {
            base_url: Arc::new(base_url),
            client,
            options,
            metrics: Arc::new(ApiMetrics::default()),
            breaker,
        })
    }

    pub fn from_config(config: &CoursewareConfig) -> Result<Self> {
        config.validate()?;
        let breaker = Arc::new(CircuitBreaker::new(
            config.breaker_failure_threshold(),
            config.breaker_cooldown(),
        ));
        Self::with_breaker(config.lms_base_url(), config.client_options(), breaker)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn metrics(&self) -> ApiMetricsSnapshot {
        self.metrics.snapshot(self.breaker.snapshot().state)
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        messages: &RetryMessages,
    ) -> Result<Value> {
        let context = RetryContext::new(messages, method_label(&method), path);
        self.retry_with_breaker(context, || self.send_once(method.clone(), path, body))
            .await
    }

    /// Retry loop shared by every endpoint: breaker gating, metrics,
    /// exponential backoff and consistent logging.
    async fn retry_with_breaker<F, Fut>(
        &self,
        context: RetryContext<'_>,
        mut operation: F,
    ) -> Result<Value>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        let mut attempt = 0;

        loop {
            match self.breaker.before_request() {
                Ok(state) => context.log_permit(state),
                Err(CircuitBreakerError::CircuitOpen) => {
                    context.log_circuit_open();
                    return Err(ApiError::CircuitOpen.into());
                }
            }

            attempt += 1;
            let start = Instant::now();

            let err = match operation().await {
                Ok(value) => {
                    self.metrics.record_success(start.elapsed());
                    self.breaker.record_success();
                    return Ok(value);
                }
                Err(err) => err,
            };

            let elapsed = start.elapsed();
            let will_retry = attempt < self.options.max_attempts;
            let backoff = self.backoff_delay(attempt);

            match err.downcast_ref::<ApiError>() {
                Some(ApiError::Timeout { .. }) => {
                    self.metrics.record_timeout(elapsed);
                    self.breaker.record_failure();
                    if !context.retry_timeouts() {
                        context.log_timeout(attempt, None);
                        return Err(err);
                    }
                    if !will_retry {
                        context.log_exhausted(attempt, &err);
                        return Err(err);
                    }
                    context.log_timeout(attempt, Some(backoff));
                }
                Some(api_error) if !api_error.is_retryable() => {
                    // The LMS answered, so its health is not in question.
                    self.metrics.record_failure(elapsed);
                    self.breaker.record_success();
                    context.log_rejected(attempt, &err);
                    return Err(err);
                }
                _ => {
                    self.metrics.record_failure(elapsed);
                    self.breaker.record_failure();
                    if !will_retry {
                        context.log_exhausted(attempt, &err);
                        return Err(err);
                    }
                    context.log_retry(attempt, backoff, &err);
                }
            }

            self.metrics.record_retry();
            sleep(backoff).await;
        }
    }

    async fn send_once(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        timeout(self.options.request_timeout, self.exchange(method, path, body))
            .await
            .map_err(|_| ApiError::Timeout {
                path: path.to_owned(),
            })?
    }

    async fn exchange(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|err| map_transport_error(path, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                path: path.to_owned(),
            }
            .into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| map_transport_error(path, err))?;
        decode_body(path, &bytes)
    }

    fn backoff_delay(&self, attempt: usize) -> Duration {
        if attempt <= 1 {
            return self.options.initial_backoff;
        }

        let exponent = attempt.saturating_sub(1) as u32;
        let multiplier = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.options
            .initial_backoff
            .saturating_mul(multiplier)
            .min(self.options.max_backoff)
    }
}

impl HttpTransport for RestTransport {
    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Value>> {
        Box::pin(self.request(Method::GET, path, None, &READ_RETRY))
    }

    fn post_json<'a>(&'a self, path: &'a str, body: &'a Value) -> BoxFuture<'a, Result<Value>> {
        Box::pin(self.request(Method::POST, path, Some(body), &WRITE_RETRY))
    }

    fn delete<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Value>> {
        Box::pin(self.request(Method::DELETE, path, None, &WRITE_RETRY))
    }
}

fn method_label(method: &Method) -> &'static str {
    if *method == Method::GET {
        "GET"
    } else if *method == Method::POST {
        "POST"
    } else if *method == Method::DELETE {
        "DELETE"
    } else {
        "OTHER"
    }
}

fn map_transport_error(path: &str, err: reqwest::Error) -> anyhow::Error {
    if err.is_timeout() {
        return ApiError::Timeout {
            path: path.to_owned(),
        }
        .into();
    }
    anyhow::Error::new(err).context(format!("request to {path} failed"))
}

fn decode_body(path: &str, bytes: &[u8]) -> Result<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|err| {
        ApiError::MalformedResponse {
            path: path.to_owned(),
            reason: err.to_string(),
        }
        .into()
    })
}
