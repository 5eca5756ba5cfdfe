use crate::api::options::{
    ClientOptions, DEFAULT_BREAKER_COOLDOWN_SECS, DEFAULT_BREAKER_FAILURE_THRESHOLD,
    DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF_MS,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::runtime::telemetry;
use anyhow::{bail, Context, Result};
use std::time::Duration;

/// Session configuration for talking to an LMS courseware backend.
///
/// All instances must be constructed via [`CoursewareConfig::builder`] or
/// [`CoursewareConfig::new`] so invariants are validated before any consumer
/// observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoursewareConfig {
    lms_base_url: String,
    username: String,
    access_token: Option<String>,
    request_timeout: Duration,
    max_attempts: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
    breaker_failure_threshold: usize,
    breaker_cooldown: Duration,
    metrics_interval: Duration,
}

pub struct CoursewareConfigParams {
    pub lms_base_url: String,
    pub username: String,
    pub access_token: Option<String>,
    pub request_timeout: Duration,
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub breaker_failure_threshold: usize,
    pub breaker_cooldown: Duration,
    pub metrics_interval: Duration,
}

impl CoursewareConfig {
    pub fn builder() -> CoursewareConfigBuilder {
        CoursewareConfigBuilder::default()
    }

    /// Constructs a configuration directly from the provided values.
    ///
    /// Prefer [`CoursewareConfig::builder`] when most values use defaults.
    pub fn new(params: CoursewareConfigParams) -> Result<Self> {
        let CoursewareConfigParams {
            lms_base_url,
            username,
            access_token,
            request_timeout,
            max_attempts,
            initial_backoff,
            max_backoff,
            breaker_failure_threshold,
            breaker_cooldown,
            metrics_interval,
        } = params;

        let config = Self {
            lms_base_url: trimmed_url(lms_base_url),
            username: username.trim().to_owned(),
            access_token: access_token
                .map(|token| token.trim().to_owned())
                .filter(|token| !token.is_empty()),
            request_timeout,
            max_attempts,
            initial_backoff,
            max_backoff,
            breaker_failure_threshold,
            breaker_cooldown,
            metrics_interval,
        };

        config.validate()?;
        Ok(config)
    }

    /// LMS root URL without a trailing slash.
    pub fn lms_base_url(&self) -> &str {
        &self.lms_base_url
    }

    /// Learner the course blocks are requested for.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Bearer token sent with every request, when configured.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    pub fn breaker_failure_threshold(&self) -> usize {
        self.breaker_failure_threshold
    }

    pub fn breaker_cooldown(&self) -> Duration {
        self.breaker_cooldown
    }

    /// Interval used by the telemetry reporter.
    pub fn metrics_interval(&self) -> Duration {
        self.metrics_interval
    }

    /// Transport knobs derived from this configuration.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            request_timeout: self.request_timeout,
            max_attempts: self.max_attempts,
            initial_backoff: self.initial_backoff,
            max_backoff: self.max_backoff,
            access_token: self.access_token.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_url(&self.lms_base_url)?;
        if self.username.is_empty() {
            bail!("username cannot be empty");
        }

        if self.request_timeout.is_zero() {
            bail!("request_timeout must be greater than 0");
        }

        if self.max_attempts == 0 {
            bail!("max_attempts must be greater than 0");
        }

        if self.initial_backoff.is_zero() {
            bail!("initial_backoff must be greater than 0");
        }

        if self.max_backoff < self.initial_backoff {
            bail!("max_backoff must be at least initial_backoff");
        }

        if self.breaker_failure_threshold == 0 {
            bail!("breaker_failure_threshold must be greater than 0");
        }

        if self.breaker_cooldown.is_zero() {
            bail!("breaker_cooldown must be greater than 0");
        }

        if self.metrics_interval.is_zero() {
            bail!("metrics_interval must be greater than 0");
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct CoursewareConfigBuilder {
    lms_base_url: Option<String>,
    username: Option<String>,
    access_token: Option<String>,
    request_timeout: Option<Duration>,
    max_attempts: Option<usize>,
    initial_backoff: Option<Duration>,
    max_backoff: Option<Duration>,
    breaker_failure_threshold: Option<usize>,
    breaker_cooldown: Option<Duration>,
    metrics_interval: Option<Duration>,
}

impl CoursewareConfigBuilder {
    pub fn lms_base_url(mut self, url: impl Into<String>) -> Self {
        self.lms_base_url = Some(url.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = Some(backoff);
        self
    }

    pub fn max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = Some(backoff);
        self
    }

    pub fn breaker_failure_threshold(mut self, threshold: usize) -> Self {
        self.breaker_failure_threshold = Some(threshold);
        self
    }

    pub fn breaker_cooldown(mut self, cooldown: Duration) -> Self {
        self.breaker_cooldown = Some(cooldown);
        self
    }

    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = Some(interval);
        self
    }

    pub fn build(self) -> Result<CoursewareConfig> {
        let params = CoursewareConfigParams {
            lms_base_url: self.lms_base_url.context("lms_base_url is required")?,
            username: self.username.context("username is required")?,
            access_token: self.access_token,
            request_timeout: self
                .request_timeout
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            max_attempts: self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            initial_backoff: self
                .initial_backoff
                .unwrap_or_else(|| Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS)),
            max_backoff: self
                .max_backoff
                .unwrap_or_else(|| Duration::from_millis(DEFAULT_MAX_BACKOFF_MS)),
            breaker_failure_threshold: self
                .breaker_failure_threshold
                .unwrap_or(DEFAULT_BREAKER_FAILURE_THRESHOLD),
            breaker_cooldown: self
                .breaker_cooldown
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_BREAKER_COOLDOWN_SECS)),
            metrics_interval: self
                .metrics_interval
                .unwrap_or(telemetry::DEFAULT_METRICS_INTERVAL),
        };

        CoursewareConfig::new(params)
    }
}

fn trimmed_url(value: String) -> String {
    value.trim().trim_end_matches('/').to_owned()
}

fn validate_url(url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("lms_base_url must start with http:// or https://");
    }
    Ok(())
}
