//! Retry context and canned log messages shared by the REST transport so
//! every endpoint reports breaker state, retries and exhaustion the same way.

use crate::api::circuit_breaker::CircuitState;
use anyhow::Error;
use std::time::Duration;

macro_rules! log_with_retry_ctx {
    ($level:ident, $ctx:expr, $($rest:tt)*) => {{
        if let Some(resource) = $ctx.resource {
            tracing::$level!(
                method = $ctx.method,
                path = $ctx.path,
                resource = resource,
                $($rest)*
            );
        } else {
            tracing::$level!(method = $ctx.method, path = $ctx.path, $($rest)*);
        }
    }};
}

pub(crate) use log_with_retry_ctx;

#[derive(Clone, Copy)]
pub(crate) struct RetryMessages {
    pub(crate) permit: &'static str,
    pub(crate) circuit_open: &'static str,
    pub(crate) timeout: &'static str,
    pub(crate) retry: &'static str,
    pub(crate) rejected: &'static str,
    pub(crate) exhausted: &'static str,
    /// Whether a timed-out attempt may be sent again. Writes that time out may
    /// already have been applied server side.
    pub(crate) retry_timeouts: bool,
}

#[derive(Clone, Copy)]
pub(crate) struct RetryContext<'a> {
    method: &'static str,
    path: &'a str,
    resource: Option<&'a str>,
    messages: &'a RetryMessages,
}

impl<'a> RetryContext<'a> {
    pub(crate) fn new(messages: &'a RetryMessages, method: &'static str, path: &'a str) -> Self {
        Self {
            method,
            path,
            resource: None,
            messages,
        }
    }

    pub(crate) fn with_resource(mut self, resource: &'a str) -> Self {
        self.resource = Some(resource);
        self
    }

    pub(crate) fn retry_timeouts(&self) -> bool {
        self.messages.retry_timeouts
    }

    pub(crate) fn log_permit(&self, state: CircuitState) {
        log_with_retry_ctx!(trace, self, breaker_state = ?state, "{}", self.messages.permit);
    }

    pub(crate) fn log_circuit_open(&self) {
        log_with_retry_ctx!(warn, self, "{}", self.messages.circuit_open);
    }

    pub(crate) fn log_timeout(&self, attempt: usize, backoff: Option<Duration>) {
        match backoff {
            Some(backoff) => log_with_retry_ctx!(
                warn,
                self,
                attempt,
                backoff_ms = duration_to_millis(backoff),
                "{}",
                self.messages.timeout
            ),
            None => log_with_retry_ctx!(warn, self, attempt, "{}", self.messages.timeout),
        }
    }

    pub(crate) fn log_retry(&self, attempt: usize, backoff: Duration, err: &Error) {
        log_with_retry_ctx!(
            warn,
            self,
            attempt,
            backoff_ms = duration_to_millis(backoff),
            error = %err,
            "{}",
            self.messages.retry
        );
    }

    pub(crate) fn log_rejected(&self, attempt: usize, err: &Error) {
        log_with_retry_ctx!(debug, self, attempt, error = %err, "{}", self.messages.rejected);
    }

    pub(crate) fn log_exhausted(&self, attempt: usize, err: &Error) {
        log_with_retry_ctx!(error, self, attempt, error = %err, "{}", self.messages.exhausted);
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    duration.as_millis().min(u128::from(u64::MAX)) as u64
}

pub(crate) const READ_RETRY: RetryMessages = RetryMessages {
    permit: "circuit breaker permit acquired",
    circuit_open: "LMS circuit breaker open; rejecting read",
    timeout: "LMS read timed out",
    retry: "LMS read failed; retrying",
    rejected: "LMS rejected read",
    exhausted: "LMS read exhausted retries",
    retry_timeouts: true,
};

pub(crate) const WRITE_RETRY: RetryMessages = RetryMessages {
    permit: "circuit breaker permit acquired for write",
    circuit_open: "LMS circuit breaker open; rejecting write",
    timeout: "LMS write timed out; not retrying",
    retry: "LMS write failed; retrying",
    rejected: "LMS rejected write",
    exhausted: "LMS write exhausted retries",
    retry_timeouts: false,
};
