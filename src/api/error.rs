use std::fmt;

/// Failures raised by the REST transport. Carried inside `anyhow::Error`
/// and recovered with `downcast_ref` where the kind matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Timeout { path: String },
    CircuitOpen,
    Status { status: u16, path: String },
    MalformedResponse { path: String, reason: String },
}

impl ApiError {
    /// Transient failures that are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Timeout { .. } => true,
            ApiError::Status { status, .. } => *status == 429 || *status >= 500,
            ApiError::CircuitOpen | ApiError::MalformedResponse { .. } => false,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Timeout { path } => write!(f, "request to {path} timed out"),
            ApiError::CircuitOpen => write!(f, "LMS circuit breaker is open"),
            ApiError::Status { status, path } => {
                write!(f, "request to {path} failed with HTTP {status}")
            }
            ApiError::MalformedResponse { path, reason } => {
                write!(f, "malformed response from {path}: {reason}")
            }
        }
    }
}

impl std::error::Error for ApiError {}
