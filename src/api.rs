//! HTTP plumbing for the LMS courseware endpoints: transport capability,
//! retrying REST transport with circuit breaker and metrics, and the typed
//! endpoint client.

pub mod auth;
pub mod circuit_breaker;
pub mod client;
pub mod course;
pub mod error;
pub mod keys;
pub mod metrics;
pub mod options;
pub mod rest;
pub mod retry;
pub mod transport;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerError, CircuitBreakerSnapshot, CircuitState,
};
pub use client::CoursewareClient;
pub use course::{is_paywalled, CourseMetadata, RawCourseMetadata};
pub use error::ApiError;
pub use keys::camel_case_keys;
pub use metrics::ApiMetricsSnapshot;
pub use options::ClientOptions;
pub use rest::RestTransport;
pub use transport::HttpTransport;
