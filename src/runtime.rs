//! Runtime glue: validated configuration, tracing and telemetry, and the
//! session facade that composes the client, store, orchestrator and mutation
//! tracker.

pub mod config;
pub mod session;
pub mod telemetry;

pub use config::{CoursewareConfig, CoursewareConfigBuilder, CoursewareConfigParams};
pub use session::{CourseLoad, CoursewareSession, SequenceLoad};
pub use telemetry::{init_tracing, spawn_metrics_reporter, Telemetry, TelemetrySnapshot};
