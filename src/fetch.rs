//! Composite fetch orchestration: several independent sources per logical
//! request, all awaited, each committed on its own merit.

pub mod orchestrator;
pub mod source;
pub mod state;
pub mod tabs;

pub use orchestrator::{CompositeOutcome, CompositeStatus, FetchOrchestrator};
pub use source::{SourceFetch, SourceFuture, SourceOutcome, SourcePayload, SourceStatus};
pub use state::{request_key, FetchState, RequestGenerations, RequestKey};
pub use tabs::CourseTab;
