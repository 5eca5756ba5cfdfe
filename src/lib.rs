pub mod api;
pub mod blocks;
pub mod fetch;
pub mod messaging;
pub mod mutation;
pub mod runtime;
pub mod sequence;
pub mod store;

pub use api::{ApiError, CoursewareClient, HttpTransport, RestTransport};
pub use blocks::{normalize, normalize_course, BlockAnomaly, CourseTree, NormalizedBlocks, RawBlock};
pub use fetch::{
    CompositeOutcome, CompositeStatus, CourseTab, FetchOrchestrator, FetchState, SourceFetch,
};
pub use messaging::{HostMessage, MessageBus, Subscription, UnitFrame};
pub use mutation::{FieldKey, FieldPhase, MutationOutcome, MutationTracker, UnitField};
pub use runtime::config::{CoursewareConfig, CoursewareConfigBuilder, CoursewareConfigParams};
pub use runtime::session::{CourseLoad, CoursewareSession, SequenceLoad};
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
pub use sequence::{AdjacentSequence, Direction, Navigation, NavigationError, SequencePosition};
pub use store::{InMemoryModelStore, ModelStore, ModelType, StoreError};
