pub mod adapters;
pub mod api;
pub mod classify;
pub mod errors;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod ports;

pub use api::{ActivityPipeline, MetricsCycle, PipelineService, TrailCycle};
pub use classify::{GapClassifier, GuidelineCatalog};
pub use errors::{TrailError, TrailResult};
pub use merge::TrailOrder;
pub use model::{HealthStatus, RawFeed, RawLogEntry, RawRecord};
