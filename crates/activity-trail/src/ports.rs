use async_trait::async_trait;
use compliance_core_types::{DashboardMetrics, PipelineKind};
use serde_json::Value as JsonValue;

use crate::errors::TrailError;
use crate::model::{HealthStatus, RawFeed};

/// Network collaborator serving the agent activity feed and metrics.
#[async_trait]
pub trait FeedPort: Send + Sync {
    async fn fetch_activity(&self) -> Result<RawFeed, TrailError>;
    async fn fetch_metrics(&self) -> Result<DashboardMetrics, TrailError>;
    /// Ask the backend to run a regulatory scan; returns its raw reply.
    async fn trigger_scan(&self) -> Result<JsonValue, TrailError>;
    async fn health(&self) -> Result<HealthStatus, TrailError>;
}

pub trait EventsPort: Send + Sync {
    fn poll_started(&self, pipeline: PipelineKind);
    fn poll_finished(
        &self,
        pipeline: PipelineKind,
        ok: bool,
        latency_ms: u128,
        err: Option<&TrailError>,
    );
    fn poll_skipped(&self, pipeline: PipelineKind);
    fn poll_discarded(&self, pipeline: PipelineKind);
    fn trail_updated(&self, entries: usize, gaps_added: usize);
    fn metrics_updated(&self, metrics: &DashboardMetrics);
}
