use std::sync::Arc;

use async_trait::async_trait;
use compliance_core_types::DashboardMetrics;
use compliance_state_center::SessionState;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::adapters::NoopEventsPort;
use crate::classify::{GapClassifier, GuidelineCatalog};
use crate::errors::TrailResult;
use crate::merge::{derive_trail, TrailOrder};
use crate::model::{HealthStatus, RawFeed};
use crate::normalize::normalize_feed;
use crate::ports::{EventsPort, FeedPort};

/// Outcome of applying one activity snapshot to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrailCycle {
    pub normalized: usize,
    pub order: TrailOrder,
    pub gaps_added: usize,
    pub gaps_evicted: usize,
    pub persisted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsCycle {
    pub metrics: DashboardMetrics,
    pub persisted: bool,
}

/// The trail and metrics pipelines, split into a fallible network half and
/// an infallible apply half so a caller can drop a fetched result.
#[async_trait]
pub trait ActivityPipeline: Send + Sync {
    async fn fetch_trail(&self) -> TrailResult<RawFeed>;
    fn apply_trail(&self, feed: RawFeed) -> TrailCycle;
    async fn fetch_metrics(&self) -> TrailResult<DashboardMetrics>;
    fn apply_metrics(&self, metrics: DashboardMetrics) -> MetricsCycle;
    async fn trigger_scan(&self) -> TrailResult<JsonValue>;
    async fn health(&self) -> TrailResult<HealthStatus>;
    fn events(&self) -> Arc<dyn EventsPort>;
    fn state(&self) -> Arc<SessionState>;
}

pub struct PipelineService {
    feed: Arc<dyn FeedPort>,
    state: Arc<SessionState>,
    classifier: GapClassifier,
    events: Arc<dyn EventsPort>,
}

impl PipelineService {
    pub fn new(
        feed: Arc<dyn FeedPort>,
        state: Arc<SessionState>,
        catalog: Arc<GuidelineCatalog>,
        events: Arc<dyn EventsPort>,
    ) -> Self {
        Self {
            feed,
            state,
            classifier: GapClassifier::new(catalog),
            events,
        }
    }

    /// Standard catalog, no event subscribers.
    pub fn with_defaults(feed: Arc<dyn FeedPort>, state: Arc<SessionState>) -> Self {
        Self::new(
            feed,
            state,
            Arc::new(GuidelineCatalog::standard()),
            Arc::new(NoopEventsPort),
        )
    }
}

#[async_trait]
impl ActivityPipeline for PipelineService {
    async fn fetch_trail(&self) -> TrailResult<RawFeed> {
        let feed = self.feed.fetch_activity().await?;
        debug!(
            agents = feed.agents.len(),
            entries = feed.entry_count(),
            "activity feed fetched"
        );
        Ok(feed)
    }

    fn apply_trail(&self, feed: RawFeed) -> TrailCycle {
        let normalized = normalize_feed(&feed);
        let gaps = self.classifier.classify(&normalized);
        let count = normalized.len();
        let (trail, order) = derive_trail(normalized);
        let commit = self.state.commit_trail(trail, gaps);

        if commit.gaps_added > 0 {
            info!(
                added = commit.gaps_added,
                evicted = commit.gaps_evicted,
                "compliance gaps detected"
            );
        }
        self.events
            .trail_updated(commit.trail_entries, commit.gaps_added);

        TrailCycle {
            normalized: count,
            order,
            gaps_added: commit.gaps_added,
            gaps_evicted: commit.gaps_evicted,
            persisted: commit.persisted,
        }
    }

    async fn fetch_metrics(&self) -> TrailResult<DashboardMetrics> {
        self.feed.fetch_metrics().await
    }

    fn apply_metrics(&self, metrics: DashboardMetrics) -> MetricsCycle {
        let persisted = self.state.commit_metrics(metrics.clone());
        self.events.metrics_updated(&metrics);
        MetricsCycle { metrics, persisted }
    }

    async fn trigger_scan(&self) -> TrailResult<JsonValue> {
        let reply = self.feed.trigger_scan().await?;
        info!("regulatory scan triggered");
        Ok(reply)
    }

    async fn health(&self) -> TrailResult<HealthStatus> {
        self.feed.health().await
    }

    fn events(&self) -> Arc<dyn EventsPort> {
        Arc::clone(&self.events)
    }

    fn state(&self) -> Arc<SessionState> {
        Arc::clone(&self.state)
    }
}
