use std::sync::Arc;

use activity_trail::adapters::{BroadcastEventsPort, HttpFeed, PipelineEvent};
use activity_trail::ports::FeedPort;
use activity_trail::{GuidelineCatalog, PipelineService};
use anyhow::{Context, Result};
use compliance_poller::Poller;
use compliance_state_center::{
    FileStore, LocalStore, MemoryStore, RehydrateReport, SessionState,
};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::config::AppConfig;

const EVENT_CAPACITY: usize = 256;

/// Open the session cache without touching the network.
///
/// `ephemeral` keeps everything in memory and leaves the state directory
/// alone.
pub fn open_session(config: &AppConfig, ephemeral: bool) -> (Arc<SessionState>, RehydrateReport) {
    let store: Arc<dyn LocalStore> = if ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FileStore::new(&config.state_dir))
    };
    let state = Arc::new(SessionState::new(store, config.gap_capacity));
    let report = state.rehydrate();
    debug!(
        state_dir = %config.state_dir.display(),
        ephemeral,
        trail = report.trail_entries,
        gaps = report.gaps,
        "session cache opened"
    );
    (state, report)
}

/// One wired dashboard session: cache, pipelines and event fan-out.
pub struct App {
    config: AppConfig,
    state: Arc<SessionState>,
    pipeline: Arc<PipelineService>,
    events: Arc<BroadcastEventsPort>,
    rehydrated: RehydrateReport,
}

impl App {
    /// Wire the session against the configured HTTP backend.
    pub fn build(config: AppConfig, ephemeral: bool) -> Result<Self> {
        config.validate()?;
        let feed = HttpFeed::new(config.feed_config())
            .with_context(|| format!("connecting to {}", config.api_base))?;
        info!(api_base = %feed.base_url(), "dashboard backend configured");
        let (state, rehydrated) = open_session(&config, ephemeral);
        Ok(Self::assemble(config, state, rehydrated, Arc::new(feed)))
    }

    /// Wire the session against an arbitrary feed.
    pub fn with_feed(config: AppConfig, ephemeral: bool, feed: Arc<dyn FeedPort>) -> Self {
        let (state, rehydrated) = open_session(&config, ephemeral);
        Self::assemble(config, state, rehydrated, feed)
    }

    fn assemble(
        config: AppConfig,
        state: Arc<SessionState>,
        rehydrated: RehydrateReport,
        feed: Arc<dyn FeedPort>,
    ) -> Self {
        let events = Arc::new(BroadcastEventsPort::new(EVENT_CAPACITY));
        let pipeline = Arc::new(PipelineService::new(
            feed,
            Arc::clone(&state),
            Arc::new(GuidelineCatalog::standard()),
            events.clone(),
        ));
        Self {
            config,
            state,
            pipeline,
            events,
            rehydrated,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    pub fn pipeline(&self) -> &Arc<PipelineService> {
        &self.pipeline
    }

    pub fn rehydrated(&self) -> &RehydrateReport {
        &self.rehydrated
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// A fresh poller over this session's pipelines.
    pub fn poller(&self) -> Arc<Poller> {
        Poller::new(self.pipeline.clone(), self.config.poller_config())
    }
}
