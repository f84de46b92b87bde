use compliance_core_types::{DashboardMetrics, PipelineKind};
use tokio::sync::broadcast;
use tracing::trace;

use crate::errors::TrailError;
use crate::ports::EventsPort;

#[derive(Clone, Debug)]
pub enum PipelineEvent {
    PollStarted {
        pipeline: PipelineKind,
    },
    PollFinished {
        pipeline: PipelineKind,
        ok: bool,
        latency_ms: u128,
        error: Option<String>,
    },
    PollSkipped {
        pipeline: PipelineKind,
    },
    PollDiscarded {
        pipeline: PipelineKind,
    },
    TrailUpdated {
        entries: usize,
        gaps_added: usize,
    },
    MetricsUpdated {
        metrics: DashboardMetrics,
    },
}

#[derive(Default)]
pub struct NoopEventsPort;

impl EventsPort for NoopEventsPort {
    fn poll_started(&self, _pipeline: PipelineKind) {}

    fn poll_finished(
        &self,
        _pipeline: PipelineKind,
        _ok: bool,
        _latency_ms: u128,
        _err: Option<&TrailError>,
    ) {
    }

    fn poll_skipped(&self, _pipeline: PipelineKind) {}

    fn poll_discarded(&self, _pipeline: PipelineKind) {}

    fn trail_updated(&self, _entries: usize, _gaps_added: usize) {}

    fn metrics_updated(&self, _metrics: &DashboardMetrics) {}
}

/// Fans pipeline events out to any number of render-side subscribers.
pub struct BroadcastEventsPort {
    sender: broadcast::Sender<PipelineEvent>,
}

impl BroadcastEventsPort {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }

    fn publish(&self, event: PipelineEvent) {
        // No subscribers is not an error for a notification channel.
        if self.sender.send(event).is_err() {
            trace!("pipeline event dropped; no subscribers");
        }
    }
}

impl EventsPort for BroadcastEventsPort {
    fn poll_started(&self, pipeline: PipelineKind) {
        self.publish(PipelineEvent::PollStarted { pipeline });
    }

    fn poll_finished(
        &self,
        pipeline: PipelineKind,
        ok: bool,
        latency_ms: u128,
        err: Option<&TrailError>,
    ) {
        self.publish(PipelineEvent::PollFinished {
            pipeline,
            ok,
            latency_ms,
            error: err.map(|e| e.to_string()),
        });
    }

    fn poll_skipped(&self, pipeline: PipelineKind) {
        self.publish(PipelineEvent::PollSkipped { pipeline });
    }

    fn poll_discarded(&self, pipeline: PipelineKind) {
        self.publish(PipelineEvent::PollDiscarded { pipeline });
    }

    fn trail_updated(&self, entries: usize, gaps_added: usize) {
        self.publish(PipelineEvent::TrailUpdated {
            entries,
            gaps_added,
        });
    }

    fn metrics_updated(&self, metrics: &DashboardMetrics) {
        self.publish(PipelineEvent::MetricsUpdated {
            metrics: metrics.clone(),
        });
    }
}
