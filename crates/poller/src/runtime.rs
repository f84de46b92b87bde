use std::sync::Arc;
use std::time::{Duration, Instant};

use activity_trail::ActivityPipeline;
use compliance_core_types::PipelineKind;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::PollError;
use crate::model::{PollOutcome, PollerConfig, ScanReport};

struct Lane {
    kind: PipelineKind,
    period: Duration,
    // Held for the whole fetch/apply of one poll.
    in_flight: Mutex<()>,
    refresh: Notify,
}

impl Lane {
    fn new(kind: PipelineKind, period: Duration) -> Self {
        Self {
            kind,
            period,
            in_flight: Mutex::new(()),
            refresh: Notify::new(),
        }
    }
}

/// Drives the trail and metrics pipelines.
///
/// Each pipeline polls at most once at a time: a trigger that arrives while
/// a poll of the same pipeline is outstanding is skipped. The two pipelines
/// are independent of each other.
pub struct Poller {
    pipeline: Arc<dyn ActivityPipeline>,
    trail: Lane,
    metrics: Lane,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(pipeline: Arc<dyn ActivityPipeline>, config: PollerConfig) -> Arc<Self> {
        Arc::new(Self {
            pipeline,
            trail: Lane::new(PipelineKind::Trail, config.trail_interval),
            metrics: Lane::new(PipelineKind::Metrics, config.metrics_interval),
            cancel: CancellationToken::new(),
        })
    }

    fn lane(&self, kind: PipelineKind) -> &Lane {
        match kind {
            PipelineKind::Trail => &self.trail,
            PipelineKind::Metrics => &self.metrics,
        }
    }

    pub fn pipeline(&self) -> &Arc<dyn ActivityPipeline> {
        &self.pipeline
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run one poll of `kind` right now, honouring single-flight.
    pub async fn poll_now(&self, kind: PipelineKind) -> PollOutcome {
        let outcome = match self.lane(kind).in_flight.try_lock() {
            Ok(_guard) => self.run_poll(kind).await,
            Err(_) => {
                debug!(pipeline = %kind, "poll already in flight; skipping trigger");
                self.pipeline.events().poll_skipped(kind);
                PollOutcome::Skipped
            }
        };
        self.pipeline.state().record_poll(kind, outcome.status());
        outcome
    }

    async fn run_poll(&self, kind: PipelineKind) -> PollOutcome {
        if self.cancel.is_cancelled() {
            return self.discard(kind);
        }
        let events = self.pipeline.events();
        events.poll_started(kind);
        let started_at = Instant::now();

        let outcome = match kind {
            PipelineKind::Trail => {
                let fetched = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => None,
                    res = self.pipeline.fetch_trail() => Some(res),
                };
                match fetched {
                    None => return self.discard(kind),
                    Some(Ok(_)) if self.cancel.is_cancelled() => return self.discard(kind),
                    Some(Ok(feed)) => Ok(PollOutcome::Trail(self.pipeline.apply_trail(feed))),
                    Some(Err(err)) => Err(err),
                }
            }
            PipelineKind::Metrics => {
                let fetched = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => None,
                    res = self.pipeline.fetch_metrics() => Some(res),
                };
                match fetched {
                    None => return self.discard(kind),
                    Some(Ok(_)) if self.cancel.is_cancelled() => return self.discard(kind),
                    Some(Ok(snapshot)) => {
                        Ok(PollOutcome::Metrics(self.pipeline.apply_metrics(snapshot)))
                    }
                    Some(Err(err)) => Err(err),
                }
            }
        };

        let latency_ms = started_at.elapsed().as_millis();
        match outcome {
            Ok(applied) => {
                events.poll_finished(kind, true, latency_ms, None);
                applied
            }
            Err(err) => {
                warn!(pipeline = %kind, %err, "poll failed; keeping cached state");
                events.poll_finished(kind, false, latency_ms, Some(&err));
                PollOutcome::Failed(err)
            }
        }
    }

    fn discard(&self, kind: PipelineKind) -> PollOutcome {
        debug!(pipeline = %kind, "poller torn down; discarding poll result");
        self.pipeline.events().poll_discarded(kind);
        PollOutcome::Discarded
    }

    /// Ask the backend for a regulatory scan, give it `settle` to produce
    /// output, then refresh both pipelines.
    pub async fn scan_and_refresh(&self, settle: Duration) -> Result<ScanReport, PollError> {
        if self.cancel.is_cancelled() {
            return Err(PollError::Shutdown);
        }
        let reply = match self.pipeline.trigger_scan().await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(%err, "scan trigger failed");
                return Err(PollError::Scan(err));
            }
        };
        tokio::select! {
            _ = self.cancel.cancelled() => return Err(PollError::Shutdown),
            _ = sleep(settle) => {}
        }
        let trail = self.poll_now(PipelineKind::Trail).await;
        let metrics = self.poll_now(PipelineKind::Metrics).await;
        Ok(ScanReport {
            reply,
            trail,
            metrics,
        })
    }

    /// Start both recurring timers. The first tick of each fires at once.
    pub fn spawn(self: &Arc<Self>) -> PollerHandle {
        let tasks = [PipelineKind::Trail, PipelineKind::Metrics]
            .into_iter()
            .map(|kind| {
                let poller = Arc::clone(self);
                tokio::spawn(async move { poller.run_lane(kind).await })
            })
            .collect();
        info!(
            trail_ms = self.trail.period.as_millis() as u64,
            metrics_ms = self.metrics.period.as_millis() as u64,
            "poller started"
        );
        PollerHandle {
            poller: Arc::clone(self),
            tasks,
        }
    }

    async fn run_lane(&self, kind: PipelineKind) {
        let lane = self.lane(kind);
        let mut ticker = interval(lane.period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
                _ = lane.refresh.notified() => {}
            }
            let outcome = self.poll_now(kind).await;
            debug!(pipeline = %kind, status = ?outcome.status(), "poll cycle finished");
        }
        debug!(pipeline = %kind, "poll loop stopped");
    }
}

/// Lifecycle handle for a spawned [`Poller`]; dropping it tears the
/// poller down.
pub struct PollerHandle {
    poller: Arc<Poller>,
    tasks: Vec<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn poller(&self) -> &Arc<Poller> {
        &self.poller
    }

    /// Queue a manual refresh of both pipelines.
    pub fn refresh(&self) {
        self.poller.trail.refresh.notify_one();
        self.poller.metrics.refresh.notify_one();
    }

    pub async fn poll_now(&self, kind: PipelineKind) -> PollOutcome {
        self.poller.poll_now(kind).await
    }

    /// Stop the timers; results of polls still in flight are discarded.
    pub async fn shutdown(mut self) -> Result<(), PollError> {
        self.poller.cancel.cancel();
        for task in self.tasks.drain(..) {
            match task.await {
                Ok(()) => {}
                Err(err) if err.is_cancelled() => {}
                Err(err) => return Err(PollError::Join(err.to_string())),
            }
        }
        info!("poller stopped");
        Ok(())
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.poller.cancel.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}
