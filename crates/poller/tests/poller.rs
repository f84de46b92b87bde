use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use activity_trail::ports::FeedPort;
use activity_trail::{HealthStatus, PipelineService, RawFeed, TrailError};
use async_trait::async_trait;
use compliance_core_types::{DashboardMetrics, PipelineKind};
use compliance_poller::{PollError, PollOutcome, Poller, PollerConfig};
use compliance_state_center::{
    MemoryStore, SessionState, GAPS_KEY, METRICS_KEY, TRAIL_KEY,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::{Notify, Semaphore};
use tokio::time::{sleep, timeout};

struct FakeFeed {
    activity: Mutex<Value>,
    fail_activity: AtomicBool,
    fail_metrics: AtomicBool,
    fail_scan: AtomicBool,
    gate: Option<Arc<Semaphore>>,
    fetch_started: Notify,
    activity_calls: AtomicUsize,
    scans: AtomicUsize,
}

impl FakeFeed {
    fn new(activity: Value) -> Self {
        Self {
            activity: Mutex::new(activity),
            fail_activity: AtomicBool::new(false),
            fail_metrics: AtomicBool::new(false),
            fail_scan: AtomicBool::new(false),
            gate: None,
            fetch_started: Notify::new(),
            activity_calls: AtomicUsize::new(0),
            scans: AtomicUsize::new(0),
        }
    }

    /// Activity fetches block until a permit is added to the returned gate.
    fn gated(activity: Value) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let mut feed = Self::new(activity);
        feed.gate = Some(Arc::clone(&gate));
        (feed, gate)
    }
}

#[async_trait]
impl FeedPort for FakeFeed {
    async fn fetch_activity(&self) -> Result<RawFeed, TrailError> {
        self.activity_calls.fetch_add(1, Ordering::SeqCst);
        self.fetch_started.notify_one();
        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|err| TrailError::Internal(err.to_string()))?;
            permit.forget();
        }
        if self.fail_activity.load(Ordering::SeqCst) {
            return Err(TrailError::Transport("connection refused".into()));
        }
        RawFeed::from_value(self.activity.lock().clone())
    }

    async fn fetch_metrics(&self) -> Result<DashboardMetrics, TrailError> {
        if self.fail_metrics.load(Ordering::SeqCst) {
            return Err(TrailError::Status {
                status: 500,
                url: "http://backend/api/dashboard".into(),
            });
        }
        Ok(DashboardMetrics {
            score: 78.0,
            risks: 12,
            policies_mapped: 142,
            pending_reviews: 5,
        })
    }

    async fn trigger_scan(&self) -> Result<Value, TrailError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        if self.fail_scan.load(Ordering::SeqCst) {
            return Err(TrailError::Transport("scan endpoint down".into()));
        }
        *self.activity.lock() = json!({
            "Regulatory Scout": ["Using Tool: WebSearch"],
            "Gap Analyst": [{"action": "Gap: data retained for 5 years", "client": "Acme"}]
        });
        Ok(json!({"status": "scan complete"}))
    }

    async fn health(&self) -> Result<HealthStatus, TrailError> {
        Ok(HealthStatus {
            status: "healthy".into(),
        })
    }
}

fn build(feed: Arc<FakeFeed>, config: PollerConfig) -> (Arc<Poller>, Arc<SessionState>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(SessionState::new(store.clone(), 3));
    let service = Arc::new(PipelineService::with_defaults(feed, Arc::clone(&state)));
    (Poller::new(service, config), state, store)
}

fn slow_config() -> PollerConfig {
    PollerConfig {
        trail_interval: Duration::from_secs(3600),
        metrics_interval: Duration::from_secs(3600),
    }
}

fn persisted(store: &MemoryStore) -> Vec<Option<String>> {
    [TRAIL_KEY, GAPS_KEY, METRICS_KEY]
        .iter()
        .map(|key| store.raw(key))
        .collect()
}

#[tokio::test]
async fn failed_poll_leaves_everything_untouched() {
    let feed = Arc::new(FakeFeed::new(json!({
        "Risk Sentinel": ["Risk: transaction 2 exceeds threshold", "Using Tool: LogMonitor"]
    })));
    let (poller, state, store) = build(Arc::clone(&feed), slow_config());

    assert!(poller.poll_now(PipelineKind::Trail).await.is_applied());
    assert!(poller.poll_now(PipelineKind::Metrics).await.is_applied());

    let memory_before = serde_json::to_string(&(
        state.trail().as_ref().clone(),
        state.recent_gaps(),
        state.metrics(),
    ))
    .unwrap();
    let stored_before = persisted(&store);

    feed.fail_activity.store(true, Ordering::SeqCst);
    feed.fail_metrics.store(true, Ordering::SeqCst);
    assert!(matches!(
        poller.poll_now(PipelineKind::Trail).await,
        PollOutcome::Failed(TrailError::Transport(_))
    ));
    assert!(matches!(
        poller.poll_now(PipelineKind::Metrics).await,
        PollOutcome::Failed(TrailError::Status { status: 500, .. })
    ));

    let memory_after = serde_json::to_string(&(
        state.trail().as_ref().clone(),
        state.recent_gaps(),
        state.metrics(),
    ))
    .unwrap();
    assert_eq!(memory_before, memory_after);
    assert_eq!(stored_before, persisted(&store));

    let stats = state.stats();
    assert_eq!(stats.trail.succeeded, 1);
    assert_eq!(stats.trail.failed, 1);
    assert_eq!(stats.metrics.failed, 1);
}

#[tokio::test]
async fn overlapping_trigger_is_skipped_while_other_pipeline_proceeds() {
    let (feed, gate) = FakeFeed::gated(json!({"Scout": ["Scanning feed"]}));
    let feed = Arc::new(feed);
    let (poller, state, _store) = build(Arc::clone(&feed), slow_config());

    let first = {
        let poller = Arc::clone(&poller);
        tokio::spawn(async move { poller.poll_now(PipelineKind::Trail).await })
    };
    timeout(Duration::from_secs(1), feed.fetch_started.notified())
        .await
        .expect("first fetch started");

    assert!(matches!(
        poller.poll_now(PipelineKind::Trail).await,
        PollOutcome::Skipped
    ));
    assert!(matches!(
        poller.poll_now(PipelineKind::Metrics).await,
        PollOutcome::Metrics(_)
    ));

    gate.add_permits(1);
    let outcome = timeout(Duration::from_secs(1), first)
        .await
        .expect("first poll finished")
        .expect("task joined");
    assert!(matches!(outcome, PollOutcome::Trail(_)));
    assert_eq!(feed.activity_calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.trail().len(), 1);
    assert_eq!(state.stats().trail.skipped, 1);
}

#[tokio::test]
async fn in_flight_result_is_discarded_after_teardown() {
    let (feed, gate) = FakeFeed::gated(json!({"Scout": ["Gap: late arrival"]}));
    let feed = Arc::new(feed);
    let (poller, state, store) = build(Arc::clone(&feed), slow_config());

    let handle = poller.spawn();
    timeout(Duration::from_secs(1), feed.fetch_started.notified())
        .await
        .expect("initial poll started");

    timeout(Duration::from_secs(1), handle.shutdown())
        .await
        .expect("shutdown completes")
        .expect("clean shutdown");
    gate.add_permits(1);
    sleep(Duration::from_millis(20)).await;

    assert!(poller.is_shut_down());
    assert!(state.trail().is_empty());
    assert!(state.recent_gaps().is_empty());
    assert!(store.raw(TRAIL_KEY).is_none());
    assert_eq!(state.stats().trail.discarded, 1);
    assert!(matches!(
        poller.poll_now(PipelineKind::Trail).await,
        PollOutcome::Discarded
    ));
}

#[tokio::test]
async fn timer_polls_repeatedly() {
    let feed = Arc::new(FakeFeed::new(json!({"Scout": ["tick"]})));
    let (poller, state, _store) = build(
        Arc::clone(&feed),
        PollerConfig {
            trail_interval: Duration::from_millis(10),
            metrics_interval: Duration::from_millis(10),
        },
    );
    let handle = poller.spawn();

    timeout(Duration::from_secs(2), async {
        while feed.activity_calls.load(Ordering::SeqCst) < 3 {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timer kept polling");
    handle.shutdown().await.unwrap();

    assert_eq!(state.trail().len(), 1);
    assert!(state.metrics().is_some());
}

#[tokio::test]
async fn manual_refresh_triggers_a_poll() {
    let feed = Arc::new(FakeFeed::new(json!({"Scout": ["first"]})));
    let (poller, state, _store) = build(Arc::clone(&feed), slow_config());
    let handle = poller.spawn();

    timeout(Duration::from_secs(1), async {
        while state.trail().is_empty() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("initial poll applied");

    *feed.activity.lock() = json!({"Scout": ["first", "second"]});
    handle.refresh();
    timeout(Duration::from_secs(1), async {
        while state.trail().len() < 2 {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("refresh applied");
    assert_eq!(state.trail()[0].action, "second");
    assert!(Arc::ptr_eq(&handle.poller().pipeline().state(), &state));

    // A direct trigger either runs or loses the race to the timer's own poll.
    let direct = handle.poll_now(PipelineKind::Metrics).await;
    assert!(matches!(direct, PollOutcome::Metrics(_) | PollOutcome::Skipped));
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn scan_then_refresh_applies_new_activity() {
    let feed = Arc::new(FakeFeed::new(json!({})));
    let (poller, state, _store) = build(Arc::clone(&feed), slow_config());

    let report = poller
        .scan_and_refresh(Duration::from_millis(1))
        .await
        .expect("scan succeeds");
    assert_eq!(report.reply["status"], "scan complete");
    assert!(report.trail.is_applied());
    assert!(report.metrics.is_applied());
    assert_eq!(feed.scans.load(Ordering::SeqCst), 1);

    let gaps = state.recent_gaps();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].guideline.id, "GDPR-Art.5");
}

#[tokio::test]
async fn failed_scan_does_not_poll() {
    let feed = Arc::new(FakeFeed::new(json!({"Scout": ["kept"]})));
    feed.fail_scan.store(true, Ordering::SeqCst);
    let (poller, state, _store) = build(Arc::clone(&feed), slow_config());

    let err = poller
        .scan_and_refresh(Duration::from_millis(1))
        .await
        .unwrap_err();
    assert!(matches!(err, PollError::Scan(_)));
    assert_eq!(feed.activity_calls.load(Ordering::SeqCst), 0);
    assert!(state.trail().is_empty());
}
