pub mod store;

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use compliance_core_types::{DashboardMetrics, GapRecord, NormalizedEntry, PipelineKind};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::to_writer_pretty;
use tracing::{debug, warn};

pub use store::{
    FileStore, LocalStore, MemoryStore, StoreError, StoreResult, GAPS_KEY, METRICS_KEY, TRAIL_KEY,
};

/// Score the report generator assumes when no metrics were ever cached.
pub const DEFAULT_REPORT_SCORE: f64 = 60.0;

/// Newest entries shown in the dashboard's recent-activity card.
pub const RECENT_ACTIVITY_LIMIT: usize = 5;

#[derive(Debug, Clone)]
struct BoundedRing<T> {
    capacity: usize,
    data: VecDeque<T>,
}

impl<T> BoundedRing<T> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            data: VecDeque::new(),
        }
    }
}

impl<T: Clone> BoundedRing<T> {
    /// Append `item`, evicting and returning the oldest entry when full.
    fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.data.len() == self.capacity {
            self.data.pop_front()
        } else {
            None
        };
        self.data.push_back(item);
        evicted
    }

    fn snapshot(&self) -> Vec<T> {
        self.data.iter().cloned().collect()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

/// How a single poll attempt ended, as recorded in the session stats.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PollStatus {
    Succeeded,
    Failed,
    Skipped,
    Discarded,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct PipelineStats {
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    pub discarded: u64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SessionStats {
    pub trail: PipelineStats,
    pub metrics: PipelineStats,
    pub storage_failures: u64,
}

impl SessionStats {
    fn pipeline_mut(&mut self, kind: PipelineKind) -> &mut PipelineStats {
        match kind {
            PipelineKind::Trail => &mut self.trail,
            PipelineKind::Metrics => &mut self.metrics,
        }
    }
}

/// What [`SessionState::rehydrate`] restored from durable storage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RehydrateReport {
    pub trail_entries: usize,
    pub gaps: usize,
    pub metrics: bool,
}

/// Result of committing one trail poll.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrailCommit {
    pub trail_entries: usize,
    pub gaps_added: usize,
    pub gaps_evicted: usize,
    pub persisted: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub trail: Vec<NormalizedEntry>,
    pub recent_gaps: Vec<GapRecord>,
    pub gap_capacity: usize,
    pub metrics: Option<DashboardMetrics>,
    pub stats: SessionStats,
}

#[derive(Debug)]
struct TrailView {
    trail: Arc<Vec<NormalizedEntry>>,
    gaps: BoundedRing<GapRecord>,
}

/// Explicitly owned state of one dashboard session.
///
/// The poll pipeline is the only writer (through the `commit_*` methods);
/// rendering code reads through the accessors. A trail commit swaps the
/// trail and the recent-gaps list together, so readers never observe one
/// without the other.
pub struct SessionState {
    view: RwLock<TrailView>,
    metrics: RwLock<Option<DashboardMetrics>>,
    commit_lock: Mutex<()>,
    store: Arc<dyn LocalStore>,
    stats: Mutex<SessionStats>,
}

impl SessionState {
    pub fn new(store: Arc<dyn LocalStore>, gap_capacity: usize) -> Self {
        Self {
            view: RwLock::new(TrailView {
                trail: Arc::new(Vec::new()),
                gaps: BoundedRing::new(gap_capacity),
            }),
            metrics: RwLock::new(None),
            commit_lock: Mutex::new(()),
            store,
            stats: Mutex::new(SessionStats::default()),
        }
    }

    pub fn in_memory(gap_capacity: usize) -> Self {
        Self::new(Arc::new(MemoryStore::new()), gap_capacity)
    }

    /// Restore the last persisted trail, gaps and metrics.
    ///
    /// Missing keys leave the corresponding state empty; unreadable ones are
    /// logged and skipped.
    pub fn rehydrate(&self) -> RehydrateReport {
        let _guard = self.commit_lock.lock();
        let mut report = RehydrateReport::default();

        let trail = self.load_or_warn::<Vec<NormalizedEntry>>(TRAIL_KEY);
        let gaps = self.load_or_warn::<Vec<GapRecord>>(GAPS_KEY);
        {
            let mut view = self.view.write();
            if let Some(trail) = trail {
                report.trail_entries = trail.len();
                view.trail = Arc::new(trail);
            }
            if let Some(gaps) = gaps {
                let mut ring = BoundedRing::new(view.gaps.capacity);
                for gap in gaps {
                    ring.push(gap);
                }
                report.gaps = ring.len();
                view.gaps = ring;
            }
        }

        if let Some(metrics) = self.load_or_warn::<DashboardMetrics>(METRICS_KEY) {
            *self.metrics.write() = Some(metrics);
            report.metrics = true;
        }

        debug!(?report, "session state rehydrated");
        report
    }

    fn load_or_warn<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match store::load_json::<T>(self.store.as_ref(), key) {
            Ok(value) => value,
            Err(err) => {
                warn!(%err, key, "ignoring unreadable cached state");
                None
            }
        }
    }

    fn persist<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match store::save_json(self.store.as_ref(), key, value) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, key, "failed to persist state; continuing from memory");
                self.stats.lock().storage_failures += 1;
                false
            }
        }
    }

    /// Replace the trail and append newly detected gaps.
    ///
    /// The new state is persisted before it becomes visible; a storage
    /// failure is logged and the in-memory state is still updated.
    pub fn commit_trail(&self, trail: Vec<NormalizedEntry>, new_gaps: Vec<GapRecord>) -> TrailCommit {
        let _guard = self.commit_lock.lock();

        let mut gaps = self.view.read().gaps.clone();
        let gaps_added = new_gaps.len();
        let gaps_evicted = new_gaps
            .into_iter()
            .filter_map(|gap| gaps.push(gap))
            .count();
        let gap_list = gaps.snapshot();

        let trail_saved = self.persist(TRAIL_KEY, &trail);
        let gaps_saved = self.persist(GAPS_KEY, &gap_list);

        let trail_entries = trail.len();
        {
            let mut view = self.view.write();
            view.trail = Arc::new(trail);
            view.gaps = gaps;
        }

        TrailCommit {
            trail_entries,
            gaps_added,
            gaps_evicted,
            persisted: trail_saved && gaps_saved,
        }
    }

    /// Overwrite the cached metrics snapshot. Returns whether it was persisted.
    pub fn commit_metrics(&self, metrics: DashboardMetrics) -> bool {
        let _guard = self.commit_lock.lock();
        let persisted = self.persist(METRICS_KEY, &metrics);
        *self.metrics.write() = Some(metrics);
        persisted
    }

    pub fn record_poll(&self, kind: PipelineKind, status: PollStatus) {
        let mut stats = self.stats.lock();
        let pipeline = stats.pipeline_mut(kind);
        match status {
            PollStatus::Succeeded => pipeline.succeeded += 1,
            PollStatus::Failed => pipeline.failed += 1,
            PollStatus::Skipped => pipeline.skipped += 1,
            PollStatus::Discarded => pipeline.discarded += 1,
        }
    }

    pub fn trail(&self) -> Arc<Vec<NormalizedEntry>> {
        Arc::clone(&self.view.read().trail)
    }

    /// The newest `limit` trail entries, newest first.
    pub fn recent_activity(&self, limit: usize) -> Vec<NormalizedEntry> {
        self.trail().iter().take(limit).cloned().collect()
    }

    pub fn search_trail(&self, query: &str) -> Vec<NormalizedEntry> {
        let needle = query.trim().to_lowercase();
        self.trail()
            .iter()
            .filter(|entry| entry.matches_lowercase(&needle))
            .cloned()
            .collect()
    }

    /// Recent gaps, oldest first.
    pub fn recent_gaps(&self) -> Vec<GapRecord> {
        self.view.read().gaps.snapshot()
    }

    pub fn gap_capacity(&self) -> usize {
        self.view.read().gaps.capacity
    }

    pub fn metrics(&self) -> Option<DashboardMetrics> {
        self.metrics.read().clone()
    }

    pub fn report_score(&self) -> f64 {
        self.metrics
            .read()
            .as_ref()
            .map(|metrics| metrics.score)
            .unwrap_or(DEFAULT_REPORT_SCORE)
    }

    pub fn stats(&self) -> SessionStats {
        self.stats.lock().clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let (trail, recent_gaps, gap_capacity) = {
            let view = self.view.read();
            (view.trail.as_ref().clone(), view.gaps.snapshot(), view.gaps.capacity)
        };
        SessionSnapshot {
            trail,
            recent_gaps,
            gap_capacity,
            metrics: self.metrics(),
            stats: self.stats(),
        }
    }

    pub fn write_snapshot<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let snapshot = self.snapshot();
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        to_writer_pretty(&mut writer, &snapshot)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        writer.flush()?;
        Ok(())
    }
}
