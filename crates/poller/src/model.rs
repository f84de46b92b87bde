use std::time::Duration;

use activity_trail::{MetricsCycle, TrailCycle, TrailError};
use compliance_state_center::PollStatus;
use serde_json::Value as JsonValue;

pub const DEFAULT_TRAIL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct PollerConfig {
    pub trail_interval: Duration,
    pub metrics_interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            trail_interval: DEFAULT_TRAIL_INTERVAL,
            metrics_interval: DEFAULT_METRICS_INTERVAL,
        }
    }
}

/// How one poll attempt ended.
#[derive(Debug)]
pub enum PollOutcome {
    Trail(TrailCycle),
    Metrics(MetricsCycle),
    /// Fetch failed; cached state untouched.
    Failed(TrailError),
    /// Another poll of the same pipeline was in flight.
    Skipped,
    /// The poller was torn down before the result could be applied.
    Discarded,
}

impl PollOutcome {
    pub fn status(&self) -> PollStatus {
        match self {
            PollOutcome::Trail(_) | PollOutcome::Metrics(_) => PollStatus::Succeeded,
            PollOutcome::Failed(_) => PollStatus::Failed,
            PollOutcome::Skipped => PollStatus::Skipped,
            PollOutcome::Discarded => PollStatus::Discarded,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, PollOutcome::Trail(_) | PollOutcome::Metrics(_))
    }
}

#[derive(Debug)]
pub struct ScanReport {
    pub reply: JsonValue,
    pub trail: PollOutcome,
    pub metrics: PollOutcome,
}
