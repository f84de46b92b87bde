use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The two independent polling pipelines of a dashboard session.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    Trail,
    Metrics,
}

impl PipelineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::Trail => "trail",
            PipelineKind::Metrics => "metrics",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One activity log line after normalisation, tagged with its owning agent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEntry {
    pub agent: String,
    pub action: String,
    pub display_time: String,
    #[serde(default)]
    pub client: Option<String>,
    pub is_tool_call: bool,
    #[serde(default)]
    pub source_timestamp: Option<DateTime<Utc>>,
}

impl NormalizedEntry {
    pub fn has_timestamp(&self) -> bool {
        self.source_timestamp.is_some()
    }

    /// Case-insensitive substring match over agent, action and client.
    /// `needle` must already be lower-cased.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.agent.to_lowercase().contains(needle)
            || self.action.to_lowercase().contains(needle)
            || self
                .client
                .as_deref()
                .map(|client| client.to_lowercase().contains(needle))
                .unwrap_or(false)
    }
}

/// A regulatory control requirement from the static catalog.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Guideline {
    pub id: String,
    pub name: String,
    pub category: String,
}

impl Guideline {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
        }
    }
}

impl fmt::Display for Guideline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}: {})", self.id, self.category, self.name)
    }
}

/// A compliance shortfall inferred from a log line and mapped to a guideline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapRecord {
    pub agent: String,
    pub finding: String,
    #[serde(default)]
    pub client: Option<String>,
    pub guideline: Guideline,
}

/// Scalar dashboard snapshot exactly as the backend reports it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub score: f64,
    pub risks: u64,
    #[serde(alias = "policiesMapped")]
    pub policies_mapped: u64,
    #[serde(alias = "pendingReviews")]
    pub pending_reviews: u64,
}

impl fmt::Display for DashboardMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "score={} risks={} policies_mapped={} pending_reviews={}",
            self.score, self.risks, self.policies_mapped, self.pending_reviews
        )
    }
}
