use anyhow::Result;
use clap::ValueEnum;
use compliance_core_types::{DashboardMetrics, GapRecord, NormalizedEntry};
use compliance_poller::PollOutcome;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One audit trail line: `[time] agent: action (client)`.
pub fn render_entry(entry: &NormalizedEntry) -> String {
    let mut line = format!("[{}] {}: {}", entry.display_time, entry.agent, entry.action);
    if let Some(client) = &entry.client {
        line.push_str(&format!(" ({client})"));
    }
    if entry.is_tool_call {
        line.push_str(" [tool]");
    }
    line
}

pub fn render_gap(gap: &GapRecord) -> String {
    let client = gap.client.as_deref().unwrap_or("n/a");
    format!(
        "{} | {} | client: {} | found by {}",
        gap.guideline.id, gap.finding, client, gap.agent
    )
}

pub fn render_metrics(metrics: &DashboardMetrics) -> String {
    format!(
        "Compliance score: {}\nOpen risks: {}\nPolicies mapped: {}\nPending reviews: {}",
        metrics.score, metrics.risks, metrics.policies_mapped, metrics.pending_reviews
    )
}

pub fn describe_outcome(outcome: &PollOutcome) -> String {
    match outcome {
        PollOutcome::Trail(cycle) => format!(
            "applied ({} entries, {} new gaps{})",
            cycle.normalized,
            cycle.gaps_added,
            if cycle.persisted { "" } else { ", not persisted" }
        ),
        PollOutcome::Metrics(cycle) => format!(
            "applied{}",
            if cycle.persisted { "" } else { " (not persisted)" }
        ),
        PollOutcome::Failed(err) => format!("failed: {err}"),
        PollOutcome::Skipped => "skipped (already in flight)".to_string(),
        PollOutcome::Discarded => "discarded".to_string(),
    }
}

pub fn outcome_json(outcome: &PollOutcome) -> JsonValue {
    match outcome {
        PollOutcome::Trail(cycle) => json!({"status": "succeeded", "cycle": cycle}),
        PollOutcome::Metrics(cycle) => json!({"status": "succeeded", "cycle": cycle}),
        PollOutcome::Failed(err) => json!({"status": "failed", "error": err.to_string()}),
        other => json!({ "status": format!("{:?}", other.status()).to_lowercase() }),
    }
}
