//! Raw feed -> flat list of [`NormalizedEntry`].

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use compliance_core_types::NormalizedEntry;

use crate::model::{RawFeed, RawLogEntry, RawRecord};

pub const UNKNOWN_ACTION: &str = "Unknown action";
pub const UNKNOWN_TIME: &str = "Unknown";
pub const LEGACY_TIME: &str = "Legacy";
/// Case-sensitive marker identifying tool invocations in action text.
pub const TOOL_MARKER: &str = "Tool";

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// One entry per raw element, agents in feed order, per-agent order kept.
pub fn normalize_feed(feed: &RawFeed) -> Vec<NormalizedEntry> {
    let mut out = Vec::with_capacity(feed.entry_count());
    for log in &feed.agents {
        out.extend(
            log.entries
                .iter()
                .map(|entry| normalize_entry(&log.agent, entry)),
        );
    }
    out
}

pub fn normalize_entry(agent: &str, entry: &RawLogEntry) -> NormalizedEntry {
    match entry {
        RawLogEntry::Legacy(text) => NormalizedEntry {
            agent: agent.to_string(),
            action: text.clone(),
            display_time: LEGACY_TIME.to_string(),
            client: None,
            is_tool_call: text.contains(TOOL_MARKER),
            source_timestamp: None,
        },
        RawLogEntry::Record(record) => normalize_record(agent, record),
    }
}

fn normalize_record(agent: &str, record: &RawRecord) -> NormalizedEntry {
    let action = record
        .action
        .clone()
        .unwrap_or_else(|| UNKNOWN_ACTION.to_string());
    let display_time = record
        .time_display
        .clone()
        .or_else(|| record.timestamp.clone())
        .unwrap_or_else(|| UNKNOWN_TIME.to_string());
    NormalizedEntry {
        agent: agent.to_string(),
        is_tool_call: action.contains(TOOL_MARKER),
        action,
        display_time,
        client: record.client.clone(),
        source_timestamp: record.timestamp.as_deref().and_then(parse_timestamp),
    }
}

/// Accepts RFC 3339, naive ISO-8601 (read as UTC) and epoch seconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    let seconds: f64 = raw.parse().ok()?;
    if !seconds.is_finite() {
        return None;
    }
    let millis = (seconds * 1000.0).round();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    Utc.timestamp_millis_opt(millis as i64).single()
}
