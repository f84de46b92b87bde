use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::errors::{TrailError, TrailResult};

/// Structured activity record as emitted by newer agents.
///
/// Every field is optional; wrongly typed fields are read as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub action: Option<String>,
    /// Textual form of the raw `timestamp` (numbers are kept as their digits).
    pub timestamp: Option<String>,
    pub time_display: Option<String>,
    pub date_display: Option<String>,
    pub client: Option<String>,
}

impl RawRecord {
    pub fn from_map(map: &Map<String, JsonValue>) -> Self {
        Self {
            action: string_field(map, "action"),
            timestamp: match map.get("timestamp") {
                Some(JsonValue::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(JsonValue::Number(n)) => Some(n.to_string()),
                _ => None,
            },
            time_display: string_field(map, "time_display"),
            date_display: string_field(map, "date_display"),
            client: string_field(map, "client"),
        }
    }
}

fn string_field(map: &Map<String, JsonValue>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(JsonValue::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// One element of an agent's log list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawLogEntry {
    /// Pre-structured agents log bare strings.
    Legacy(String),
    Record(RawRecord),
}

impl RawLogEntry {
    /// Never fails: anything that is neither a string nor an object becomes
    /// an empty record so the entry is kept and counted.
    pub fn from_value(value: &JsonValue) -> Self {
        match value {
            JsonValue::String(text) => RawLogEntry::Legacy(text.clone()),
            JsonValue::Object(map) => RawLogEntry::Record(RawRecord::from_map(map)),
            _ => RawLogEntry::Record(RawRecord::default()),
        }
    }
}

/// Agent logs of one activity feed response, in the order received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFeed {
    pub agents: Vec<AgentLog>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentLog {
    pub agent: String,
    pub entries: Vec<RawLogEntry>,
}

impl RawFeed {
    /// Parse a feed body. The body must be a JSON object; an agent whose
    /// value is not an array contributes no entries.
    pub fn from_value(value: JsonValue) -> TrailResult<Self> {
        let map = match value {
            JsonValue::Object(map) => map,
            other => {
                return Err(TrailError::Malformed(format!(
                    "activity feed must be an object keyed by agent, got {}",
                    json_kind(&other)
                )))
            }
        };
        let agents = map
            .into_iter()
            .map(|(agent, logs)| {
                let entries = match &logs {
                    JsonValue::Array(items) => items.iter().map(RawLogEntry::from_value).collect(),
                    _ => Vec::new(),
                };
                AgentLog { agent, entries }
            })
            .collect();
        Ok(Self { agents })
    }

    pub fn from_json_str(body: &str) -> TrailResult<Self> {
        let value: JsonValue =
            serde_json::from_str(body).map_err(|err| TrailError::Malformed(err.to_string()))?;
        Self::from_value(value)
    }

    pub fn entry_count(&self) -> usize {
        self.agents.iter().map(|log| log.entries.len()).sum()
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Status reported by the backend health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn agent_order_is_preserved() {
        let feed = RawFeed::from_json_str(
            r#"{"Risk Sentinel": ["a"], "Gap Analyst": ["b"], "Evidence Officer": []}"#,
        )
        .unwrap();
        let agents: Vec<_> = feed.agents.iter().map(|log| log.agent.as_str()).collect();
        assert_eq!(agents, vec!["Risk Sentinel", "Gap Analyst", "Evidence Officer"]);
    }

    #[test]
    fn non_array_agent_values_are_empty() {
        let feed = RawFeed::from_value(json!({"Scout": "oops", "Analyst": null})).unwrap();
        assert_eq!(feed.agents.len(), 2);
        assert_eq!(feed.entry_count(), 0);
    }

    #[test]
    fn non_object_body_is_malformed() {
        assert!(matches!(
            RawFeed::from_value(json!(["Scout"])),
            Err(TrailError::Malformed(_))
        ));
        assert!(matches!(
            RawFeed::from_json_str("<html>"),
            Err(TrailError::Malformed(_))
        ));
    }

    #[test]
    fn odd_elements_degrade_to_empty_records() {
        let feed = RawFeed::from_value(json!({
            "Scout": [42, null, {"action": 7, "timestamp": 1767225600, "client": "Acme"}]
        }))
        .unwrap();
        let entries = &feed.agents[0].entries;
        assert_eq!(entries[0], RawLogEntry::Record(RawRecord::default()));
        assert_eq!(entries[1], RawLogEntry::Record(RawRecord::default()));
        assert_eq!(
            entries[2],
            RawLogEntry::Record(RawRecord {
                action: None,
                timestamp: Some("1767225600".into()),
                client: Some("Acme".into()),
                ..Default::default()
            })
        );
    }
}
