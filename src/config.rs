use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use activity_trail::adapters::HttpFeedConfig;
use anyhow::{bail, Context, Result};
use compliance_poller::PollerConfig;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};
use url::Url;

pub const APP_DIR: &str = "compliance-watch";

pub const ENV_API_BASE: &str = "COMPLIANCE_API_BASE";
pub const ENV_STATE_DIR: &str = "COMPLIANCE_STATE_DIR";
pub const ENV_TRAIL_INTERVAL: &str = "COMPLIANCE_TRAIL_INTERVAL";
pub const ENV_METRICS_INTERVAL: &str = "COMPLIANCE_METRICS_INTERVAL";

/// Durations are written the way people type them: `3s`, `500ms`, `1m`.
mod human_duration {
    use std::time::Duration;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(D::Error::custom)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Dashboard backend base URL.
    pub api_base: String,
    #[serde(with = "human_duration")]
    pub trail_interval: Duration,
    #[serde(with = "human_duration")]
    pub metrics_interval: Duration,
    #[serde(with = "human_duration")]
    pub request_timeout: Duration,
    /// How many recent gaps the session keeps.
    pub gap_capacity: usize,
    /// Where the trail, gaps and metrics cache lives between runs.
    pub state_dir: PathBuf,
    /// Pause between triggering a scan and refreshing the pipelines.
    #[serde(with = "human_duration")]
    pub scan_settle: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        let feed = HttpFeedConfig::default();
        let poller = PollerConfig::default();
        Self {
            api_base: feed.base_url,
            trail_interval: poller.trail_interval,
            metrics_interval: poller.metrics_interval,
            request_timeout: feed.timeout,
            gap_capacity: 5,
            state_dir: default_state_dir(),
            scan_settle: Duration::from_secs(2),
        }
    }
}

fn default_state_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

impl AppConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).context("Failed to parse config file")
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| env::var(key).ok())
    }

    /// Apply `COMPLIANCE_*` overrides read through `lookup`.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_base) = lookup(ENV_API_BASE) {
            self.api_base = api_base;
        }
        if let Some(dir) = lookup(ENV_STATE_DIR) {
            self.state_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_TRAIL_INTERVAL) {
            self.trail_interval = humantime::parse_duration(raw.trim())
                .with_context(|| format!("{ENV_TRAIL_INTERVAL}={raw}"))?;
        }
        if let Some(raw) = lookup(ENV_METRICS_INTERVAL) {
            self.metrics_interval = humantime::parse_duration(raw.trim())
                .with_context(|| format!("{ENV_METRICS_INTERVAL}={raw}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.trail_interval.is_zero() {
            bail!("trail_interval must be greater than zero");
        }
        if self.metrics_interval.is_zero() {
            bail!("metrics_interval must be greater than zero");
        }
        if self.request_timeout.is_zero() {
            bail!("request_timeout must be greater than zero");
        }
        if self.gap_capacity == 0 {
            bail!("gap_capacity must be at least 1");
        }
        Url::parse(&self.api_base).with_context(|| format!("invalid api_base {}", self.api_base))?;
        Ok(())
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            trail_interval: self.trail_interval,
            metrics_interval: self.metrics_interval,
        }
    }

    pub fn feed_config(&self) -> HttpFeedConfig {
        HttpFeedConfig {
            base_url: self.api_base.clone(),
            timeout: self.request_timeout,
        }
    }
}

pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
    /// False when no file existed and defaults were used.
    pub from_file: bool,
}

/// Priority: explicit path > ./config/config.yaml > <config dir>/compliance-watch/config.yaml.
pub fn config_search_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let local_config = PathBuf::from("config/config.yaml");
    if local_config.exists() {
        return Ok(local_config);
    }
    let mut path = dirs::config_dir().context("Failed to get config directory")?;
    path.push(APP_DIR);
    path.push("config.yaml");
    Ok(path)
}

/// Load the config file (or defaults) and apply environment overrides.
///
/// An explicitly requested file must exist; the default locations may not.
pub async fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = config_search_path(explicit)?;

    let (mut config, from_file) = if fs::try_exists(&path).await.unwrap_or(false) {
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = AppConfig::from_yaml_str(&content)
            .with_context(|| format!("in {}", path.display()))?;
        info!("Loaded configuration from: {}", path.display());
        (config, true)
    } else if explicit.is_some() {
        bail!("Config file not found: {}", path.display());
    } else {
        warn!("Config file not found, using defaults: {}", path.display());
        (AppConfig::default(), false)
    };

    config.apply_env_overrides()?;
    Ok(LoadedConfig {
        config,
        path,
        from_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_dashboard_cadence() {
        let config = AppConfig::default();
        assert_eq!(config.api_base, "http://localhost:8000");
        assert_eq!(config.trail_interval, Duration::from_secs(3));
        assert_eq!(config.metrics_interval, Duration::from_secs(5));
        assert_eq!(config.gap_capacity, 5);
        assert_eq!(config.scan_settle, Duration::from_secs(2));
        assert!(config.state_dir.ends_with(APP_DIR));
        config.validate().unwrap();
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = AppConfig::from_yaml_str(
            "api_base: http://backend:9000\ntrail_interval: 750ms\ngap_capacity: 8\n",
        )
        .unwrap();
        assert_eq!(config.api_base, "http://backend:9000");
        assert_eq!(config.trail_interval, Duration::from_millis(750));
        assert_eq!(config.gap_capacity, 8);
        assert_eq!(config.metrics_interval, Duration::from_secs(5));
    }

    #[test]
    fn yaml_round_trips_human_durations() {
        let config = AppConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("trail_interval: 3s"));
        assert_eq!(AppConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn bad_duration_is_rejected() {
        assert!(AppConfig::from_yaml_str("metrics_interval: soon\n").is_err());
    }

    #[test]
    fn env_overrides_win_over_file() {
        let vars: HashMap<&str, &str> = [
            (ENV_API_BASE, "http://override:8000"),
            (ENV_STATE_DIR, "/tmp/cw-state"),
            (ENV_TRAIL_INTERVAL, "1s"),
        ]
        .into_iter()
        .collect();
        let mut config = AppConfig::default();
        config
            .apply_overrides_from(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.api_base, "http://override:8000");
        assert_eq!(config.state_dir, PathBuf::from("/tmp/cw-state"));
        assert_eq!(config.trail_interval, Duration::from_secs(1));
        assert_eq!(config.metrics_interval, Duration::from_secs(5));
    }

    #[test]
    fn invalid_env_interval_is_an_error() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides_from(|key| (key == ENV_METRICS_INTERVAL).then(|| "often".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_METRICS_INTERVAL));
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut config = AppConfig {
            trail_interval: Duration::ZERO,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        config.trail_interval = Duration::from_secs(3);
        config.gap_capacity = 0;
        assert!(config.validate().is_err());

        config.gap_capacity = 5;
        config.api_base = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        assert!(load_config(Some(&missing)).await.is_err());
    }

    #[tokio::test]
    async fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "gap_capacity: 3\nscan_settle: 0s\n").unwrap();
        let loaded = load_config(Some(&path)).await.unwrap();
        assert!(loaded.from_file);
        assert_eq!(loaded.path, path);
        assert_eq!(loaded.config.gap_capacity, 3);
        assert_eq!(loaded.config.scan_settle, Duration::ZERO);
    }
}
