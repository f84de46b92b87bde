use std::time::Duration;

use async_trait::async_trait;
use compliance_core_types::DashboardMetrics;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::debug;
use url::Url;

use crate::errors::{TrailError, TrailResult};
use crate::model::{HealthStatus, RawFeed};
use crate::ports::FeedPort;

pub const ACTIVITY_PATH: &str = "api/agents/activity";
pub const METRICS_PATH: &str = "api/dashboard";
pub const SCAN_PATH: &str = "api/agents/scan";
pub const HEALTH_PATH: &str = "health";

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HttpFeedConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for HttpFeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// [`FeedPort`] over the dashboard backend's JSON HTTP API.
pub struct HttpFeed {
    client: Client,
    base: Url,
}

impl HttpFeed {
    pub fn new(config: HttpFeedConfig) -> TrailResult<Self> {
        let mut base = Url::parse(&config.base_url)
            .map_err(|err| TrailError::InvalidArg(format!("api base {}: {err}", config.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(TrailError::InvalidArg(format!(
                "api base {} cannot carry paths",
                config.base_url
            )));
        }
        // Endpoint paths are relative; keep any prefix of the base.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| TrailError::Internal(err.to_string()))?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> TrailResult<Url> {
        self.base
            .join(path)
            .map_err(|err| TrailError::InvalidArg(format!("endpoint {path}: {err}")))
    }

    async fn get(&self, path: &str) -> TrailResult<(Url, Response)> {
        let url = self.endpoint(path)?;
        debug!(%url, "GET");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| TrailError::Transport(err.to_string()))?;
        Ok((url, response))
    }

    async fn read_json<T: DeserializeOwned>(url: &Url, response: Response) -> TrailResult<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(TrailError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response
            .text()
            .await
            .map_err(|err| TrailError::Transport(err.to_string()))?;
        serde_json::from_str(&body).map_err(|err| TrailError::Malformed(err.to_string()))
    }
}

#[async_trait]
impl FeedPort for HttpFeed {
    async fn fetch_activity(&self) -> Result<RawFeed, TrailError> {
        let (url, response) = self.get(ACTIVITY_PATH).await?;
        let body: JsonValue = Self::read_json(&url, response).await?;
        RawFeed::from_value(body)
    }

    async fn fetch_metrics(&self) -> Result<DashboardMetrics, TrailError> {
        let (url, response) = self.get(METRICS_PATH).await?;
        Self::read_json(&url, response).await
    }

    async fn trigger_scan(&self) -> Result<JsonValue, TrailError> {
        let url = self.endpoint(SCAN_PATH)?;
        debug!(%url, "POST");
        let response = self
            .client
            .post(url.clone())
            .send()
            .await
            .map_err(|err| TrailError::Transport(err.to_string()))?;
        Self::read_json(&url, response).await
    }

    async fn health(&self) -> Result<HealthStatus, TrailError> {
        let (url, response) = self.get(HEALTH_PATH).await?;
        Self::read_json(&url, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `count` connections with a canned status line and body.
    async fn canned_server(status: &'static str, body: &'static str, count: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for _ in 0..count {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let reply = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}")
    }

    fn feed(base_url: String) -> HttpFeed {
        HttpFeed::new(HttpFeedConfig {
            base_url,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fetches_activity_feed() {
        let base = canned_server(
            "200 OK",
            r#"{"Regulatory Scout": ["Using Tool: WebSearch"], "Gap Analyst": [{"action": "Gap: retention"}]}"#,
            1,
        )
        .await;
        let raw = feed(base).fetch_activity().await.unwrap();
        assert_eq!(raw.agents.len(), 2);
        assert_eq!(raw.agents[0].agent, "Regulatory Scout");
    }

    #[tokio::test]
    async fn fetches_metrics() {
        let base = canned_server(
            "200 OK",
            r#"{"score": 78, "risks": 12, "policies_mapped": 142, "pending_reviews": 5}"#,
            1,
        )
        .await;
        let metrics = feed(base).fetch_metrics().await.unwrap();
        assert_eq!(metrics.pending_reviews, 5);
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let base = canned_server("503 Service Unavailable", "{}", 1).await;
        let err = feed(base).fetch_activity().await.unwrap_err();
        assert!(matches!(err, TrailError::Status { status: 503, .. }));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn garbage_body_is_malformed() {
        let base = canned_server("200 OK", "not json", 1).await;
        let err = feed(base).fetch_metrics().await.unwrap_err();
        assert!(matches!(err, TrailError::Malformed(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = feed(format!("http://{addr}")).health().await.unwrap_err();
        assert!(matches!(err, TrailError::Transport(_)));
    }

    #[test]
    fn base_prefix_is_kept() {
        let feed = feed("http://example.test/compliance".into());
        assert_eq!(
            feed.endpoint(ACTIVITY_PATH).unwrap().as_str(),
            "http://example.test/compliance/api/agents/activity"
        );
    }

    #[test]
    fn invalid_base_is_rejected() {
        let err = HttpFeed::new(HttpFeedConfig {
            base_url: "not a url".into(),
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, TrailError::InvalidArg(_)));
    }
}
