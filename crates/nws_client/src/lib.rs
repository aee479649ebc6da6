//! NWS active-alerts client.
//!
//! Fetches point-based alerts from `api.weather.gov` (or any API with the
//! same GeoJSON shape) and exposes them through the [`AlertFeed`] trait so
//! the engine can be driven by a scripted feed in tests.

use std::time::Duration;

use async_trait::async_trait;
use common::config::FeedConfig;
use common::Error;
use serde::Deserialize;
use tracing::debug;

/// Upstream source of raw alert records for a coordinate.
#[async_trait]
pub trait AlertFeed: Send + Sync {
    /// Fetch the raw active-alert features covering `(lat, lon)`.
    async fn fetch_alerts(&self, lat: f64, lon: f64) -> Result<Vec<AlertFeature>, Error>;
}

// ── NWS response types ────────────────────────────────────────────────

/// Response from `/alerts/active?point={lat},{lon}`.
#[derive(Debug, Deserialize)]
pub struct AlertCollection {
    #[serde(default)]
    pub features: Vec<AlertFeature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertFeature {
    #[serde(default)]
    pub id: Option<String>,
    pub properties: AlertProperties,
}

impl AlertFeature {
    /// Stable identifier: the CAP id from properties, else the feature URL.
    pub fn alert_id(&self) -> Option<&str> {
        self.properties
            .id
            .as_deref()
            .or(self.id.as_deref())
            .filter(|id| !id.trim().is_empty())
    }
}

/// CAP properties block. Timestamps stay as raw strings so one malformed
/// record can be dropped without failing the whole collection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertProperties {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "areaDesc", default)]
    pub area_desc: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "messageType", default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub certainty: Option<String>,
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub effective: Option<String>,
    #[serde(default)]
    pub expires: Option<String>,
}

// ── Client ────────────────────────────────────────────────────────────

/// Longest error-body excerpt carried into [`Error::Feed`], in characters.
const ERROR_BODY_CHARS: usize = 500;

/// First `max_chars` characters of `body`; never splits a UTF-8 sequence.
fn truncate_body(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}

/// NWS API client with connection pooling and User-Agent header.
#[derive(Debug, Clone)]
pub struct NwsClient {
    client: reqwest::Client,
    base_url: String,
    health_timeout: Duration,
}

impl NwsClient {
    pub fn new(cfg: &FeedConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .pool_max_idle_per_host(4)
            .timeout(Duration::from_secs(cfg.fetch_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build NWS HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            health_timeout: Duration::from_secs(cfg.health_timeout_secs),
        })
    }

    pub fn alerts_url(&self) -> String {
        format!("{}/alerts/active", self.base_url)
    }

    /// Probe the API root with the short auxiliary timeout.
    pub async fn health_check(&self) -> Result<(), Error> {
        let resp = self
            .client
            .get(format!("{}/", self.base_url))
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(self.health_timeout.as_secs())
                } else {
                    Error::Http(format!("health check failed: {}", e))
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Feed(format!("health check returned {}", status.as_u16())));
        }
        Ok(())
    }
}

#[async_trait]
impl AlertFeed for NwsClient {
    async fn fetch_alerts(&self, lat: f64, lon: f64) -> Result<Vec<AlertFeature>, Error> {
        let url = self.alerts_url();
        let point = format!("{},{}", lat, lon);

        debug!("Fetching NWS alerts: {} point={}", url, point);

        let resp = self
            .client
            .get(&url)
            .query(&[("point", point.as_str())])
            .header("Accept", "application/geo+json")
            .send()
            .await
            .map_err(|e| Error::Http(format!("HTTP error for {}: {}", point, e)))?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Feed(format!(
                "NWS returned {} for {}: {}",
                status,
                point,
                truncate_body(&body, ERROR_BODY_CHARS)
            )));
        }

        let data: AlertCollection = resp
            .json()
            .await
            .map_err(|e| Error::Feed(format!("JSON parse error for {}: {}", point, e)))?;

        debug!("Got {} alert features for {}", data.features.len(), point);

        Ok(data.features)
    }
}
