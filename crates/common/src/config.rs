//! Monitor configuration types.

use serde::{Deserialize, Serialize};

/// Top-level monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Upstream alert feed settings.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Polling, caching and retention intervals.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Locations subscribed at startup.
    #[serde(default = "default_locations")]
    pub locations: Vec<LocationConfig>,

    /// Directory for the JSONL notification journal. Disabled when unset.
    #[serde(default)]
    pub journal_dir: Option<String>,
}

/// Upstream feed connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Base URL of the point-alert API (e.g. `https://api.weather.gov`).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User-Agent header. The NWS API rejects anonymous clients.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Bound on a single on-demand alert fetch.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Bound on the feed health check.
    #[serde(default = "default_health_timeout")]
    pub health_timeout_secs: u64,
}

/// Timing configuration (seconds unless stated otherwise).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Scheduler period.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Freshness cache TTL.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Historical retention window, in hours.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,

    /// Heartbeat log interval.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
}

/// A monitored location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Human-readable name.
    pub name: String,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

impl LocationConfig {
    /// Subscription key in `"lat,lon"` form.
    pub fn key(&self) -> String {
        format!("{},{}", self.lat, self.lon)
    }
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://api.weather.gov".into()
}
fn default_user_agent() -> String {
    "alert-monitor/0.1 (severe weather alerts; contact@example.com)".into()
}
fn default_fetch_timeout() -> u64 {
    10
}
fn default_health_timeout() -> u64 {
    5
}

fn default_poll_interval() -> u64 {
    300
}
fn default_cache_ttl() -> u64 {
    300
}
fn default_retention_hours() -> u64 {
    24
}
fn default_heartbeat_interval() -> u64 {
    60
}

fn default_locations() -> Vec<LocationConfig> {
    vec![LocationConfig {
        name: "New York City".into(),
        lat: 40.71,
        lon: -74.01,
    }]
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            fetch_timeout_secs: default_fetch_timeout(),
            health_timeout_secs: default_health_timeout(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            cache_ttl_secs: default_cache_ttl(),
            retention_hours: default_retention_hours(),
            heartbeat_interval_secs: default_heartbeat_interval(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            timing: TimingConfig::default(),
            locations: default_locations(),
            journal_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let raw = r#"{"timing": {"poll_interval_secs": 60}}"#;
        let cfg: MonitorConfig = serde_json::from_str(raw).expect("config should deserialize");
        assert_eq!(cfg.timing.poll_interval_secs, 60);
        assert_eq!(cfg.timing.cache_ttl_secs, 300);
        assert_eq!(cfg.timing.retention_hours, 24);
        assert_eq!(cfg.feed.fetch_timeout_secs, 10);
        assert_eq!(cfg.feed.health_timeout_secs, 5);
        assert_eq!(cfg.locations.len(), 1);
    }

    #[test]
    fn test_location_key_format() {
        let loc = LocationConfig {
            name: "Chicago".into(),
            lat: 41.88,
            lon: -87.63,
        };
        assert_eq!(loc.key(), "41.88,-87.63");
    }
}
