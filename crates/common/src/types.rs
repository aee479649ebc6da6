//! Domain types shared across the monitor.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provenance string stamped on every normalized alert.
pub const ALERT_SOURCE: &str = "National Weather Service";

// ── Alerts ────────────────────────────────────────────────────────────

/// Three-level domain severity derived from the feed's severity/certainty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    Warning,
    Watch,
    Advisory,
}

impl AlertSeverity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Warning => "WARNING",
            Self::Watch => "WATCH",
            Self::Advisory => "ADVISORY",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One active weather hazard notice for a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Upstream identifier, used for deduplication.
    pub id: String,
    /// Caller-supplied location identifier this alert was fetched for.
    pub location_id: String,
    pub severity: AlertSeverity,
    pub headline: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub source: String,
    /// `now < end_time` at normalization time. Never re-evaluated.
    pub is_active: bool,
}

// ── Notifications ─────────────────────────────────────────────────────

/// Payload published to channel subscribers after each scheduled fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertNotification {
    pub location_key: String,
    pub alerts: Vec<Alert>,
    pub delivered_at: DateTime<Utc>,
}
