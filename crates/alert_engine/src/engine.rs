//! Fetch orchestration.
//!
//! `AlertEngine` is the error boundary between callers and the upstream
//! feed: a fresh cache entry short-circuits the network, a successful fetch
//! refreshes both the cache and the history, and any upstream failure
//! degrades to the last cached list (stale or not) or an empty list.

use std::sync::Arc;
use std::time::Duration;

use common::{Alert, Error, MonitorConfig};
use dashmap::DashMap;
use nws_client::{AlertFeature, AlertFeed};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{cache_key, AlertCache, DEFAULT_TTL_SECS};
use crate::clock::{Clock, SystemClock};
use crate::history::{HistoricalStore, DEFAULT_RETENTION_HOURS};
use crate::normalize::normalize;
use crate::registry::{AlertSubscriber, SubscriptionRegistry};

/// Default bound on one upstream fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest accepted cache TTL (one day).
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

/// Largest accepted retention window (one year).
pub const MAX_RETENTION_HOURS: u64 = 24 * 365;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub fetch_timeout: Duration,
    pub cache_ttl: chrono::Duration,
    pub retention: chrono::Duration,
}

impl EngineSettings {
    /// Values above [`MAX_CACHE_TTL_SECS`] / [`MAX_RETENTION_HOURS`] are clamped.
    pub fn from_config(cfg: &MonitorConfig) -> Self {
        let ttl_secs = cfg.timing.cache_ttl_secs.min(MAX_CACHE_TTL_SECS);
        let retention_hours = cfg.timing.retention_hours.min(MAX_RETENTION_HOURS);
        Self {
            fetch_timeout: Duration::from_secs(cfg.feed.fetch_timeout_secs),
            cache_ttl: chrono::Duration::seconds(ttl_secs as i64),
            retention: chrono::Duration::hours(retention_hours as i64),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            cache_ttl: chrono::Duration::seconds(DEFAULT_TTL_SECS),
            retention: chrono::Duration::hours(DEFAULT_RETENTION_HOURS),
        }
    }
}

/// Finite and inside the valid latitude/longitude ranges.
pub fn valid_coordinates(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}

pub struct AlertEngine {
    feed: Arc<dyn AlertFeed>,
    clock: Arc<dyn Clock>,
    cache: AlertCache,
    history: HistoricalStore,
    registry: Arc<SubscriptionRegistry>,
    /// One gate per cache key so concurrent misses share a single upstream call.
    inflight: DashMap<String, Arc<Mutex<()>>>,
    fetch_timeout: Duration,
}

impl AlertEngine {
    pub fn new(feed: Arc<dyn AlertFeed>, settings: EngineSettings) -> Self {
        Self::with_clock(feed, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        feed: Arc<dyn AlertFeed>,
        settings: EngineSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            feed,
            clock,
            cache: AlertCache::new(settings.cache_ttl),
            history: HistoricalStore::new(settings.retention),
            registry: Arc::new(SubscriptionRegistry::new()),
            inflight: DashMap::new(),
            fetch_timeout: settings.fetch_timeout,
        }
    }

    /// Active alerts for a coordinate.
    ///
    /// Never fails: upstream errors fall back to the last cached list for
    /// the rounded key, else an empty list. Invalid coordinates yield an
    /// empty list without touching the feed.
    pub async fn fetch_active(&self, lat: f64, lon: f64, location_id: &str) -> Vec<Alert> {
        if !valid_coordinates(lat, lon) {
            warn!("{}: invalid coordinates ({}, {}), returning no alerts", location_id, lat, lon);
            return Vec::new();
        }

        let key = cache_key(lat, lon);
        if let Some(entry) = self.cache.get(&key, self.clock.now()) {
            debug!("{}: cache hit for {}", location_id, key);
            return entry.alerts;
        }

        let gate = self.inflight.entry(key.clone()).or_default().value().clone();
        let alerts = {
            let _guard = gate.lock().await;
            self.refresh(&key, lat, lon, location_id).await
        };

        // Last one out drops the gate; a caller still holding a clone keeps it.
        drop(gate);
        self.inflight.remove_if(&key, |_, g| Arc::strong_count(g) == 1);

        alerts
    }

    /// Upstream fetch for `key`, run while holding its single-flight gate.
    async fn refresh(&self, key: &str, lat: f64, lon: f64, location_id: &str) -> Vec<Alert> {
        // Another caller may have refreshed the entry while we waited.
        if let Some(entry) = self.cache.get(key, self.clock.now()) {
            debug!("{}: cache filled while waiting for {}", location_id, key);
            return entry.alerts;
        }

        match self.fetch_upstream(lat, lon).await {
            Ok(features) => {
                let now = self.clock.now();
                let alerts = normalize(&features, location_id, now);
                info!(
                    "{}: {} active alerts ({} raw records) for {}",
                    location_id,
                    alerts.len(),
                    features.len(),
                    key
                );
                self.cache.put(key, alerts.clone(), now);
                self.history.record(location_id, &alerts, now);
                alerts
            }
            Err(e) => match self.cache.get_any(key) {
                Some(stale) => {
                    warn!(
                        "{}: alert fetch failed for {}: {} (serving cached list from {})",
                        location_id, key, e, stale.fetched_at
                    );
                    stale.alerts
                }
                None => {
                    warn!(
                        "{}: alert fetch failed for {}: {} (no cached list)",
                        location_id, key, e
                    );
                    Vec::new()
                }
            },
        }
    }

    async fn fetch_upstream(&self, lat: f64, lon: f64) -> Result<Vec<AlertFeature>, Error> {
        tokio::time::timeout(self.fetch_timeout, self.feed.fetch_alerts(lat, lon))
            .await
            .map_err(|_| Error::Timeout(self.fetch_timeout.as_secs()))?
    }

    /// Alerts recorded for `location_id` within the retention window.
    pub fn historical(&self, location_id: &str) -> Vec<Alert> {
        self.history.get(location_id, self.clock.now())
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn clear_historical(&self, location_id: Option<&str>) {
        self.history.clear(location_id);
    }

    pub fn register_callback(&self, key: &str, subscriber: Arc<dyn AlertSubscriber>) {
        self.registry.register(key, subscriber);
    }

    pub fn unregister_callback(&self, key: &str) {
        self.registry.unregister(key);
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Number of rounded coordinates with a cache entry, fresh or stale.
    pub fn cached_locations(&self) -> usize {
        self.cache.len()
    }

    pub fn history_locations(&self) -> usize {
        self.history.len()
    }
}
