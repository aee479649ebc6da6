//! Freshness cache for fetched alert lists.
//!
//! Keyed by coordinates rounded to two decimals so nearby requests share an
//! entry. Uses `DashMap` so on-demand callers and the scheduler can read
//! concurrently.

use chrono::{DateTime, Duration, Utc};
use common::Alert;
use dashmap::DashMap;

/// Default freshness window, in seconds.
pub const DEFAULT_TTL_SECS: i64 = 300;

/// Round to two decimal places, folding `-0.00` into `0.00`.
pub fn round_coordinate(value: f64) -> f64 {
    (value * 100.0).round() / 100.0 + 0.0
}

/// Cache key for a coordinate pair: `"lat,lon"` at two decimals.
pub fn cache_key(lat: f64, lon: f64) -> String {
    format!("{:.2},{:.2}", round_coordinate(lat), round_coordinate(lon))
}

/// A cached alert list with its fetch time.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub alerts: Vec<Alert>,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Fresh while strictly younger than `ttl`.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.fetched_at < ttl
    }
}

#[derive(Debug)]
pub struct AlertCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl AlertCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Entry for `key` if it is still fresh. Stale entries are left in
    /// place so they remain available as a failure fallback.
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<CacheEntry> {
        self.entries
            .get(key)
            .filter(|e| e.is_fresh(now, self.ttl))
            .map(|e| e.value().clone())
    }

    /// Entry for `key` regardless of age.
    pub fn get_any(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    pub fn put(&self, key: &str, alerts: Vec<Alert>, now: DateTime<Utc>) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                alerts,
                fetched_at: now,
            },
        );
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AlertCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TTL_SECS))
    }
}
