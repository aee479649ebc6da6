//! Per-location historical alert window.
//!
//! Each location keeps a deduplicated, insertion-ordered list of alerts whose
//! `start_time` falls inside the retention window. Pruning is a pure function
//! of `(alerts, now, window)` and runs both on write and on read.

use chrono::{DateTime, Duration, Utc};
use common::Alert;
use dashmap::DashMap;

/// Default retention window, in hours.
pub const DEFAULT_RETENTION_HOURS: i64 = 24;

/// Merge `incoming` into `existing` by `id`. A colliding id is replaced in
/// its original position by the newer copy; new ids are appended.
pub fn merge_by_id(existing: &mut Vec<Alert>, incoming: &[Alert]) {
    for alert in incoming {
        match existing.iter_mut().find(|a| a.id == alert.id) {
            Some(slot) => *slot = alert.clone(),
            None => existing.push(alert.clone()),
        }
    }
}

/// Whether `alert` is still inside the window. Age equal to the window is
/// already out.
pub fn within_window(alert: &Alert, now: DateTime<Utc>, window: Duration) -> bool {
    now - alert.start_time < window
}

pub fn prune(alerts: &mut Vec<Alert>, now: DateTime<Utc>, window: Duration) {
    alerts.retain(|a| within_window(a, now, window));
}

#[derive(Debug)]
pub struct HistoricalStore {
    sets: DashMap<String, Vec<Alert>>,
    window: Duration,
}

impl HistoricalStore {
    pub fn new(window: Duration) -> Self {
        Self {
            sets: DashMap::new(),
            window,
        }
    }

    /// Merge `alerts` into the set for `location_id`, then prune by age.
    pub fn record(&self, location_id: &str, alerts: &[Alert], now: DateTime<Utc>) {
        let mut set = self.sets.entry(location_id.to_string()).or_default();
        merge_by_id(&mut set, alerts);
        prune(&mut set, now, self.window);
    }

    /// Alerts for `location_id` still inside the window at `now`.
    pub fn get(&self, location_id: &str, now: DateTime<Utc>) -> Vec<Alert> {
        self.sets
            .get(location_id)
            .map(|set| {
                set.iter()
                    .filter(|a| within_window(a, now, self.window))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Clear one location, or every location when `location_id` is `None`.
    pub fn clear(&self, location_id: Option<&str>) {
        match location_id {
            Some(id) => {
                self.sets.remove(id);
            }
            None => self.sets.clear(),
        }
    }

    /// Number of locations with a history set.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

impl Default for HistoricalStore {
    fn default() -> Self {
        Self::new(Duration::hours(DEFAULT_RETENTION_HOURS))
    }
}
