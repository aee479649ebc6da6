//! Periodic polling of subscribed locations.
//!
//! Each tick snapshots the registry, parses every key as `"lat,lon"`, fetches
//! through the engine and hands the result to the key's subscriber. A bad
//! key, a failing subscriber or a panicking one only affects its own entry.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{Alert, Error};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::engine::AlertEngine;
use crate::registry::AlertSubscriber;

/// Default scheduler period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);

/// Parse a subscription key of the form `"lat,lon"`. Both parts must be
/// finite numbers.
pub fn parse_location_key(key: &str) -> Option<(f64, f64)> {
    let (lat, lon) = key.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    (lat.is_finite() && lon.is_finite()).then_some((lat, lon))
}

/// Outcome counts for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub subscriptions: usize,
    pub skipped: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Resets the in-flight flag when a tick finishes or unwinds.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Hand `alerts` to one subscriber. A panic inside `notify` is caught and
/// reported as an error for this entry only.
fn deliver(subscriber: &dyn AlertSubscriber, key: &str, alerts: &[Alert]) -> Result<(), Error> {
    catch_unwind(AssertUnwindSafe(|| subscriber.notify(key, alerts))).unwrap_or_else(|payload| {
        error!("{}: subscriber panicked: {}", key, panic_message(payload.as_ref()));
        Err(Error::Subscriber(format!("subscriber for {} panicked", key)))
    })
}

pub struct Scheduler {
    engine: Arc<AlertEngine>,
    period: Duration,
    running: AtomicBool,
}

impl Scheduler {
    pub fn new(engine: Arc<AlertEngine>, period: Duration) -> Self {
        Self {
            engine,
            period,
            running: AtomicBool::new(false),
        }
    }

    /// Run one pass over the registry. Returns `None` without doing any work
    /// if another tick is still in flight.
    pub async fn tick(&self) -> Option<TickSummary> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Previous alert tick still running; skipping this one");
            return None;
        }
        let _in_flight = InFlight(&self.running);

        let entries = self.engine.registry().snapshot();
        let mut summary = TickSummary {
            subscriptions: entries.len(),
            ..TickSummary::default()
        };

        for (key, subscriber) in entries {
            let Some((lat, lon)) = parse_location_key(&key) else {
                debug!("Skipping subscription with unparseable key {:?}", key);
                summary.skipped += 1;
                continue;
            };

            let alerts = self.engine.fetch_active(lat, lon, &key).await;
            match deliver(subscriber.as_ref(), &key, &alerts) {
                Ok(()) => summary.delivered += 1,
                Err(e) => {
                    warn!("{}: subscriber failed: {}", key, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Alert tick: {} subscriptions, {} delivered, {} skipped, {} failed",
            summary.subscriptions, summary.delivered, summary.skipped, summary.failed
        );
        Some(summary)
    }

    /// Tick forever on the configured period. The first tick fires
    /// immediately; late ticks are skipped rather than bunched up.
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            self.tick().await;
        }
    }
}
