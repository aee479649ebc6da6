//! Subscription registry: location key → subscriber.
//!
//! Subscribers are observers; the scheduler hands each one the alert list for
//! its key and does not care how delivery happens.

use std::fmt;
use std::sync::Arc;

use common::{Alert, AlertNotification, Error};
use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::clock::{Clock, SystemClock};

/// Receives the alert list for a subscribed location after each fetch.
pub trait AlertSubscriber: Send + Sync {
    fn notify(&self, location_key: &str, alerts: &[Alert]) -> Result<(), Error>;
}

/// Adapts a plain callback into a subscriber.
pub struct FnSubscriber<F>(F);

impl<F> FnSubscriber<F>
where
    F: Fn(&[Alert]) -> Result<(), Error> + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self(callback)
    }
}

impl<F> AlertSubscriber for FnSubscriber<F>
where
    F: Fn(&[Alert]) -> Result<(), Error> + Send + Sync,
{
    fn notify(&self, _location_key: &str, alerts: &[Alert]) -> Result<(), Error> {
        (self.0)(alerts)
    }
}

/// Publishes each delivery into an unbounded channel, stamped with the
/// subscriber's clock.
#[derive(Clone)]
pub struct ChannelSubscriber {
    tx: mpsc::UnboundedSender<AlertNotification>,
    clock: Arc<dyn Clock>,
}

impl ChannelSubscriber {
    pub fn new(tx: mpsc::UnboundedSender<AlertNotification>) -> Self {
        Self::with_clock(tx, Arc::new(SystemClock))
    }

    pub fn with_clock(
        tx: mpsc::UnboundedSender<AlertNotification>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { tx, clock }
    }

    /// A subscriber plus the receiving half.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AlertNotification>) {
        Self::channel_with_clock(Arc::new(SystemClock))
    }

    pub fn channel_with_clock(
        clock: Arc<dyn Clock>,
    ) -> (Self, mpsc::UnboundedReceiver<AlertNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::with_clock(tx, clock), rx)
    }
}

impl fmt::Debug for ChannelSubscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSubscriber")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl AlertSubscriber for ChannelSubscriber {
    fn notify(&self, location_key: &str, alerts: &[Alert]) -> Result<(), Error> {
        self.tx
            .send(AlertNotification {
                location_key: location_key.to_string(),
                alerts: alerts.to_vec(),
                delivered_at: self.clock.now(),
            })
            .map_err(|_| Error::Subscriber(format!("channel closed for {}", location_key)))
    }
}

/// At most one subscriber per key; registering again replaces it.
#[derive(Default)]
pub struct SubscriptionRegistry {
    subscribers: DashMap<String, Arc<dyn AlertSubscriber>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, key: &str, subscriber: Arc<dyn AlertSubscriber>) {
        self.subscribers.insert(key.to_string(), subscriber);
    }

    pub fn unregister(&self, key: &str) {
        self.subscribers.remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.subscribers.contains_key(key)
    }

    /// Point-in-time copy of all registrations, so delivery never runs
    /// while a map shard is locked.
    pub fn snapshot(&self) -> Vec<(String, Arc<dyn AlertSubscriber>)> {
        self.subscribers
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("keys", &self.subscribers.iter().map(|e| e.key().clone()).collect::<Vec<_>>())
            .finish()
    }
}
