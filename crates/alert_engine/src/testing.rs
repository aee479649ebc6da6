//! Scripted feed and fixtures shared by the engine and scheduler tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use common::Error;
use nws_client::{AlertFeature, AlertFeed, AlertProperties};

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
}

/// An actual, currently active feature relative to `fixed_now()`.
pub fn feature(id: &str, severity: &str, certainty: &str) -> AlertFeature {
    AlertFeature {
        id: None,
        properties: AlertProperties {
            id: Some(id.to_string()),
            status: Some("Actual".into()),
            severity: Some(severity.into()),
            certainty: Some(certainty.into()),
            event: Some("Test Event".into()),
            headline: Some(format!("Headline {id}")),
            description: Some("Description".into()),
            effective: Some("2026-06-01T11:00:00Z".into()),
            expires: Some("2026-06-01T18:00:00Z".into()),
            ..AlertProperties::default()
        },
    }
}

/// Feed that replays queued responses, then falls back to `default`.
pub struct ScriptedFeed {
    queued: Mutex<VecDeque<Result<Vec<AlertFeature>, Error>>>,
    default: Vec<AlertFeature>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedFeed {
    pub fn returning(default: Vec<AlertFeature>) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            default,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, response: Result<Vec<AlertFeature>, Error>) {
        self.queued.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AlertFeed for ScriptedFeed {
    async fn fetch_alerts(&self, _lat: f64, _lon: f64) -> Result<Vec<AlertFeature>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.queued.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.default.clone()))
    }
}
