//! JSONL notification journal and the per-location subscriber that feeds it.

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use alert_engine::AlertSubscriber;
use chrono::{SecondsFormat, Utc};
use common::{Alert, AlertSeverity, Error};
use serde_json::json;
use tracing::{info, warn};

pub type SharedJournal = Arc<Mutex<AlertJournal>>;

/// Append-only daily JSONL file (`alerts-YYYY-MM-DD.jsonl`).
pub struct AlertJournal {
    dir: PathBuf,
    day_key: String,
    file: File,
}

impl AlertJournal {
    pub fn open(dir: PathBuf) -> std::io::Result<Self> {
        create_dir_all(&dir)?;
        let day_key = Utc::now().format("%Y-%m-%d").to_string();
        let file = Self::open_day_file(&dir, &day_key)?;
        Ok(Self { dir, day_key, file })
    }

    fn open_day_file(dir: &Path, day_key: &str) -> std::io::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(format!("alerts-{}.jsonl", day_key)))
    }

    fn rotate_if_needed(&mut self) -> std::io::Result<()> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        if today != self.day_key {
            self.file = Self::open_day_file(&self.dir, &today)?;
            self.day_key = today;
        }
        Ok(())
    }

    pub fn write_event(&mut self, event: &serde_json::Value) -> std::io::Result<()> {
        self.rotate_if_needed()?;
        writeln!(self.file, "{}", serde_json::to_string(event)?)?;
        self.file.flush()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn count(alerts: &[Alert], severity: AlertSeverity) -> usize {
    alerts.iter().filter(|a| a.severity == severity).count()
}

/// Logs each delivery and, when a journal is configured, appends it.
pub struct LocationSubscriber {
    name: String,
    journal: Option<SharedJournal>,
}

impl LocationSubscriber {
    pub fn new(name: impl Into<String>, journal: Option<SharedJournal>) -> Self {
        Self {
            name: name.into(),
            journal,
        }
    }
}

impl AlertSubscriber for LocationSubscriber {
    fn notify(&self, location_key: &str, alerts: &[Alert]) -> Result<(), Error> {
        let warnings = count(alerts, AlertSeverity::Warning);
        let watches = count(alerts, AlertSeverity::Watch);
        let advisories = count(alerts, AlertSeverity::Advisory);

        if alerts.is_empty() {
            info!("{} [{}]: no active alerts", self.name, location_key);
        } else {
            info!(
                "{} [{}]: {} warnings, {} watches, {} advisories",
                self.name, location_key, warnings, watches, advisories
            );
            for alert in alerts {
                info!("  → {} {} (until {})", alert.severity, alert.headline, alert.end_time);
            }
        }

        let Some(journal) = &self.journal else {
            return Ok(());
        };

        let event = json!({
            "ts": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "kind": "alert_notification",
            "location": &self.name,
            "location_key": location_key,
            "warnings": warnings,
            "watches": watches,
            "advisories": advisories,
            "alerts": alerts,
        });

        let mut guard = journal
            .lock()
            .map_err(|_| Error::Subscriber("journal lock poisoned".into()))?;
        guard.write_event(&event).map_err(|e| {
            warn!("Alert journal write failed: {}", e);
            Error::Io(e)
        })
    }
}
