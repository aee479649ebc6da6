//! alert-monitor: severe-weather alert polling service.
//!
//! Single-binary Tokio application that:
//! 1. Registers each configured location with the alert engine
//! 2. Polls the NWS active-alerts feed for them on a fixed schedule
//! 3. Logs (and optionally journals) every location's active alerts

mod config;
mod journal;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alert_engine::{AlertEngine, EngineSettings, Scheduler};
use clap::Parser;
use common::MonitorConfig;
use nws_client::NwsClient;
use tracing::{error, info};

use crate::journal::{AlertJournal, LocationSubscriber, SharedJournal};

/// Severe Weather Alert Monitor
#[derive(Parser)]
#[command(name = "alert-monitor", about = "Severe weather alert monitor")]
struct Cli {
    /// Check that the alert feed is reachable, then exit.
    #[arg(long)]
    check_feed: bool,

    /// Run a single polling tick over the configured locations and exit.
    #[arg(long)]
    once: bool,
}

fn open_journal(cfg: &MonitorConfig) -> Option<SharedJournal> {
    let dir = cfg.journal_dir.as_ref()?;
    match AlertJournal::open(PathBuf::from(dir)) {
        Ok(j) => {
            info!("Alert journal path: {}", j.dir().display());
            Some(Arc::new(Mutex::new(j)))
        }
        Err(e) => {
            error!("Failed to initialize alert journal: {}", e);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "alert_monitor=info,alert_engine=info,nws_client=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("Alert monitor starting up...");

    // Load configuration.
    let cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!("Feed: {}", cfg.feed.base_url);
    info!(
        "Locations: {:?}",
        cfg.locations.iter().map(|l| &l.name).collect::<Vec<_>>()
    );
    info!(
        "Timing: poll={}s, cache_ttl={}s, retention={}h, fetch_timeout={}s",
        cfg.timing.poll_interval_secs,
        cfg.timing.cache_ttl_secs,
        cfg.timing.retention_hours,
        cfg.feed.fetch_timeout_secs,
    );

    let nws = match NwsClient::new(&cfg.feed) {
        Ok(c) => c,
        Err(e) => {
            error!("Feed client initialization failed: {}", e);
            std::process::exit(1);
        }
    };

    // ── Check-feed mode ──────────────────────────────────────────────
    if cli.check_feed {
        info!("Running feed health check...");
        match nws.health_check().await {
            Ok(()) => info!("✅ Alert feed reachable: {}", cfg.feed.base_url),
            Err(e) => {
                error!("❌ Alert feed check failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    // ── Shared state ─────────────────────────────────────────────────
    let engine = Arc::new(AlertEngine::new(
        Arc::new(nws),
        EngineSettings::from_config(&cfg),
    ));
    let journal = open_journal(&cfg);

    for loc in &cfg.locations {
        engine.register_callback(
            &loc.key(),
            Arc::new(LocationSubscriber::new(loc.name.clone(), journal.clone())),
        );
    }
    info!("Registered {} locations", engine.registry().len());

    let scheduler = Arc::new(Scheduler::new(
        engine.clone(),
        Duration::from_secs(cfg.timing.poll_interval_secs),
    ));

    // ── Single-tick mode ─────────────────────────────────────────────
    if cli.once {
        info!("Running single polling tick...");
        if let Some(summary) = scheduler.tick().await {
            info!(
                "Tick complete: {} delivered, {} skipped, {} failed",
                summary.delivered, summary.skipped, summary.failed
            );
        }
        return;
    }

    // ── Spawn tasks ──────────────────────────────────────────────────
    info!("Spawning tasks...");

    // Task 1: Alert polling
    let scheduler_handle = tokio::spawn(scheduler.clone().run());

    // Task 2: Heartbeat
    let hb_engine = engine.clone();
    let hb_interval = Duration::from_secs(cfg.timing.heartbeat_interval_secs);
    let hb_poll = cfg.timing.poll_interval_secs;
    let heartbeat_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(hb_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            info!(
                "HEARTBEAT: subscriptions={} cached={} history={} poll={}s",
                hb_engine.registry().len(),
                hb_engine.cached_locations(),
                hb_engine.history_locations(),
                hb_poll
            );
        }
    });

    // ── Wait for shutdown ────────────────────────────────────────────
    info!("🚀 Alert monitor is running. Press Ctrl+C to stop.");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        r = scheduler_handle => {
            error!("Scheduler task exited: {:?}", r);
        }
        r = heartbeat_handle => {
            error!("Heartbeat task exited: {:?}", r);
        }
    }

    info!("Alert monitor shut down.");
}
