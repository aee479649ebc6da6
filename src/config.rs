//! Configuration loader — merges env vars, .env file, and config.toml.

use std::path::PathBuf;

use alert_engine::{MAX_CACHE_TTL_SECS, MAX_RETENTION_HOURS};
use common::{Error, MonitorConfig, Result};

/// Upper bound for timeouts and task periods (one day).
const MAX_PERIOD_SECS: u64 = 86_400;

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn config_path() -> PathBuf {
    std::env::var("ALERT_MONITOR_CONFIG")
        .ok()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

fn check_range(issues: &mut Vec<String>, name: &str, value: u64, max: u64) {
    if value == 0 {
        issues.push(format!("{name} must be > 0"));
    } else if value > max {
        issues.push(format!("{name} must be <= {max}"));
    }
}

pub fn validate_config(config: &MonitorConfig) -> Result<()> {
    let mut issues: Vec<String> = Vec::new();

    let base_url = config.feed.base_url.trim();
    if base_url.is_empty() {
        issues.push("feed.base_url is required".into());
    } else if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        issues.push("feed.base_url must start with http:// or https://".into());
    }
    if config.feed.user_agent.trim().is_empty() {
        issues.push("feed.user_agent must not be empty".into());
    }
    check_range(
        &mut issues,
        "feed.fetch_timeout_secs",
        config.feed.fetch_timeout_secs,
        MAX_PERIOD_SECS,
    );
    check_range(
        &mut issues,
        "feed.health_timeout_secs",
        config.feed.health_timeout_secs,
        MAX_PERIOD_SECS,
    );

    let timing = &config.timing;
    check_range(&mut issues, "timing.poll_interval_secs", timing.poll_interval_secs, MAX_PERIOD_SECS);
    check_range(&mut issues, "timing.cache_ttl_secs", timing.cache_ttl_secs, MAX_CACHE_TTL_SECS);
    check_range(&mut issues, "timing.retention_hours", timing.retention_hours, MAX_RETENTION_HOURS);
    check_range(
        &mut issues,
        "timing.heartbeat_interval_secs",
        timing.heartbeat_interval_secs,
        MAX_PERIOD_SECS,
    );

    for loc in &config.locations {
        if !alert_engine::valid_coordinates(loc.lat, loc.lon) {
            issues.push(format!(
                "locations.{}: ({}, {}) is not a valid coordinate",
                loc.name, loc.lat, loc.lon
            ));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load monitor configuration from environment and optional config file.
pub fn load_config() -> Result<MonitorConfig> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults, or config.toml if it exists.
    let mut config = MonitorConfig::default();
    let path = config_path();
    if path.exists() {
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    }

    // 3. Override with environment variables (highest priority).
    if let Ok(url) = std::env::var("NWS_BASE_URL") {
        config.feed.base_url = url.trim().to_string();
    }
    if let Ok(ua) = std::env::var("NWS_USER_AGENT") {
        config.feed.user_agent = ua;
    }
    if let Ok(raw) = std::env::var("ALERT_FETCH_TIMEOUT_SECS") {
        config.feed.fetch_timeout_secs = parse_positive_u64(&raw, "ALERT_FETCH_TIMEOUT_SECS")?;
    }
    if let Ok(raw) = std::env::var("ALERT_POLL_INTERVAL_SECS") {
        config.timing.poll_interval_secs = parse_positive_u64(&raw, "ALERT_POLL_INTERVAL_SECS")?;
    }
    if let Ok(raw) = std::env::var("ALERT_CACHE_TTL_SECS") {
        config.timing.cache_ttl_secs = parse_positive_u64(&raw, "ALERT_CACHE_TTL_SECS")?;
    }
    if let Ok(raw) = std::env::var("ALERT_RETENTION_HOURS") {
        config.timing.retention_hours = parse_positive_u64(&raw, "ALERT_RETENTION_HOURS")?;
    }
    if let Ok(dir) = std::env::var("ALERT_JOURNAL_DIR") {
        let trimmed = dir.trim();
        config.journal_dir = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    // 4. Validate.
    validate_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::LocationConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&MonitorConfig::default()).is_ok());
    }

    #[test]
    fn test_missing_base_url_is_fatal() {
        let mut cfg = MonitorConfig::default();
        cfg.feed.base_url = "  ".into();
        let err = validate_config(&cfg).unwrap_err().to_string();
        assert!(err.contains("feed.base_url is required"), "{err}");
    }

    #[test]
    fn test_collects_every_issue() {
        let mut cfg = MonitorConfig::default();
        cfg.feed.base_url = "ftp://example.com".into();
        cfg.timing.poll_interval_secs = 0;
        cfg.locations.push(LocationConfig {
            name: "Nowhere".into(),
            lat: 123.0,
            lon: 0.0,
        });
        let err = validate_config(&cfg).unwrap_err().to_string();
        assert!(err.contains("must start with http"), "{err}");
        assert!(err.contains("timing.poll_interval_secs"), "{err}");
        assert!(err.contains("locations.Nowhere"), "{err}");
    }

    #[test]
    fn test_out_of_range_durations_are_rejected() {
        let mut cfg = MonitorConfig::default();
        cfg.timing.retention_hours = 3_000_000_000;
        cfg.timing.cache_ttl_secs = u64::MAX;
        cfg.timing.poll_interval_secs = MAX_PERIOD_SECS + 1;
        let err = validate_config(&cfg).unwrap_err().to_string();
        assert!(err.contains("timing.retention_hours must be <= 8760"), "{err}");
        assert!(err.contains("timing.cache_ttl_secs must be <= 86400"), "{err}");
        assert!(err.contains("timing.poll_interval_secs must be <= 86400"), "{err}");

        cfg.timing.retention_hours = MAX_RETENTION_HOURS;
        cfg.timing.cache_ttl_secs = MAX_CACHE_TTL_SECS;
        cfg.timing.poll_interval_secs = MAX_PERIOD_SECS;
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn test_parse_positive_u64() {
        assert_eq!(parse_positive_u64(" 30 ", "X").unwrap(), 30);
        assert!(parse_positive_u64("0", "X").is_err());
        assert!(parse_positive_u64("-5", "X").is_err());
        assert!(parse_positive_u64("soon", "X").is_err());
    }

    #[test]
    fn test_toml_config_parses() {
        let raw = r#"
            journal_dir = "journal"

            [feed]
            base_url = "https://api.weather.gov"

            [timing]
            poll_interval_secs = 120

            [[locations]]
            name = "Chicago"
            lat = 41.88
            lon = -87.63
        "#;
        let cfg: MonitorConfig = toml::from_str(raw).expect("toml should parse");
        assert_eq!(cfg.timing.poll_interval_secs, 120);
        assert_eq!(cfg.timing.cache_ttl_secs, 300);
        assert_eq!(cfg.locations.len(), 1);
        assert_eq!(cfg.locations[0].key(), "41.88,-87.63");
        assert_eq!(cfg.journal_dir.as_deref(), Some("journal"));
        assert!(validate_config(&cfg).is_ok());
    }
}
