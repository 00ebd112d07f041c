//! Main application configuration
//!
//! This module defines the configuration structures for the patient-queue
//! service, including environment variable loading, TOML files and
//! validation.

use crate::queue::ranker::DEFAULT_NEXT_COUNT;
use crate::wait_time::WaitTimeConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub queue: QueueSettings,
    pub wait_time: WaitTimeConfig,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Interface the HTTP server binds to
    pub http_host: String,
    /// Port for queue boards, health and metrics
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
    /// How often waiting gauges are recomputed
    pub refresh_interval_seconds: u64,
}

/// Queue behaviour settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Upcoming tickets shown when a request does not ask for a count
    pub default_next_count: usize,
    /// Upper bound on the count a request may ask for
    pub max_next_count: usize,
    /// Quote a wait from history when registration carries none
    pub quote_missing_wait: bool,
    /// JSON array of entries to load at startup
    pub seed_file: Option<PathBuf>,
    /// Keys kept by the wait statistics tracker
    pub stats_max_entries: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "patient-queue".to_string(),
            log_level: "info".to_string(),
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            shutdown_timeout_seconds: 30,
            refresh_interval_seconds: 15,
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            default_next_count: DEFAULT_NEXT_COUNT,
            max_next_count: 50,
            quote_missing_wait: true,
            seed_file: None,
            stats_max_entries: 64,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("Invalid {} value: {}", name, value)),
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(host) = env::var("HTTP_HOST") {
            config.service.http_host = host;
        }
        if let Some(port) = parse_env("HTTP_PORT")? {
            config.service.http_port = port;
        }
        if let Some(timeout) = parse_env("SHUTDOWN_TIMEOUT_SECONDS")? {
            config.service.shutdown_timeout_seconds = timeout;
        }
        if let Some(interval) = parse_env("REFRESH_INTERVAL_SECONDS")? {
            config.service.refresh_interval_seconds = interval;
        }

        // Queue settings
        if let Some(count) = parse_env("QUEUE_DEFAULT_NEXT_COUNT")? {
            config.queue.default_next_count = count;
        }
        if let Some(count) = parse_env("QUEUE_MAX_NEXT_COUNT")? {
            config.queue.max_next_count = count;
        }
        if let Some(quote) = parse_env("QUEUE_QUOTE_MISSING_WAIT")? {
            config.queue.quote_missing_wait = quote;
        }
        if let Ok(seed) = env::var("QUEUE_SEED_FILE") {
            config.queue.seed_file = Some(PathBuf::from(seed));
        }

        // Wait time settings
        if let Some(minutes) = parse_env("WAIT_MIN_MINUTES")? {
            config.wait_time.min_wait_minutes = minutes;
        }
        if let Some(minutes) = parse_env("WAIT_MAX_MINUTES")? {
            config.wait_time.max_wait_minutes = minutes;
        }
        if let Some(multiplier) = parse_env("WAIT_STD_DEV_MULTIPLIER")? {
            config.wait_time.std_dev_multiplier = multiplier;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; missing keys take defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get metrics refresh interval as Duration
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.service.refresh_interval_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.http_port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }
    if config.service.refresh_interval_seconds == 0 {
        return Err(anyhow!("Refresh interval must be greater than 0"));
    }

    if config.queue.default_next_count == 0 {
        return Err(anyhow!("Default next count must be greater than 0"));
    }
    if config.queue.default_next_count > config.queue.max_next_count {
        return Err(anyhow!("Default next count cannot exceed max next count"));
    }
    if config.queue.stats_max_entries == 0 {
        return Err(anyhow!("Statistics capacity must be greater than 0"));
    }

    config.wait_time.validate()?;

    Ok(())
}
