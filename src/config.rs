//! Configuration module for gator.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::{GatorError, Result};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (`sqlite://...` or `postgres://...`).
    #[serde(default = "default_db_url")]
    pub url: String,
}

fn default_db_url() -> String {
    "sqlite://data/gator.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/gator.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Aggregator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// Time between collection cycles (e.g. "1m", "30s", "1h30m").
    #[serde(default = "default_interval")]
    pub interval: String,
    /// User-Agent header sent with every feed request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds. This is the deadline for one fetch.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// Allow feeds on loopback/private addresses.
    #[serde(default)]
    pub allow_private_hosts: bool,
}

fn default_interval() -> String {
    "1m".to_string()
}

fn default_user_agent() -> String {
    "gator".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
            allow_private_hosts: false,
        }
    }
}

impl AggregatorConfig {
    /// Parse the configured interval.
    pub fn interval(&self) -> Result<Duration> {
        parse_interval(&self.interval)
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Aggregator configuration.
    #[serde(default)]
    pub aggregator: AggregatorConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(GatorError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Like [`Config::load_with_env`], but a missing file yields the defaults
    /// (with environment overrides). Any other failure, such as a TOML syntax
    /// error, is returned.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::load_with_env(path) {
            Err(GatorError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                let mut config = Self::default();
                config.apply_env_overrides();
                Ok(config)
            }
            other => other,
        }
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| GatorError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `GATOR_DATABASE_URL`: Override the database URL
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("GATOR_DATABASE_URL") {
            if !url.is_empty() {
                self.database.url = url;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if the interval is invalid or the database URL is empty.
    pub fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            return Err(GatorError::Config("database.url must be set".to_string()));
        }
        self.aggregator.interval()?;
        Ok(())
    }
}

/// Parse an interval string such as "1m", "30s", "1h30m", "1.5h" or "250ms".
///
/// Accepted units: `ns`, `us` (`µs`), `ms`, `s`, `m`, `h`. Every number needs a
/// unit and the total must be positive.
pub fn parse_interval(s: &str) -> Result<Duration> {
    let invalid = || GatorError::Config(format!("invalid interval: {s:?}"));

    let input = s.trim();
    if input.is_empty() {
        return Err(invalid());
    }
    if input.starts_with('-') {
        return Err(GatorError::Config(format!(
            "interval must be positive: {s:?}"
        )));
    }

    let mut rest = input.strip_prefix('+').unwrap_or(input);
    let mut total_nanos = 0f64;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        let value: f64 = number.parse().map_err(|_| invalid())?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let scale = match unit {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Err(invalid()),
        };

        total_nanos += value * scale;
        rest = tail;
    }

    if total_nanos < 1.0 {
        return Err(GatorError::Config(format!(
            "interval must be positive: {s:?}"
        )));
    }
    if total_nanos >= u64::MAX as f64 {
        return Err(GatorError::Config(format!("interval too large: {s:?}")));
    }

    Ok(Duration::from_nanos(total_nanos.round() as u64))
}
