//! Application configuration
//!
//! Read from a TOML file (`~/.config/hotel-reservations/config.toml` by
//! default). Every section and field is optional and falls back to its
//! default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::events::{DispatcherConfig, PublisherKind};
use crate::infrastructure::DatabaseConfig;
use crate::shared::errors::InfraError;
use crate::shared::retry::RetryConfig;

/// Environment variable that replaces `database.url`
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hotel-reservations")
        .join("config.toml")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub outbox: OutboxConfig,
    pub events: EventsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds to wait for in-flight work on shutdown
    pub shutdown_timeout: u64,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout: 30,
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive; `RUST_LOG` wins when set
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Outbox dispatcher and redelivery backoff
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboxConfig {
    pub poll_interval_ms: u64,
    pub batch_size: u64,
    /// Deliveries tried before a message is dead-lettered
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_secs: u64,
    /// Seconds a fresh event is left to the post-commit fast path before
    /// the dispatcher may pick it up
    pub fast_path_grace_secs: u64,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            batch_size: 50,
            max_attempts: 8,
            initial_backoff_ms: 1_000,
            backoff_multiplier: 2.0,
            max_backoff_secs: 300,
            fast_path_grace_secs: 30,
        }
    }
}

impl OutboxConfig {
    pub fn backoff(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts.max(1),
            initial_delay: Duration::from_millis(self.initial_backoff_ms),
            backoff_multiplier: self.backoff_multiplier.max(1.0),
            max_delay: Duration::from_secs(self.max_backoff_secs),
        }
    }

    pub fn dispatcher(&self) -> DispatcherConfig {
        DispatcherConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(10)),
            batch_size: self.batch_size.max(1),
            backoff: self.backoff(),
        }
    }

    pub fn fast_path_grace(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.fast_path_grace_secs.min(i64::MAX as u64) as i64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub publisher: PublisherKind,
    pub topic: String,
    pub bus_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            publisher: PublisherKind::Log,
            topic: "reservation-events".to_string(),
            bus_capacity: 1024,
        }
    }
}

impl AppConfig {
    /// Read and parse a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, InfraError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, InfraError> {
        toml::from_str(content).map_err(|e| InfraError::Config(e.to_string()))
    }

    /// Effective configuration as TOML, e.g. for `--check`
    pub fn to_toml(&self) -> Result<String, InfraError> {
        toml::to_string_pretty(self).map_err(|e| InfraError::Config(e.to_string()))
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.database.url = url;
            }
        }
    }
}
