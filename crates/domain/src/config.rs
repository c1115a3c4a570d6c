//! Configuration structures
//!
//! Loaded by `liefclock_infra::config`. Every section falls back to its
//! defaults when absent so partial files are accepted.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BUFFER_KM, DEFAULT_ERROR_BACKOFF_MS, DEFAULT_GRAPHQL_PATH, DEFAULT_HEALTH_PATH,
    DEFAULT_INTER_ACTION_DELAY_MS, DEFAULT_MAX_RETRIES, DEFAULT_POSITION_MAXIMUM_AGE_MS,
    DEFAULT_POSITION_TIMEOUT_MS, DEFAULT_PROBE_INTERVAL_SECS, DEFAULT_PROBE_TIMEOUT_MS,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_STARTUP_SYNC_DELAY_MS,
};
use crate::errors::{LiefClockError, Result};
use crate::types::WorkLocation;

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub sync: SyncConfig,
    pub network: NetworkConfig,
    pub geofence: GeofenceConfig,
    pub tracking: TrackingConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values the runtime cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.database.pool_size == 0 {
            return Err(LiefClockError::Config("database.pool_size must be at least 1".into()));
        }
        if self.server.base_url.trim().is_empty() {
            return Err(LiefClockError::Config("server.base_url must not be empty".into()));
        }
        if self.sync.max_retries == 0 {
            return Err(LiefClockError::Config("sync.max_retries must be at least 1".into()));
        }
        if !self.geofence.buffer_km.is_finite() || self.geofence.buffer_km < 0.0 {
            return Err(LiefClockError::Config("geofence.buffer_km must be >= 0".into()));
        }
        if let Some(location) = &self.geofence.work_location {
            location.validate()?;
        }
        Ok(())
    }
}

/// Local durable store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "liefclock.db".to_string(), pool_size: 4 }
    }
}

/// Remote GraphQL server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub graphql_path: String,
    pub health_path: String,
    pub request_timeout_ms: u64,
    /// Bearer token handed over by the authentication collaborator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            graphql_path: DEFAULT_GRAPHQL_PATH.to_string(),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            access_token: None,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Background sync coordinator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub max_retries: u32,
    pub inter_action_delay_ms: u64,
    pub error_backoff_ms: u64,
    pub startup_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            inter_action_delay_ms: DEFAULT_INTER_ACTION_DELAY_MS,
            error_backoff_ms: DEFAULT_ERROR_BACKOFF_MS,
            startup_delay_ms: DEFAULT_STARTUP_SYNC_DELAY_MS,
        }
    }
}

impl SyncConfig {
    pub fn inter_action_delay(&self) -> Duration {
        Duration::from_millis(self.inter_action_delay_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }
}

/// Network status monitor settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub probe_interval_secs: u64,
    pub probe_timeout_ms: u64,
    /// Initial state before the host or the first probe reports anything.
    pub assume_online: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            probe_interval_secs: DEFAULT_PROBE_INTERVAL_SECS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            assume_online: true,
        }
    }
}

impl NetworkConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs.max(1))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Geofence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeofenceConfig {
    pub buffer_km: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_location: Option<WorkLocation>,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self { buffer_km: DEFAULT_BUFFER_KM, work_location: None }
    }
}

/// Passive background tracking settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub enabled: bool,
    pub high_accuracy: bool,
    pub position_timeout_ms: u64,
    pub maximum_age_ms: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            high_accuracy: true,
            position_timeout_ms: DEFAULT_POSITION_TIMEOUT_MS,
            maximum_age_ms: DEFAULT_POSITION_MAXIMUM_AGE_MS,
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_tunables() {
        let config = Config::default();
        assert_eq!(config.sync.max_retries, 3);
        assert_eq!(config.sync.inter_action_delay(), Duration::from_millis(100));
        assert_eq!(config.network.probe_interval(), Duration::from_secs(30));
        assert!((config.geofence.buffer_km - 0.05).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
[sync]
max_retries = 5

[geofence.work_location]
latitude = 10.0
longitude = 10.0
"#,
        )
        .unwrap();

        assert_eq!(config.sync.max_retries, 5);
        assert_eq!(config.sync.inter_action_delay_ms, 100);
        let location = config.geofence.work_location.unwrap();
        assert!((location.radius_km - 0.1).abs() < f64::EPSILON);
        assert_eq!(location.name, "Work Location");
    }

    #[test]
    fn validate_rejects_zero_retries_and_negative_buffer() {
        let mut config = Config::default();
        config.sync.max_retries = 0;
        assert!(matches!(config.validate(), Err(LiefClockError::Config(_))));

        let mut config = Config::default();
        config.geofence.buffer_km = -0.1;
        assert!(matches!(config.validate(), Err(LiefClockError::Config(_))));
    }

    #[test]
    fn validate_rejects_non_positive_radius() {
        let mut config = Config::default();
        config.geofence.work_location = Some(WorkLocation::new(1.0, 1.0, 0.0));
        assert!(config.validate().is_err());
    }
}
