//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files and
//! the environment.

use std::io::Write;
use std::sync::Mutex;

use liefclock_domain::LiefClockError;
use liefclock_infra::config;
use once_cell::sync::Lazy;
use tempfile::NamedTempFile;

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

fn write_config(contents: &str, extension: &str) -> std::path::PathBuf {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(contents.as_bytes()).expect("Failed to write to temp file");
    let path = temp_file.path().with_extension(extension);
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");
    path
}

#[test]
fn test_load_config_from_json_file() {
    let json_content = r#"{
        "database": { "path": "/tmp/integration_test.db", "pool_size": 2 },
        "server": {
            "base_url": "https://clock.example.com",
            "request_timeout_ms": 4000,
            "access_token": "secret"
        },
        "sync": { "max_retries": 5, "inter_action_delay_ms": 50 },
        "network": { "probe_interval_secs": 10, "assume_online": false },
        "geofence": {
            "buffer_km": 0.03,
            "work_location": { "latitude": 52.37, "longitude": 4.89, "radius_km": 0.2, "name": "HQ" }
        },
        "tracking": { "enabled": true, "high_accuracy": false },
        "logging": { "level": "debug", "json": true }
    }"#;
    let path = write_config(json_content, "json");

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(&path).ok();
    let config = result.expect("config loads from JSON file");

    assert_eq!(config.database.path, "/tmp/integration_test.db");
    assert_eq!(config.database.pool_size, 2);
    assert_eq!(config.server.base_url, "https://clock.example.com");
    assert_eq!(config.server.graphql_path, "/api/graphql");
    assert_eq!(config.server.request_timeout().as_millis(), 4000);
    assert_eq!(config.server.access_token.as_deref(), Some("secret"));
    assert_eq!(config.sync.max_retries, 5);
    assert_eq!(config.sync.error_backoff_ms, 2000);
    assert!(!config.network.assume_online);
    let location = config.geofence.work_location.as_ref().expect("work location");
    assert_eq!(location.name, "HQ");
    assert!(config.tracking.enabled);
    assert!(config.logging.json);
    config.validate().expect("loaded config is valid");
}

#[test]
fn test_invalid_values_fail_validation() {
    let toml_content = r#"
[database]
pool_size = 4

[geofence.work_location]
latitude = 52.37
longitude = 4.89
radius_km = 0.0
"#;
    let path = write_config(toml_content, "toml");

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(&path).ok();

    let config = result.expect("file parses");
    assert!(matches!(config.validate(), Err(LiefClockError::Config(_))));
}

#[test]
fn test_load_prefers_environment_and_validates() {
    let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

    std::env::set_var("LIEFCLOCK_SERVER_URL", "http://localhost:4000");
    std::env::set_var("LIEFCLOCK_DB_PATH", "/tmp/env.db");
    let loaded = config::load();

    std::env::set_var("LIEFCLOCK_SYNC_MAX_RETRIES", "0");
    let rejected = config::load();

    std::env::remove_var("LIEFCLOCK_SERVER_URL");
    std::env::remove_var("LIEFCLOCK_DB_PATH");
    std::env::remove_var("LIEFCLOCK_SYNC_MAX_RETRIES");

    let config = loaded.expect("config loads from env");
    assert_eq!(config.server.base_url, "http://localhost:4000");
    assert_eq!(config.database.path, "/tmp/env.db");
    assert!(matches!(rejected, Err(LiefClockError::Config(_))));
}
