//! Configuration loader
//!
//! `LIEFCLOCK_*` environment variables win; when a required one is missing the
//! loader falls back to the first `config.{json,toml}` or
//! `liefclock.{json,toml}` found next to the working directory (or up to two
//! levels above it) or next to the executable. Either way the result is
//! validated before it is returned.
//!
//! Required: `LIEFCLOCK_SERVER_URL`, `LIEFCLOCK_DB_PATH`.
//!
//! Optional:
//! - `LIEFCLOCK_DB_POOL_SIZE`, `LIEFCLOCK_ACCESS_TOKEN`, `LIEFCLOCK_REQUEST_TIMEOUT_MS`
//! - `LIEFCLOCK_SYNC_MAX_RETRIES`, `LIEFCLOCK_SYNC_DELAY_MS`
//! - `LIEFCLOCK_PROBE_INTERVAL_SECS`, `LIEFCLOCK_ASSUME_ONLINE`
//! - `LIEFCLOCK_GEOFENCE_BUFFER_KM`
//! - `LIEFCLOCK_WORK_LAT` + `LIEFCLOCK_WORK_LNG` (set together),
//!   `LIEFCLOCK_WORK_RADIUS_KM`, `LIEFCLOCK_WORK_NAME`
//! - `LIEFCLOCK_TRACKING_ENABLED`
//! - `LIEFCLOCK_LOG_LEVEL`, `LIEFCLOCK_LOG_JSON`

use std::path::{Path, PathBuf};
use std::str::FromStr;

use liefclock_domain::constants::DEFAULT_RADIUS_KM;
use liefclock_domain::{Config, LiefClockError, Result, WorkLocation};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `LiefClockError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A value fails validation
pub fn load() -> Result<Config> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)?
        }
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// Required variables must be present; optional ones fall back to the
/// defaults of [`Config`].
///
/// # Errors
/// Returns `LiefClockError::Config` if required variables are missing
/// or any variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.server.base_url = env_var("LIEFCLOCK_SERVER_URL")?;
    config.database.path = env_var("LIEFCLOCK_DB_PATH")?;

    if let Some(pool_size) = env_parse("LIEFCLOCK_DB_POOL_SIZE")? {
        config.database.pool_size = pool_size;
    }
    config.server.access_token =
        std::env::var("LIEFCLOCK_ACCESS_TOKEN").ok().filter(|token| !token.is_empty());
    if let Some(timeout) = env_parse("LIEFCLOCK_REQUEST_TIMEOUT_MS")? {
        config.server.request_timeout_ms = timeout;
    }

    if let Some(max_retries) = env_parse("LIEFCLOCK_SYNC_MAX_RETRIES")? {
        config.sync.max_retries = max_retries;
    }
    if let Some(delay) = env_parse("LIEFCLOCK_SYNC_DELAY_MS")? {
        config.sync.inter_action_delay_ms = delay;
    }

    if let Some(interval) = env_parse("LIEFCLOCK_PROBE_INTERVAL_SECS")? {
        config.network.probe_interval_secs = interval;
    }
    config.network.assume_online = env_bool("LIEFCLOCK_ASSUME_ONLINE", config.network.assume_online);

    if let Some(buffer) = env_parse("LIEFCLOCK_GEOFENCE_BUFFER_KM")? {
        config.geofence.buffer_km = buffer;
    }
    config.geofence.work_location = work_location_from_env()?;

    config.tracking.enabled = env_bool("LIEFCLOCK_TRACKING_ENABLED", config.tracking.enabled);

    if let Ok(level) = std::env::var("LIEFCLOCK_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("LIEFCLOCK_LOG_JSON", config.logging.json);

    Ok(config)
}

/// Load configuration from a file
///
/// With `None` the standard locations are probed (see
/// [`probe_config_paths`]). The format follows the file extension.
///
/// # Errors
/// Returns `LiefClockError::Config` when the file is missing, unreadable or
/// malformed, or when no file is found in the standard locations.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) if p.exists() => p,
        Some(p) => {
            return Err(LiefClockError::Config(format!("Config file not found: {}", p.display())))
        }
        None => probe_config_paths().ok_or_else(|| {
            LiefClockError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path).map_err(|e| {
        LiefClockError::Config(format!("Failed to read {}: {e}", config_path.display()))
    })?;

    parse_config(&contents, &config_path)
}

/// Supported config file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    /// Files without an extension are read as JSON.
    fn of(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            None | Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            Some(other) => {
                Err(LiefClockError::Config(format!("Unsupported config format: {other}")))
            }
        }
    }
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    match Format::of(path)? {
        Format::Toml => toml::from_str(contents)
            .map_err(|e| LiefClockError::Config(format!("Invalid TOML format: {e}"))),
        Format::Json => serde_json::from_str(contents)
            .map_err(|e| LiefClockError::Config(format!("Invalid JSON format: {e}"))),
    }
}

const CONFIG_FILE_NAMES: [&str; 4] =
    ["config.json", "config.toml", "liefclock.json", "liefclock.toml"];

/// First existing config file in the standard locations, if any.
pub fn probe_config_paths() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok();
    let exe_dir =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf));

    let mut dirs: Vec<PathBuf> = Vec::new();
    if let Some(cwd) = cwd {
        dirs.extend(cwd.ancestors().take(3).map(Path::to_path_buf));
    }
    dirs.extend(exe_dir);

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

fn work_location_from_env() -> Result<Option<WorkLocation>> {
    let lat: Option<f64> = env_parse("LIEFCLOCK_WORK_LAT")?;
    let lng: Option<f64> = env_parse("LIEFCLOCK_WORK_LNG")?;

    match (lat, lng) {
        (Some(lat), Some(lng)) => {
            let mut location = WorkLocation::new(lat, lng, DEFAULT_RADIUS_KM);
            if let Some(radius) = env_parse("LIEFCLOCK_WORK_RADIUS_KM")? {
                location.radius_km = radius;
            }
            if let Ok(name) = std::env::var("LIEFCLOCK_WORK_NAME") {
                location = location.with_name(name);
            }
            Ok(Some(location))
        }
        (None, None) => Ok(None),
        _ => Err(LiefClockError::Config(
            "LIEFCLOCK_WORK_LAT and LIEFCLOCK_WORK_LNG must be set together".to_string(),
        )),
    }
}

/// Get required environment variable
///
/// # Errors
/// Returns `LiefClockError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        LiefClockError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Parse an optional environment variable.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| LiefClockError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
