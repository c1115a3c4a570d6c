//! Application constants
//!
//! Centralized defaults. Every tunable here is also exposed through
//! [`crate::config::Config`]; the constants only seed the defaults.

// Geofence
pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const DEFAULT_BUFFER_KM: f64 = 0.05;
pub const DEFAULT_RADIUS_KM: f64 = 0.1;
pub const DEFAULT_WORK_LOCATION_NAME: &str = "Work Location";

// Sync
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INTER_ACTION_DELAY_MS: u64 = 100;
pub const DEFAULT_ERROR_BACKOFF_MS: u64 = 2_000;
pub const DEFAULT_STARTUP_SYNC_DELAY_MS: u64 = 1_000;

// Network monitor
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_WAIT_FOR_ONLINE_MS: u64 = 30_000;

// Remote calls
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_GRAPHQL_PATH: &str = "/api/graphql";
pub const DEFAULT_HEALTH_PATH: &str = "/api/health-check";

// Geolocation
pub const DEFAULT_POSITION_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_POSITION_MAXIMUM_AGE_MS: u64 = 10_000;

// Optimistic references
pub const OFFLINE_ID_PREFIX: &str = "offline_";

// Local record sets
pub const STORE_OFFLINE_ACTIONS: &str = "offlineActions";
pub const STORE_CACHED_SHIFTS: &str = "cachedShifts";
pub const STORE_CACHED_USER_DATA: &str = "cachedUserData";

// User data cache keys
pub const CACHE_KEY_WORK_LOCATION: &str = "workLocation";
