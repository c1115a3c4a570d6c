//! # LiefClock Core
//!
//! Business logic for offline-capable clock-in/clock-out - no
//! infrastructure dependencies.
//!
//! This crate contains:
//! - Geofence evaluation and edge detection
//! - Network status monitoring
//! - Clock action submission with offline fallback
//! - Background sync of the durable action queue
//! - Passive background tracking
//! - Port/adapter interfaces (traits)
//!
//! ## Architecture Principles
//! - Only depends on `liefclock-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod clock;
pub mod geofence;
pub mod network;
pub mod observer;
pub mod sync;
pub mod tracking;

pub use clock::{ClockSubmitter, ShiftHistory, ShiftListing};
pub use geofence::{evaluate, haversine_km, GeofenceEvaluator, GeofenceObservation};
pub use network::{ConnectivityProbe, NetworkMonitor, NetworkMonitorConfig};
pub use observer::{Listeners, Subscription};
pub use sync::{ActionStore, ClockGateway, ShiftCache, SyncCoordinator, SyncCoordinatorConfig, UserDataCache};
pub use tracking::{
    BackgroundTracker, Notification, NotificationSink, PositionOptions, PositionSource,
    VisibilityObserver,
};
