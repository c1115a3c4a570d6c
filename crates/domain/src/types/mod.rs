//! Domain types and models
//!
//! Clock actions and their durable queue entries, geofence geometry,
//! server-owned shifts, sync bookkeeping, connectivity and tracking state.

pub mod action;
pub mod geo;
pub mod network;
pub mod shift;
pub mod sync;
pub mod tracking;

pub use action::{ActionKind, ActionSource, ClockAction, ClockPayload, NewPendingAction, PendingAction};
pub use geo::{Coordinates, GeofenceEvaluation, GeofenceEvent, GeofenceStatus, Position, WorkLocation};
pub use network::{ConnectivitySource, NetworkChange, NetworkEvent, NetworkStatus};
pub use shift::{ClockReceipt, Shift, ShiftRef};
pub use sync::{StorageStats, SyncEvent, SyncState, SyncStatus, SyncSummary};
pub use tracking::{PermissionState, TrackerStatus, Visibility};
