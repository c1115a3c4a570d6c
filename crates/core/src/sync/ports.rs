//! Port interfaces for the durable queue and the remote clock endpoint

use async_trait::async_trait;
use liefclock_domain::{ActionKind, ClockPayload, NewPendingAction, PendingAction, Result, Shift, ShiftRef};
use serde_json::Value;

/// Durable store for pending clock actions.
///
/// Every call is its own transaction and is durable once it returns `Ok`.
/// Storage failures surface as `LiefClockError::Storage`; the store never
/// retries on its own.
#[async_trait]
pub trait ActionStore: Send + Sync {
    /// Persist an action and return its newly assigned id.
    async fn add_action(&self, action: &NewPendingAction) -> Result<i64>;

    /// Snapshot of unsynced actions, oldest first.
    async fn pending_actions(&self) -> Result<Vec<PendingAction>>;

    /// Mark an action as accepted by the server. Returns `false` for unknown ids.
    async fn mark_synced(&self, id: i64) -> Result<bool>;

    /// Record a failed attempt and return the new retry count.
    async fn increment_retry(&self, id: i64) -> Result<u32>;

    /// Delete synced actions and return how many were removed.
    async fn clear_synced(&self) -> Result<usize>;

    async fn get_action(&self, id: i64) -> Result<Option<PendingAction>>;

    /// Number of unsynced actions.
    async fn pending_count(&self) -> Result<usize>;
}

/// Remote clock mutations and the shift query.
#[async_trait]
pub trait ClockGateway: Send + Sync {
    async fn clock_in(&self, payload: &ClockPayload) -> Result<ShiftRef>;

    async fn clock_out(&self, payload: &ClockPayload) -> Result<ShiftRef>;

    async fn shifts(&self) -> Result<Vec<Shift>>;

    /// Dispatch by kind.
    async fn submit(&self, kind: ActionKind, payload: &ClockPayload) -> Result<ShiftRef> {
        match kind {
            ActionKind::ClockIn => self.clock_in(payload).await,
            ActionKind::ClockOut => self.clock_out(payload).await,
        }
    }
}

/// Offline copy of the user's shifts.
#[async_trait]
pub trait ShiftCache: Send + Sync {
    /// Replace the cached shifts with `shifts`.
    async fn cache_shifts(&self, shifts: &[Shift]) -> Result<()>;

    /// Cached shifts, newest clock-in first.
    async fn cached_shifts(&self) -> Result<Vec<Shift>>;
}

/// Small keyed value cache.
#[async_trait]
pub trait UserDataCache: Send + Sync {
    async fn put(&self, key: &str, value: &Value) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<Value>>;
}
