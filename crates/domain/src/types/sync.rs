//! Sync coordinator state and events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::PendingAction;
use super::shift::ShiftRef;
use crate::errors::LiefClockError;
use crate::impl_domain_status_conversions;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    #[default]
    Idle,
    Syncing,
    Error,
}

impl_domain_status_conversions!(SyncState {
    Idle => "IDLE",
    Syncing => "SYNCING",
    Error => "ERROR",
});

/// Counters for one sync pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub synced: usize,
    pub failed: usize,
    /// Entries left alone because their retry budget is spent.
    pub skipped: usize,
}

/// Events published by the sync coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    SyncStarted { pending: usize },
    ActionSynced { action: PendingAction, shift: ShiftRef, synced_count: usize },
    SyncCompleted(SyncSummary),
    SyncFailed { error: LiefClockError },
}

/// Point-in-time view of the sync coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub state: SyncState,
    pub is_syncing: bool,
    pub is_online: bool,
    pub last_sync_attempt: Option<DateTime<Utc>>,
    pub last_summary: Option<SyncSummary>,
}

/// Record counts for the local record sets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    pub offline_actions: u64,
    pub pending_actions: u64,
    pub cached_shifts: u64,
    pub cached_user_data: u64,
}
