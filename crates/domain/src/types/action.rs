//! Clock actions and durable queue entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

/// Which remote mutation an action maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    ClockIn,
    ClockOut,
}

impl_domain_status_conversions!(ActionKind {
    ClockIn => "CLOCK_IN",
    ClockOut => "CLOCK_OUT",
});

/// Who produced an action. Kept for inspection only, never for routing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionSource {
    #[default]
    Manual,
    Geofence,
}

impl_domain_status_conversions!(ActionSource {
    Manual => "MANUAL",
    Geofence => "GEOFENCE",
});

/// Mutation arguments shared by clock-in and clock-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockPayload {
    #[serde(default)]
    pub note: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub manual_override: bool,
}

impl ClockPayload {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { note: String::new(), lat, lng, manual_override: false }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn with_manual_override(mut self, manual_override: bool) -> Self {
        self.manual_override = manual_override;
        self
    }

    /// Note as sent over the wire: empty notes become `null`.
    pub fn note_opt(&self) -> Option<&str> {
        let trimmed = self.note.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// A clock action tagged by kind.
///
/// Serialized as `{"kind": "CLOCK_IN", "payload": {...}}`, so a row whose
/// kind and payload disagree cannot be built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum ClockAction {
    #[serde(rename = "CLOCK_IN")]
    ClockIn(ClockPayload),
    #[serde(rename = "CLOCK_OUT")]
    ClockOut(ClockPayload),
}

impl ClockAction {
    pub fn new(kind: ActionKind, payload: ClockPayload) -> Self {
        match kind {
            ActionKind::ClockIn => Self::ClockIn(payload),
            ActionKind::ClockOut => Self::ClockOut(payload),
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::ClockIn(_) => ActionKind::ClockIn,
            Self::ClockOut(_) => ActionKind::ClockOut,
        }
    }

    pub fn payload(&self) -> &ClockPayload {
        match self {
            Self::ClockIn(payload) | Self::ClockOut(payload) => payload,
        }
    }
}

/// Action about to be queued; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPendingAction {
    pub action: ClockAction,
    pub source: ActionSource,
    pub created_at: DateTime<Utc>,
}

impl NewPendingAction {
    pub fn new(action: ClockAction, source: ActionSource) -> Self {
        Self { action, source, created_at: Utc::now() }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// A durably queued clock event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAction {
    /// Auto-assigned, never reused.
    pub id: i64,
    #[serde(flatten)]
    pub action: ClockAction,
    pub source: ActionSource,
    pub created_at: DateTime<Utc>,
    pub synced: bool,
    pub synced_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub last_retry_at: Option<DateTime<Utc>>,
}

impl PendingAction {
    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }

    pub fn payload(&self) -> &ClockPayload {
        self.action.payload()
    }

    /// True once the retry budget is spent; such entries stay queued but are
    /// never dispatched again.
    pub fn retries_exhausted(&self, max_retries: u32) -> bool {
        self.retry_count >= max_retries
    }
}
