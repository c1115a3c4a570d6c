//! Server-owned shifts and clock results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::ActionKind;
use crate::constants::OFFLINE_ID_PREFIX;

/// A shift as returned by the `shifts` query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: String,
    pub clock_in_at: DateTime<Utc>,
    #[serde(default)]
    pub clock_out_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub clock_in_lat: Option<f64>,
    #[serde(default)]
    pub clock_in_lng: Option<f64>,
    #[serde(default)]
    pub clock_out_lat: Option<f64>,
    #[serde(default)]
    pub clock_out_lng: Option<f64>,
    #[serde(default)]
    pub clock_in_note: Option<String>,
    #[serde(default)]
    pub clock_out_note: Option<String>,
}

impl Shift {
    /// At most one open shift exists per user.
    pub fn is_open(&self) -> bool {
        self.clock_out_at.is_none()
    }
}

/// Identifier and timestamp of a clock mutation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftRef {
    pub id: String,
    pub timestamp: DateTime<Utc>,
}

impl ShiftRef {
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self { id: id.into(), timestamp }
    }

    /// Synthetic reference handed out before the server has confirmed anything.
    pub fn offline(now: DateTime<Utc>) -> Self {
        Self { id: format!("{OFFLINE_ID_PREFIX}{}", now.timestamp_millis()), timestamp: now }
    }

    pub fn is_optimistic(&self) -> bool {
        self.id.starts_with(OFFLINE_ID_PREFIX)
    }
}

/// What a clock-in or clock-out call returned to its caller.
///
/// When `offline` is set the reference is optimistic; `local_action_id`
/// matches the `action.id` of the later `ActionSynced` event, which carries
/// the server-assigned reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockReceipt {
    pub shift: ShiftRef,
    pub kind: ActionKind,
    pub offline: bool,
    /// Set when an online attempt failed and the action was queued instead.
    pub fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_action_id: Option<i64>,
}

impl ClockReceipt {
    pub fn confirmed(kind: ActionKind, shift: ShiftRef) -> Self {
        Self { shift, kind, offline: false, fallback: false, local_action_id: None }
    }

    pub fn queued(kind: ActionKind, shift: ShiftRef, local_action_id: i64, fallback: bool) -> Self {
        Self { shift, kind, offline: true, fallback, local_action_id: Some(local_action_id) }
    }

    pub fn shift_ref(&self) -> &ShiftRef {
        &self.shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_reference_uses_millis_suffix() {
        let now = Utc::now();
        let reference = ShiftRef::offline(now);
        assert_eq!(reference.id, format!("offline_{}", now.timestamp_millis()));
        assert!(reference.is_optimistic());
        assert!(!ShiftRef::new("shift-1", now).is_optimistic());
    }

    #[test]
    fn shift_deserializes_from_graphql_shape() {
        let shift: Shift = serde_json::from_value(serde_json::json!({
            "id": "s1",
            "clockInAt": "2024-01-01T08:00:00Z",
            "clockOutAt": null,
            "clockInLat": 1.0,
            "clockInLng": 2.0
        }))
        .unwrap();
        assert!(shift.is_open());
        assert_eq!(shift.clock_in_lat, Some(1.0));
        assert_eq!(shift.clock_out_note, None);
    }
}
