//! Connectivity state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkEvent {
    Online,
    Offline,
}

impl_domain_status_conversions!(NetworkEvent {
    Online => "online",
    Offline => "offline",
});

impl NetworkEvent {
    pub fn from_online(online: bool) -> Self {
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }
}

/// What observed the transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivitySource {
    /// Host-provided connectivity change.
    Host,
    /// Active reachability probe.
    Probe,
}

/// A confirmed online/offline transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkChange {
    pub event: NetworkEvent,
    pub source: ConnectivitySource,
    pub at: DateTime<Utc>,
    /// Set on `Online`: how long the previous offline period lasted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offline_duration_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub is_online: bool,
    pub last_online_at: Option<DateTime<Utc>>,
    pub last_offline_at: Option<DateTime<Utc>>,
    /// Time spent offline so far, when currently offline.
    pub offline_duration_ms: Option<i64>,
}
