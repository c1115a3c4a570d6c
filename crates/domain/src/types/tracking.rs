//! Background tracking state

use serde::{Deserialize, Serialize};

use super::geo::{GeofenceStatus, Position};
use crate::impl_domain_status_conversions;

/// Device permission as reported by the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
    #[default]
    Prompt,
}

impl_domain_status_conversions!(PermissionState {
    Granted => "granted",
    Denied => "denied",
    Prompt => "prompt",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerStatus {
    pub active: bool,
    pub has_work_location: bool,
    pub location_permission: PermissionState,
    pub last_status: Option<GeofenceStatus>,
    pub last_position: Option<Position>,
}
