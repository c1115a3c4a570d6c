//! GraphQL documents and response shapes

use chrono::{DateTime, Utc};
use liefclock_domain::{ClockPayload, Shift};
use serde::{Deserialize, Serialize};

pub const CLOCK_IN: &str = "mutation ClockIn($note: String, $lat: Float!, $lng: Float!, $manualOverride: Boolean) {
  clockIn(note: $note, lat: $lat, lng: $lng, manualOverride: $manualOverride) { id clockInAt }
}";

pub const CLOCK_OUT: &str = "mutation ClockOut($note: String, $lat: Float!, $lng: Float!, $manualOverride: Boolean) {
  clockOut(note: $note, lat: $lat, lng: $lng, manualOverride: $manualOverride) { id clockOutAt }
}";

pub const MY_SHIFTS: &str = "query MyShifts {
  shifts { id clockInAt clockOutAt clockInLat clockInLng clockOutLat clockOutLng clockInNote clockOutNote }
}";

/// Request body posted to the GraphQL endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest<'a, V: Serialize> {
    pub operation_name: &'a str,
    pub query: &'a str,
    pub variables: V,
}

/// Variables shared by both clock mutations.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockVariables<'a> {
    pub note: Option<&'a str>,
    pub lat: f64,
    pub lng: f64,
    pub manual_override: bool,
}

impl<'a> From<&'a ClockPayload> for ClockVariables<'a> {
    fn from(payload: &'a ClockPayload) -> Self {
        Self {
            note: payload.note_opt(),
            lat: payload.lat,
            lng: payload.lng,
            manual_override: payload.manual_override,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlErrorItem>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlErrorItem {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockInData {
    pub clock_in: Option<ClockInResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockInResult {
    pub id: String,
    pub clock_in_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockOutData {
    pub clock_out: Option<ClockOutResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockOutResult {
    pub id: String,
    pub clock_out_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ShiftsData {
    #[serde(default)]
    pub shifts: Vec<Shift>,
}
