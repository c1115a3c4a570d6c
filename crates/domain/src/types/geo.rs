//! Geofence geometry types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_RADIUS_KM, DEFAULT_WORK_LOCATION_NAME};
use crate::errors::{LiefClockError, Result};
use crate::impl_domain_status_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// A device position sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub coords: Coordinates,
    /// Horizontal accuracy in metres, when the device reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { coords: Coordinates::new(latitude, longitude), accuracy_m: None, timestamp: Utc::now() }
    }

    pub fn latitude(&self) -> f64 {
        self.coords.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.coords.longitude
    }
}

fn default_radius_km() -> f64 {
    DEFAULT_RADIUS_KM
}

fn default_location_name() -> String {
    DEFAULT_WORK_LOCATION_NAME.to_string()
}

/// Admin-configured circular work perimeter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
    #[serde(default = "default_location_name")]
    pub name: String,
}

impl WorkLocation {
    pub fn new(latitude: f64, longitude: f64, radius_km: f64) -> Self {
        Self { latitude, longitude, radius_km, name: default_location_name() }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn center(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.radius_km.is_finite() || self.radius_km <= 0.0 {
            return Err(LiefClockError::Config(format!(
                "work location radius must be positive, got {}",
                self.radius_km
            )));
        }
        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(LiefClockError::Config(format!(
                "work location coordinates out of range: {}, {}",
                self.latitude, self.longitude
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeofenceStatus {
    Inside,
    Outside,
}

impl_domain_status_conversions!(GeofenceStatus {
    Inside => "inside",
    Outside => "outside",
});

impl GeofenceStatus {
    pub fn from_inside(inside: bool) -> Self {
        if inside {
            Self::Inside
        } else {
            Self::Outside
        }
    }
}

/// Edge-triggered perimeter crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeofenceEvent {
    Entered,
    Exited,
}

impl_domain_status_conversions!(GeofenceEvent {
    Entered => "ENTERED",
    Exited => "EXITED",
});

/// Result of evaluating one position against a work location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeofenceEvaluation {
    /// Infinite when no work location is configured.
    pub distance_km: f64,
    pub inside: bool,
}

impl GeofenceEvaluation {
    pub fn status(&self) -> GeofenceStatus {
        GeofenceStatus::from_inside(self.inside)
    }
}
