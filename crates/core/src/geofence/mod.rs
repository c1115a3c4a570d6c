//! Geofence evaluation.
//!
//! [`evaluate`] is a pure distance check. [`GeofenceEvaluator`] keeps the
//! previous status and reports an event only when it changes; the first
//! sample after construction or a reset only primes the status.

use liefclock_domain::constants::{DEFAULT_BUFFER_KM, EARTH_RADIUS_KM};
use liefclock_domain::{
    Coordinates, GeofenceEvaluation, GeofenceEvent, GeofenceStatus, Position, WorkLocation,
};
use tracing::debug;

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lng = (to.longitude - from.longitude).to_radians();
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Distance to the work location and whether the point counts as inside.
///
/// Without a work location the point is never inside.
pub fn evaluate(
    position: Coordinates,
    work_location: Option<&WorkLocation>,
    buffer_km: f64,
) -> GeofenceEvaluation {
    match work_location {
        Some(location) => {
            let distance_km = haversine_km(position, location.center());
            GeofenceEvaluation { distance_km, inside: distance_km <= location.radius_km + buffer_km }
        }
        None => GeofenceEvaluation { distance_km: f64::INFINITY, inside: false },
    }
}

/// Outcome of feeding one sample to the evaluator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeofenceObservation {
    pub evaluation: GeofenceEvaluation,
    pub event: Option<GeofenceEvent>,
}

/// Edge-triggered geofence state for one tracking session.
#[derive(Debug, Clone)]
pub struct GeofenceEvaluator {
    work_location: Option<WorkLocation>,
    buffer_km: f64,
    last_status: Option<GeofenceStatus>,
    last_position: Option<Position>,
}

impl GeofenceEvaluator {
    pub fn new(work_location: Option<WorkLocation>) -> Self {
        Self { work_location, buffer_km: DEFAULT_BUFFER_KM, last_status: None, last_position: None }
    }

    pub fn with_buffer_km(mut self, buffer_km: f64) -> Self {
        self.buffer_km = buffer_km;
        self
    }

    /// Replace the perimeter. The previous status no longer applies, so the
    /// next sample primes again.
    pub fn set_work_location(&mut self, work_location: Option<WorkLocation>) {
        self.work_location = work_location;
        self.last_status = None;
    }

    pub fn work_location(&self) -> Option<&WorkLocation> {
        self.work_location.as_ref()
    }

    pub fn last_status(&self) -> Option<GeofenceStatus> {
        self.last_status
    }

    pub fn last_position(&self) -> Option<&Position> {
        self.last_position.as_ref()
    }

    pub fn reset(&mut self) {
        self.last_status = None;
        self.last_position = None;
    }

    /// Evaluate a sample and return the transition it causes, if any.
    pub fn observe(&mut self, position: Position) -> GeofenceObservation {
        let evaluation = evaluate(position.coords, self.work_location.as_ref(), self.buffer_km);
        let current = evaluation.status();

        let event = match (self.last_status, current) {
            (Some(GeofenceStatus::Outside), GeofenceStatus::Inside) => Some(GeofenceEvent::Entered),
            (Some(GeofenceStatus::Inside), GeofenceStatus::Outside) => Some(GeofenceEvent::Exited),
            _ => None,
        };

        if self.last_status.is_none() {
            debug!(status = %current, distance_km = evaluation.distance_km, "geofence status primed");
        }

        self.last_status = Some(current);
        self.last_position = Some(position);

        GeofenceObservation { evaluation, event }
    }
}
