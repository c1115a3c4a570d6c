//! Passive background tracker
//!
//! Feeds device positions through a [`GeofenceEvaluator`] while the app is
//! in the background and turns perimeter crossings into clock actions.
//! Location permission problems stop tracking quietly; they are recorded in
//! the status and never surface as data errors.

use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::StreamExt;
use liefclock_domain::constants::{CACHE_KEY_WORK_LOCATION, DEFAULT_BUFFER_KM};
use liefclock_domain::{
    ActionKind, ActionSource, ClockPayload, GeofenceEvent, GeofenceStatus, LiefClockError,
    PermissionState, Position, Result, TrackerStatus, Visibility, WorkLocation,
};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::ports::{Notification, NotificationSink, PositionOptions, PositionSource, VisibilityObserver};
use crate::clock::ClockSubmitter;
use crate::geofence::GeofenceEvaluator;
use crate::sync::ports::UserDataCache;

#[derive(Debug, Default)]
struct Observed {
    permission: PermissionState,
    last_status: Option<GeofenceStatus>,
    last_position: Option<Position>,
}

/// Background geofence tracking with explicit lifecycle management.
pub struct BackgroundTracker {
    submitter: Arc<ClockSubmitter>,
    positions: Arc<dyn PositionSource>,
    notifier: Arc<dyn NotificationSink>,
    user_data: Option<Arc<dyn UserDataCache>>,
    options: PositionOptions,
    buffer_km: f64,
    join_timeout: Duration,
    work_location: Mutex<Option<WorkLocation>>,
    observed: Arc<Mutex<Observed>>,
    lifecycle: tokio::sync::Mutex<()>,
    cancellation: Mutex<CancellationToken>,
    task_handle: Mutex<Option<JoinHandle<()>>>,
    visibility_cancel: Mutex<CancellationToken>,
    visibility_task: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundTracker {
    pub fn new(
        submitter: Arc<ClockSubmitter>,
        positions: Arc<dyn PositionSource>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            submitter,
            positions,
            notifier,
            user_data: None,
            options: PositionOptions::default(),
            buffer_km: DEFAULT_BUFFER_KM,
            join_timeout: Duration::from_secs(5),
            work_location: Mutex::new(None),
            observed: Arc::new(Mutex::new(Observed::default())),
            lifecycle: tokio::sync::Mutex::new(()),
            cancellation: Mutex::new(CancellationToken::new()),
            task_handle: Mutex::new(None),
            visibility_cancel: Mutex::new(CancellationToken::new()),
            visibility_task: Mutex::new(None),
        }
    }

    /// Persist the work location here so tracking can start without a server.
    pub fn with_user_data_cache(mut self, cache: Arc<dyn UserDataCache>) -> Self {
        self.user_data = Some(cache);
        self
    }

    pub fn with_position_options(mut self, options: PositionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_buffer_km(mut self, buffer_km: f64) -> Self {
        self.buffer_km = buffer_km;
        self
    }

    /// Set (or clear) the perimeter. Takes effect on the next `start`.
    pub async fn set_work_location(&self, location: Option<WorkLocation>) -> Result<()> {
        if let Some(location) = &location {
            location.validate()?;
        }
        if let (Some(cache), Some(location)) = (&self.user_data, &location) {
            let value = serde_json::to_value(location)
                .map_err(|e| LiefClockError::Internal(format!("work location encode: {e}")))?;
            cache.put(CACHE_KEY_WORK_LOCATION, &value).await?;
        }
        *self.work_location.lock() = location;
        Ok(())
    }

    pub fn work_location(&self) -> Option<WorkLocation> {
        self.work_location.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.lock().as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn status(&self) -> TrackerStatus {
        let observed = self.observed.lock();
        TrackerStatus {
            active: self.is_running(),
            has_work_location: self.work_location.lock().is_some(),
            location_permission: observed.permission,
            last_status: observed.last_status,
            last_position: observed.last_position,
        }
    }

    /// Start tracking. Returns `false` when tracking cannot run (no work
    /// location, or location permission denied).
    #[instrument(skip(self))]
    pub async fn start(self: &Arc<Self>) -> Result<bool> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.is_running() {
            return Ok(true);
        }

        let Some(location) = self.resolve_work_location().await else {
            warn!("No work location configured; background tracking not started");
            return Ok(false);
        };

        let permission = self.positions.permission().await;
        self.observed.lock().permission = permission;
        if permission == PermissionState::Denied {
            warn!("Location permission denied; background tracking not started");
            return Ok(false);
        }

        let mut evaluator = GeofenceEvaluator::new(Some(location)).with_buffer_km(self.buffer_km);

        match self.positions.current_position(&self.options).await {
            Ok(position) => {
                let observation = evaluator.observe(position);
                self.record(&evaluator, PermissionState::Granted);
                debug!(distance_km = observation.evaluation.distance_km, "Initial position primed geofence");
            }
            Err(e) if e.is_permission() => {
                self.observed.lock().permission = PermissionState::Denied;
                warn!(error = %e, "Location permission denied; background tracking not started");
                return Ok(false);
            }
            Err(e) => debug!(error = %e, "Initial position unavailable; priming on first watch sample"),
        }

        let cancel = CancellationToken::new();
        *self.cancellation.lock() = cancel.clone();

        let stream = self.positions.watch_positions(&self.options);
        let tracker = Arc::downgrade(self);
        let handle = tokio::spawn(Self::track_loop(tracker, evaluator, stream, cancel));
        *self.task_handle.lock() = Some(handle);

        info!("Background tracking started");
        Ok(true)
    }

    /// Stop tracking and drop the session's geofence state.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock().await;
        self.cancellation.lock().cancel();

        let Some(handle) = self.task_handle.lock().take() else {
            return Ok(());
        };
        join_with_timeout(handle, self.join_timeout, "Tracking").await?;

        self.observed.lock().last_status = None;
        info!("Background tracking stopped");
        Ok(())
    }

    /// Start tracking when the app is hidden and stop when it is visible.
    pub fn attach_visibility(self: &Arc<Self>, observer: &dyn VisibilityObserver) {
        let cancel = CancellationToken::new();
        let previous = std::mem::replace(&mut *self.visibility_cancel.lock(), cancel.clone());
        previous.cancel();

        let mut changes = observer.visibility_changes();
        let tracker: Weak<Self> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            loop {
                let visibility = tokio::select! {
                    () = cancel.cancelled() => break,
                    next = changes.next() => match next {
                        Some(visibility) => visibility,
                        None => break,
                    },
                };
                let Some(tracker) = tracker.upgrade() else { break };
                let outcome = match visibility {
                    Visibility::Hidden => tracker.start().await.map(|_| ()),
                    Visibility::Visible => tracker.stop().await,
                };
                if let Err(e) = outcome {
                    warn!(error = %e, ?visibility, "Visibility-driven tracking change failed");
                }
            }
        });

        if let Some(old) = self.visibility_task.lock().replace(handle) {
            old.abort();
        }
    }

    /// Stop tracking and stop following visibility changes.
    pub async fn shutdown(&self) -> Result<()> {
        self.visibility_cancel.lock().cancel();
        let visibility = self.visibility_task.lock().take();
        if let Some(handle) = visibility {
            join_with_timeout(handle, self.join_timeout, "Visibility").await?;
        }
        self.stop().await
    }

    async fn resolve_work_location(&self) -> Option<WorkLocation> {
        if let Some(location) = self.work_location() {
            return Some(location);
        }
        let cache = self.user_data.as_ref()?;
        match cache.get(CACHE_KEY_WORK_LOCATION).await {
            Ok(Some(value)) => match serde_json::from_value::<WorkLocation>(value) {
                Ok(location) => {
                    *self.work_location.lock() = Some(location.clone());
                    Some(location)
                }
                Err(e) => {
                    warn!(error = %e, "Cached work location is malformed");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read cached work location");
                None
            }
        }
    }

    async fn track_loop(
        tracker: Weak<Self>,
        mut evaluator: GeofenceEvaluator,
        mut stream: futures::stream::BoxStream<'static, Result<Position>>,
        cancel: CancellationToken,
    ) {
        loop {
            let next = tokio::select! {
                () = cancel.cancelled() => {
                    debug!("Tracking loop cancelled");
                    break;
                }
                next = stream.next() => next,
            };

            let Some(tracker) = tracker.upgrade() else { break };
            match next {
                Some(Ok(position)) => tracker.handle_position(&mut evaluator, position).await,
                Some(Err(e)) if e.is_permission() => {
                    tracker.observed.lock().permission = PermissionState::Denied;
                    warn!(error = %e, "Location permission revoked; stopping background tracking");
                    break;
                }
                Some(Err(e)) => debug!(error = %e, "Position sample unavailable; skipping"),
                None => {
                    debug!("Position stream ended");
                    break;
                }
            }
        }
    }

    async fn handle_position(&self, evaluator: &mut GeofenceEvaluator, position: Position) {
        let observation = evaluator.observe(position);
        self.record(evaluator, PermissionState::Granted);

        let Some(event) = observation.event else {
            return;
        };
        let distance_km = observation.evaluation.distance_km;
        info!(event = %event, distance_km, "Geofence transition detected");

        let (kind, verb, title, body, tag) = match event {
            GeofenceEvent::Entered => (
                ActionKind::ClockIn,
                "clock-in",
                "Clocked In",
                "You have been automatically clocked in as you entered the work area.",
                "clock-in",
            ),
            GeofenceEvent::Exited => (
                ActionKind::ClockOut,
                "clock-out",
                "Clocked Out",
                "You have been automatically clocked out as you left the work area.",
                "clock-out",
            ),
        };

        let payload = ClockPayload::new(position.latitude(), position.longitude())
            .with_note(format!("Auto {verb} (background, {distance_km:.2}km from work)"));

        match self.submitter.submit(kind, payload, ActionSource::Geofence).await {
            Ok(receipt) => {
                debug!(offline = receipt.offline, shift_id = %receipt.shift.id, "Automatic clock action recorded");
                self.send_notification(Notification {
                    title: title.to_string(),
                    body: body.to_string(),
                    tag: tag.to_string(),
                })
                .await;
            }
            Err(e) => warn!(error = %e, kind = %kind, "Failed to record automatic clock action"),
        }
    }

    async fn send_notification(&self, notification: Notification) {
        if self.notifier.permission() != PermissionState::Granted {
            debug!(title = %notification.title, "Notification permission not granted; skipping");
            return;
        }
        if let Err(e) = self.notifier.notify(&notification).await {
            warn!(error = %e, "Failed to show notification");
        }
    }

    fn record(&self, evaluator: &GeofenceEvaluator, permission: PermissionState) {
        let mut observed = self.observed.lock();
        observed.permission = permission;
        observed.last_status = evaluator.last_status();
        observed.last_position = evaluator.last_position().copied();
    }
}

impl Drop for BackgroundTracker {
    fn drop(&mut self) {
        self.cancellation.get_mut().cancel();
        self.visibility_cancel.get_mut().cancel();
    }
}

async fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration, what: &str) -> Result<()> {
    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            warn!("{} task panicked: {}", what, e);
            Err(LiefClockError::Internal(format!("{what} task panicked")))
        }
        Err(_) => {
            warn!("{} task did not complete within timeout", what);
            Err(LiefClockError::Timeout(format!("{what} task stop")))
        }
    }
}
