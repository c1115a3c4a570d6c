//! Channel-fed position source and visibility observer

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use liefclock_core::{PositionOptions, PositionSource, VisibilityObserver};
use liefclock_domain::{LiefClockError, PermissionState, Position, Result, Visibility};
use parking_lot::RwLock;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 64;

/// Position source fed by [`ChannelPositionSource::publish`].
///
/// Every `watch_positions` stream sees fixes published after it was
/// created. A stream that falls behind skips the fixes it missed.
pub struct ChannelPositionSource {
    permission: RwLock<PermissionState>,
    latest: watch::Sender<Option<Position>>,
    updates: broadcast::Sender<Result<Position>>,
}

impl ChannelPositionSource {
    pub fn new(permission: PermissionState) -> Self {
        let (latest, _) = watch::channel(None);
        let (updates, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { permission: RwLock::new(permission), latest, updates }
    }

    /// Push a new fix to all watchers.
    pub fn publish(&self, position: Position) {
        self.latest.send_replace(Some(position));
        // No receivers simply means nobody is tracking right now.
        let _ = self.updates.send(Ok(position));
    }

    /// Change the location permission. Revoking it ends running watches.
    pub fn set_permission(&self, permission: PermissionState) {
        let previous = std::mem::replace(&mut *self.permission.write(), permission);
        if previous != PermissionState::Denied && permission == PermissionState::Denied {
            warn!("location permission revoked");
            let _ = self
                .updates
                .send(Err(LiefClockError::Permission("location permission revoked".into())));
        }
    }

    fn is_fresh(position: &Position, options: &PositionOptions) -> bool {
        let age = Utc::now().signed_duration_since(position.timestamp);
        age.to_std().map(|age| age <= options.maximum_age).unwrap_or(true)
    }
}

#[async_trait]
impl PositionSource for ChannelPositionSource {
    async fn permission(&self) -> PermissionState {
        *self.permission.read()
    }

    async fn current_position(&self, options: &PositionOptions) -> Result<Position> {
        if *self.permission.read() == PermissionState::Denied {
            return Err(LiefClockError::Permission("location permission denied".into()));
        }

        let mut receiver = self.latest.subscribe();
        if let Some(position) = *receiver.borrow_and_update() {
            if Self::is_fresh(&position, options) {
                return Ok(position);
            }
        }

        match tokio::time::timeout(options.timeout, receiver.changed()).await {
            Ok(Ok(())) => (*receiver.borrow())
                .ok_or_else(|| LiefClockError::Internal("position channel cleared".into())),
            Ok(Err(_)) => Err(LiefClockError::Internal("position channel closed".into())),
            Err(_) => Err(LiefClockError::Timeout(format!(
                "no position fix within {}ms",
                options.timeout.as_millis()
            ))),
        }
    }

    fn watch_positions(&self, _options: &PositionOptions) -> BoxStream<'static, Result<Position>> {
        let receiver = self.updates.subscribe();
        stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(sample) => return Some((sample, receiver)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "position watcher lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}

/// Visibility observer fed by [`ChannelVisibility::set`].
pub struct ChannelVisibility {
    changes: broadcast::Sender<Visibility>,
}

impl ChannelVisibility {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { changes }
    }

    pub fn set(&self, visibility: Visibility) {
        let _ = self.changes.send(visibility);
    }
}

impl Default for ChannelVisibility {
    fn default() -> Self {
        Self::new()
    }
}

impl VisibilityObserver for ChannelVisibility {
    fn visibility_changes(&self) -> BoxStream<'static, Visibility> {
        let receiver = self.changes.subscribe();
        stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(visibility) => return Some((visibility, receiver)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn options() -> PositionOptions {
        PositionOptions {
            high_accuracy: true,
            timeout: Duration::from_millis(200),
            maximum_age: Duration::from_secs(10),
        }
    }

    #[tokio::test]
    async fn watchers_receive_published_fixes() {
        let source = ChannelPositionSource::new(PermissionState::Granted);
        let mut watch = source.watch_positions(&options());

        source.publish(Position::new(1.0, 2.0));
        let sample = watch.next().await.unwrap().unwrap();
        assert_eq!(sample.latitude(), 1.0);
    }

    #[tokio::test]
    async fn current_position_uses_fresh_fix_or_times_out() {
        let source = ChannelPositionSource::new(PermissionState::Granted);
        let err = source.current_position(&options()).await.unwrap_err();
        assert!(matches!(err, LiefClockError::Timeout(_)));

        source.publish(Position::new(3.0, 4.0));
        assert_eq!(source.current_position(&options()).await.unwrap().longitude(), 4.0);
    }

    #[tokio::test]
    async fn revoking_permission_fails_running_watch() {
        let source = ChannelPositionSource::new(PermissionState::Granted);
        let mut watch = source.watch_positions(&options());

        source.set_permission(PermissionState::Denied);

        let next = watch.next().await.unwrap();
        assert!(next.unwrap_err().is_permission());
        assert_eq!(source.permission().await, PermissionState::Denied);
        assert!(source.current_position(&options()).await.unwrap_err().is_permission());
    }

    #[tokio::test]
    async fn visibility_changes_are_broadcast() {
        let visibility = ChannelVisibility::new();
        let mut changes = visibility.visibility_changes();

        visibility.set(Visibility::Hidden);
        assert_eq!(changes.next().await, Some(Visibility::Hidden));
    }
}
