//! Port interfaces for device capabilities used by background tracking
//!
//! Geolocation, page visibility and user notifications are host services;
//! these narrow traits are all the tracker knows about them.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use liefclock_domain::config::TrackingConfig;
use liefclock_domain::{PermissionState, Position, Result, Visibility};

/// Geolocation request parameters passed through to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix the device may return.
    pub maximum_age: Duration,
}

impl From<&TrackingConfig> for PositionOptions {
    fn from(config: &TrackingConfig) -> Self {
        Self {
            high_accuracy: config.high_accuracy,
            timeout: Duration::from_millis(config.position_timeout_ms),
            maximum_age: Duration::from_millis(config.maximum_age_ms),
        }
    }
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self::from(&TrackingConfig::default())
    }
}

/// Device geolocation
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn permission(&self) -> PermissionState;

    /// One-shot fix. Fails with `Permission` or `Timeout` errors.
    async fn current_position(&self, options: &PositionOptions) -> Result<Position>;

    /// Continuous fixes until the stream is dropped.
    fn watch_positions(&self, options: &PositionOptions) -> BoxStream<'static, Result<Position>>;
}

/// Foreground/background changes of the host application
pub trait VisibilityObserver: Send + Sync {
    fn visibility_changes(&self) -> BoxStream<'static, Visibility>;
}

/// A user-facing notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Replaces an earlier notification with the same tag.
    pub tag: String,
}

/// Host notification facility
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn permission(&self) -> PermissionState;

    async fn notify(&self, notification: &Notification) -> Result<()>;
}
