//! Notifications for hosts without a notification centre

use async_trait::async_trait;
use liefclock_core::{Notification, NotificationSink};
use liefclock_domain::{PermissionState, Result};
use tracing::info;

/// Writes notifications to the log instead of showing them.
pub struct LogNotificationSink {
    permission: PermissionState,
}

impl LogNotificationSink {
    pub fn new(permission: PermissionState) -> Self {
        Self { permission }
    }
}

impl Default for LogNotificationSink {
    fn default() -> Self {
        Self::new(PermissionState::Granted)
    }
}

#[async_trait]
impl NotificationSink for LogNotificationSink {
    fn permission(&self) -> PermissionState {
        self.permission
    }

    async fn notify(&self, notification: &Notification) -> Result<()> {
        info!(
            title = %notification.title,
            tag = %notification.tag,
            body = %notification.body,
            "notification"
        );
        Ok(())
    }
}
