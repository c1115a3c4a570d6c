//! Clock action submitter.
//!
//! One entry point for clock-in and clock-out regardless of connectivity.
//! Offline calls are queued straight away. Online calls go to the server
//! under a timeout and fall back to the queue on any failure, so a caller
//! only ever sees an error when the local store itself fails.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use liefclock_domain::constants::DEFAULT_REQUEST_TIMEOUT_MS;
use liefclock_domain::{
    ActionKind, ActionSource, ClockAction, ClockPayload, ClockReceipt, LiefClockError,
    NewPendingAction, Result, ShiftRef, SyncEvent,
};
use tracing::{info, instrument, warn};

use crate::network::NetworkMonitor;
use crate::sync::ports::{ActionStore, ClockGateway};

/// Routes clock actions to the server or the durable queue.
pub struct ClockSubmitter {
    store: Arc<dyn ActionStore>,
    gateway: Arc<dyn ClockGateway>,
    network: Arc<NetworkMonitor>,
    request_timeout: Duration,
    pending_sync: AtomicUsize,
}

impl ClockSubmitter {
    pub fn new(
        store: Arc<dyn ActionStore>,
        gateway: Arc<dyn ClockGateway>,
        network: Arc<NetworkMonitor>,
    ) -> Self {
        Self {
            store,
            gateway,
            network,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            pending_sync: AtomicUsize::new(0),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub async fn clock_in(&self, params: ClockPayload) -> Result<ClockReceipt> {
        self.submit(ActionKind::ClockIn, params, ActionSource::Manual).await
    }

    pub async fn clock_out(&self, params: ClockPayload) -> Result<ClockReceipt> {
        self.submit(ActionKind::ClockOut, params, ActionSource::Manual).await
    }

    /// Submit an action, recording where it came from if it ends up queued.
    #[instrument(skip_all, fields(kind = %kind, source = %source))]
    pub async fn submit(
        &self,
        kind: ActionKind,
        params: ClockPayload,
        source: ActionSource,
    ) -> Result<ClockReceipt> {
        if !self.network.is_online() {
            return self.enqueue(kind, params, source, false).await;
        }

        match self.call_server(kind, &params).await {
            Ok(shift) => {
                info!(shift_id = %shift.id, "Clock action confirmed by server");
                Ok(ClockReceipt::confirmed(kind, shift))
            }
            Err(e) => {
                warn!(error = %e, "Online clock action failed; saving for later sync");
                self.enqueue(kind, params, source, true).await
            }
        }
    }

    /// Visible count of actions queued through this submitter and not yet synced.
    pub fn pending_sync_count(&self) -> usize {
        self.pending_sync.load(Ordering::Acquire)
    }

    /// Reset the visible count from the store, e.g. after a restart.
    pub async fn refresh_pending_sync_count(&self) -> Result<usize> {
        let count = self.store.pending_count().await?;
        self.pending_sync.store(count, Ordering::Release);
        Ok(count)
    }

    /// Keep the visible count in step with sync progress.
    pub fn observe_sync_event(&self, event: &SyncEvent) {
        if matches!(event, SyncEvent::ActionSynced { .. }) {
            let _ = self.pending_sync.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(n.saturating_sub(1))
            });
        }
    }

    async fn call_server(&self, kind: ActionKind, params: &ClockPayload) -> Result<ShiftRef> {
        match tokio::time::timeout(self.request_timeout, self.gateway.submit(kind, params)).await {
            Ok(result) => result,
            Err(_) => Err(LiefClockError::Timeout(format!(
                "{kind} exceeded {}ms",
                self.request_timeout.as_millis()
            ))),
        }
    }

    async fn enqueue(
        &self,
        kind: ActionKind,
        params: ClockPayload,
        source: ActionSource,
        fallback: bool,
    ) -> Result<ClockReceipt> {
        let action = NewPendingAction::new(ClockAction::new(kind, params), source);
        let id = self.store.add_action(&action).await?;
        let pending = self.pending_sync.fetch_add(1, Ordering::AcqRel).saturating_add(1);

        info!(action_id = id, fallback, pending, "Clock action queued for sync");
        Ok(ClockReceipt::queued(kind, ShiftRef::offline(Utc::now()), id, fallback))
    }
}
