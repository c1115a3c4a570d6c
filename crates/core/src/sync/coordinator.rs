//! Background sync coordinator.
//!
//! Drains the durable action queue against the remote clock endpoint.
//! Passes are single-flight: a trigger that arrives while a pass (or its
//! error backoff) is running is ignored. Actions are dispatched oldest
//! first; a network failure aborts the pass without touching the failing
//! action, any other failure bumps its retry count and moves on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use liefclock_domain::config::{ServerConfig, SyncConfig};
use liefclock_domain::{
    LiefClockError, NetworkEvent, PendingAction, Result, SyncEvent, SyncState, SyncStatus,
    SyncSummary,
};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::ports::{ActionStore, ClockGateway};
use crate::network::NetworkMonitor;
use crate::observer::{Listeners, Subscription};

/// Configuration for the sync coordinator.
#[derive(Debug, Clone)]
pub struct SyncCoordinatorConfig {
    /// Retry ceiling; actions at or above it are skipped, not deleted
    pub max_retries: u32,
    /// Pause between successive dispatches
    pub inter_action_delay: Duration,
    /// Time spent in the error state before returning to idle
    pub error_backoff: Duration,
    /// Delay before the pass scheduled by `start`
    pub startup_delay: Duration,
    /// Bound on a single remote mutation
    pub request_timeout: Duration,
    /// Join timeout when stopping
    pub join_timeout: Duration,
}

impl Default for SyncCoordinatorConfig {
    fn default() -> Self {
        Self::new(&SyncConfig::default(), &ServerConfig::default())
    }
}

impl SyncCoordinatorConfig {
    pub fn new(sync: &SyncConfig, server: &ServerConfig) -> Self {
        Self {
            max_retries: sync.max_retries,
            inter_action_delay: sync.inter_action_delay(),
            error_backoff: sync.error_backoff(),
            startup_delay: sync.startup_delay(),
            request_timeout: server.request_timeout(),
            join_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Default)]
struct CoordinatorState {
    state: SyncState,
    last_sync_attempt: Option<DateTime<Utc>>,
    last_summary: Option<SyncSummary>,
}

enum PassOutcome {
    Completed(SyncSummary),
    Cancelled(SyncSummary),
}

/// Releases the single-flight flag on drop.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).ok().map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sync coordinator with explicit lifecycle management.
pub struct SyncCoordinator {
    store: Arc<dyn ActionStore>,
    gateway: Arc<dyn ClockGateway>,
    network: Arc<NetworkMonitor>,
    config: SyncCoordinatorConfig,
    state: Mutex<CoordinatorState>,
    in_flight: AtomicBool,
    listeners: Listeners<SyncEvent>,
    cancellation: Mutex<CancellationToken>,
    network_subscription: Mutex<Option<Subscription>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn ActionStore>,
        gateway: Arc<dyn ClockGateway>,
        network: Arc<NetworkMonitor>,
        config: SyncCoordinatorConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            network,
            config,
            state: Mutex::new(CoordinatorState::default()),
            in_flight: AtomicBool::new(false),
            listeners: Listeners::new(),
            cancellation: Mutex::new(CancellationToken::new()),
            network_subscription: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Register a listener for sync events.
    pub fn add_listener<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    /// Subscribe to network transitions and schedule the startup pass.
    #[instrument(skip(self))]
    pub fn start(self: &Arc<Self>) -> Result<()> {
        if self.is_running() {
            return Err(LiefClockError::Internal("Sync coordinator already running".into()));
        }

        let cancel = CancellationToken::new();
        *self.cancellation.lock() = cancel.clone();

        let runtime = tokio::runtime::Handle::current();
        let weak = Arc::downgrade(self);
        let subscription = self.network.add_listener(move |change| {
            if change.event != NetworkEvent::Online {
                return;
            }
            if let Some(coordinator) = weak.upgrade() {
                let task = Arc::clone(&coordinator);
                let handle = runtime.spawn(async move {
                    if let Err(e) = task.sync_now().await {
                        debug!(error = %e, "sync pass after reconnect failed");
                    }
                });
                coordinator.track(handle);
            }
        });
        *self.network_subscription.lock() = Some(subscription);

        if self.network.is_online() {
            let weak = Arc::downgrade(self);
            let delay = self.config.startup_delay;
            let handle = tokio::spawn(async move {
                tokio::select! {
                    () = cancel.cancelled() => {}
                    () = tokio::time::sleep(delay) => {
                        if let Some(coordinator) = weak.upgrade() {
                            if let Err(e) = coordinator.sync_now().await {
                                debug!(error = %e, "startup sync pass failed");
                            }
                        }
                    }
                }
            });
            self.track(handle);
        }

        info!("Sync coordinator started");
        Ok(())
    }

    /// Stop reacting to triggers, cancel running work and wait for it.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<()> {
        self.network_subscription.lock().take();
        self.cancellation.lock().cancel();

        let handles: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        let mut result = Ok(());
        for handle in handles {
            match tokio::time::timeout(self.config.join_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Sync task panicked: {}", e);
                    result = Err(LiefClockError::Internal("Sync task panicked".into()));
                }
                Err(_) => {
                    warn!("Sync task did not complete within timeout");
                    result = Err(LiefClockError::Timeout("Sync coordinator stop".into()));
                }
            }
        }

        info!("Sync coordinator stopped");
        result
    }

    pub fn is_running(&self) -> bool {
        self.network_subscription.lock().is_some()
    }

    pub fn status(&self) -> SyncStatus {
        let state = self.state.lock();
        SyncStatus {
            state: state.state,
            is_syncing: self.in_flight.load(Ordering::Acquire),
            is_online: self.network.is_online(),
            last_sync_attempt: state.last_sync_attempt,
            last_summary: state.last_summary,
        }
    }

    /// Number of queued actions still waiting for the server.
    pub async fn pending_sync_count(&self) -> Result<usize> {
        self.store.pending_count().await
    }

    /// Run one sync pass now.
    ///
    /// Returns `Ok(None)` when the pass was skipped because the monitor is
    /// offline or another pass is in progress.
    #[instrument(skip(self))]
    pub async fn sync_now(&self) -> Result<Option<SyncSummary>> {
        if !self.network.is_online() {
            debug!("offline; sync pass skipped");
            return Ok(None);
        }
        let Some(_in_flight) = InFlight::acquire(&self.in_flight) else {
            debug!("sync already in progress");
            return Ok(None);
        };

        let cancel = self.cancellation.lock().clone();
        {
            let mut state = self.state.lock();
            state.state = SyncState::Syncing;
            state.last_sync_attempt = Some(Utc::now());
        }

        match self.run_pass(&cancel).await {
            Ok(PassOutcome::Completed(summary)) => {
                self.finish(SyncState::Idle, Some(summary));
                info!(
                    synced = summary.synced,
                    failed = summary.failed,
                    skipped = summary.skipped,
                    "Sync completed"
                );
                self.listeners.emit(&SyncEvent::SyncCompleted(summary));
                Ok(Some(summary))
            }
            Ok(PassOutcome::Cancelled(summary)) => {
                info!(synced = summary.synced, "Sync pass cancelled");
                self.finish(SyncState::Idle, Some(summary));
                Ok(Some(summary))
            }
            Err(e) => {
                error!(error = %e, "Sync pass failed");
                self.finish(SyncState::Error, None);
                self.listeners.emit(&SyncEvent::SyncFailed { error: e.clone() });

                tokio::select! {
                    () = cancel.cancelled() => {}
                    () = tokio::time::sleep(self.config.error_backoff) => {}
                }
                self.finish(SyncState::Idle, None);
                Err(e)
            }
        }
    }

    async fn run_pass(&self, cancel: &CancellationToken) -> Result<PassOutcome> {
        let pending = self.store.pending_actions().await?;
        self.listeners.emit(&SyncEvent::SyncStarted { pending: pending.len() });

        let mut summary = SyncSummary::default();
        if pending.is_empty() {
            debug!("No pending actions to sync");
            return Ok(PassOutcome::Completed(summary));
        }

        info!(pending = pending.len(), "Starting sync of pending actions");

        let mut dispatched = 0usize;
        for action in pending {
            if cancel.is_cancelled() {
                return Ok(PassOutcome::Cancelled(summary));
            }

            if action.retries_exhausted(self.config.max_retries) {
                warn!(
                    action_id = action.id,
                    retry_count = action.retry_count,
                    "Action exceeded max retries, skipping"
                );
                summary.skipped = summary.skipped.saturating_add(1);
                continue;
            }

            if dispatched > 0 {
                tokio::select! {
                    () = cancel.cancelled() => return Ok(PassOutcome::Cancelled(summary)),
                    () = tokio::time::sleep(self.config.inter_action_delay) => {}
                }
            }
            dispatched = dispatched.saturating_add(1);

            match self.dispatch(&action).await {
                Ok(shift) => {
                    self.store.mark_synced(action.id).await?;
                    summary.synced = summary.synced.saturating_add(1);
                    debug!(action_id = action.id, kind = %action.kind(), shift_id = %shift.id, "Action synced");

                    let mut synced = action;
                    synced.synced = true;
                    synced.synced_at = Some(Utc::now());
                    self.listeners.emit(&SyncEvent::ActionSynced {
                        action: synced,
                        shift,
                        synced_count: summary.synced,
                    });
                }
                Err(e) if e.is_retryable() || !self.network.is_online() => {
                    warn!(action_id = action.id, error = %e, "Network failure; aborting sync pass");
                    return Err(e);
                }
                Err(e) => {
                    let retry_count = self.store.increment_retry(action.id).await?;
                    summary.failed = summary.failed.saturating_add(1);
                    warn!(
                        action_id = action.id,
                        kind = %action.kind(),
                        retry_count,
                        reason = %truncate_reason(&e.to_string()),
                        "Server rejected queued action"
                    );
                }
            }
        }

        let cleared = self.store.clear_synced().await?;
        debug!(cleared, "Cleared synced actions");

        Ok(PassOutcome::Completed(summary))
    }

    async fn dispatch(&self, action: &PendingAction) -> Result<liefclock_domain::ShiftRef> {
        match tokio::time::timeout(
            self.config.request_timeout,
            self.gateway.submit(action.kind(), action.payload()),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(LiefClockError::Timeout(format!(
                "{} dispatch exceeded {}ms",
                action.kind(),
                self.config.request_timeout.as_millis()
            ))),
        }
    }

    fn finish(&self, next: SyncState, summary: Option<SyncSummary>) {
        let mut state = self.state.lock();
        state.state = next;
        if summary.is_some() {
            state.last_summary = summary;
        }
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut tasks = self.tasks.lock();
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }
}

impl Drop for SyncCoordinator {
    fn drop(&mut self) {
        self.cancellation.get_mut().cancel();
    }
}

fn truncate_reason(reason: &str) -> String {
    const MAX_LEN: usize = 200;
    if reason.chars().count() <= MAX_LEN {
        reason.to_string()
    } else {
        let truncated: String = reason.chars().take(MAX_LEN).collect();
        format!("{truncated}...")
    }
}
