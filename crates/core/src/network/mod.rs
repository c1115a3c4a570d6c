//! Network status monitor.
//!
//! Two states, online and offline. Host connectivity events and a periodic
//! reachability probe both feed the same transition check; listeners hear
//! only about actual transitions.

pub mod ports;

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use liefclock_domain::config::NetworkConfig;
use liefclock_domain::{
    ConnectivitySource, LiefClockError, NetworkChange, NetworkEvent, NetworkStatus, Result,
};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub use self::ports::ConnectivityProbe;
use crate::observer::{Listeners, Subscription};

/// Configuration for the network monitor.
#[derive(Debug, Clone)]
pub struct NetworkMonitorConfig {
    /// Interval between reachability probes
    pub probe_interval: Duration,
    /// Bound on a single probe request. A probe may issue two requests
    /// (health path, then root), so a whole probe gets twice this.
    pub probe_timeout: Duration,
    /// State reported before anything has been observed
    pub assume_online: bool,
    /// Join timeout when stopping
    pub join_timeout: Duration,
}

impl Default for NetworkMonitorConfig {
    fn default() -> Self {
        Self::from(&NetworkConfig::default())
    }
}

impl From<&NetworkConfig> for NetworkMonitorConfig {
    fn from(config: &NetworkConfig) -> Self {
        Self {
            probe_interval: config.probe_interval(),
            probe_timeout: config.probe_timeout(),
            assume_online: config.assume_online,
            join_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug)]
struct MonitorState {
    online: bool,
    /// Last host report; `None` until the host says anything.
    host_online: Option<bool>,
    last_online_at: Option<DateTime<Utc>>,
    last_offline_at: Option<DateTime<Utc>>,
}

/// Connectivity state machine with an optional background probe loop.
pub struct NetworkMonitor {
    probe: Option<Arc<dyn ConnectivityProbe>>,
    config: NetworkMonitorConfig,
    state: Mutex<MonitorState>,
    online_tx: watch::Sender<bool>,
    listeners: Listeners<NetworkChange>,
    cancellation: Mutex<CancellationToken>,
    task_handle: Mutex<Option<JoinHandle<()>>>,
}

impl NetworkMonitor {
    pub fn new(probe: Option<Arc<dyn ConnectivityProbe>>, config: NetworkMonitorConfig) -> Self {
        let online = config.assume_online;
        let (online_tx, _) = watch::channel(online);
        Self {
            probe,
            config,
            state: Mutex::new(MonitorState {
                online,
                host_online: None,
                last_online_at: None,
                last_offline_at: None,
            }),
            online_tx,
            listeners: Listeners::new(),
            cancellation: Mutex::new(CancellationToken::new()),
            task_handle: Mutex::new(None),
        }
    }

    /// Point-in-time connectivity flag.
    pub fn is_online(&self) -> bool {
        self.state.lock().online
    }

    pub fn status(&self) -> NetworkStatus {
        let state = self.state.lock();
        let offline_duration_ms = if state.online {
            None
        } else {
            state.last_offline_at.map(|at| (Utc::now() - at).num_milliseconds())
        };
        NetworkStatus {
            is_online: state.online,
            last_online_at: state.last_online_at,
            last_offline_at: state.last_offline_at,
            offline_duration_ms,
        }
    }

    /// Register a transition listener.
    pub fn add_listener<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&NetworkChange) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    /// Host-provided connectivity change.
    #[instrument(skip(self))]
    pub fn handle_connectivity_change(&self, online: bool) {
        self.state.lock().host_online = Some(online);
        self.apply(online, ConnectivitySource::Host);
    }

    /// Run the reachability probe once and apply its verdict.
    ///
    /// Only an explicit host "offline" skips the probe; otherwise the probe's
    /// verdict wins over whatever state the monitor started with.
    pub async fn check_now(&self) -> bool {
        let host_offline = self.state.lock().host_online == Some(false);
        let Some(probe) = self.probe.as_ref() else {
            return self.is_online();
        };

        let reachable = if host_offline {
            false
        } else {
            let bound = self.probe_bound();
            match tokio::time::timeout(bound, probe.probe()).await {
                Ok(Ok(reachable)) => reachable,
                Ok(Err(e)) => {
                    debug!(error = %e, "reachability probe failed");
                    false
                }
                Err(_) => {
                    debug!(timeout_ms = bound.as_millis() as u64, "reachability probe timed out");
                    false
                }
            }
        };

        self.apply(reachable, ConnectivitySource::Probe);
        reachable
    }

    /// Resolve once the monitor reports online, or fail after `timeout`.
    pub async fn wait_for_online(&self, timeout: Duration) -> Result<()> {
        let mut rx = self.online_tx.subscribe();
        let outcome =
            tokio::time::timeout(timeout, rx.wait_for(|online| *online)).await.map(|r| r.map(|_| ()));
        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(LiefClockError::Internal("network monitor dropped".into())),
            Err(_) => Err(LiefClockError::Timeout(format!(
                "still offline after {}ms",
                timeout.as_millis()
            ))),
        }
    }

    /// Start the periodic probe loop. Without a probe this is a no-op.
    #[instrument(skip(self))]
    pub fn start(self: &Arc<Self>) -> Result<()> {
        if self.is_running() {
            return Err(LiefClockError::Internal("Network monitor already running".into()));
        }
        if self.probe.is_none() {
            debug!("no reachability probe configured; relying on host events");
            return Ok(());
        }

        let cancel = CancellationToken::new();
        *self.cancellation.lock() = cancel.clone();

        let monitor = Arc::downgrade(self);
        let interval = self.config.probe_interval;
        let handle = tokio::spawn(Self::probe_loop(monitor, interval, cancel));
        *self.task_handle.lock() = Some(handle);

        info!(interval_secs = interval.as_secs(), "Network monitor started");
        Ok(())
    }

    /// Stop the probe loop and wait for it to finish.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<()> {
        self.cancellation.lock().cancel();

        let Some(handle) = self.task_handle.lock().take() else {
            return Ok(());
        };

        match tokio::time::timeout(self.config.join_timeout, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Network monitor task panicked: {}", e);
                return Err(LiefClockError::Internal("Network monitor task panicked".into()));
            }
            Err(_) => {
                warn!("Network monitor task did not complete within timeout");
                return Err(LiefClockError::Timeout("Network monitor stop".into()));
            }
        }

        info!("Network monitor stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.lock().as_ref().is_some_and(|handle| !handle.is_finished())
    }

    async fn probe_loop(monitor: Weak<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("Network probe loop cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    let Some(monitor) = monitor.upgrade() else { break };
                    monitor.check_now().await;
                }
            }
        }
    }

    fn probe_bound(&self) -> Duration {
        self.config.probe_timeout.saturating_mul(2)
    }

    /// Record the observed state; notify listeners only on change.
    fn apply(&self, online: bool, source: ConnectivitySource) -> bool {
        let now = Utc::now();
        let change = {
            let mut state = self.state.lock();
            if state.online == online {
                return false;
            }
            state.online = online;

            let offline_duration_ms = if online {
                state.last_offline_at.map(|at| (now - at).num_milliseconds())
            } else {
                None
            };
            if online {
                state.last_online_at = Some(now);
            } else {
                state.last_offline_at = Some(now);
            }

            NetworkChange {
                event: NetworkEvent::from_online(online),
                source,
                at: now,
                offline_duration_ms,
            }
        };

        self.online_tx.send_replace(online);
        info!(event = %change.event, source = ?source, "network status changed");
        self.listeners.emit(&change);
        true
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.cancellation.get_mut().cancel();
    }
}
