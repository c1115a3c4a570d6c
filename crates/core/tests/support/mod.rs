//! Shared test helpers for `liefclock-core` integration tests.
//!
//! In-memory and scripted implementations of the core ports so scenario
//! tests can focus on behaviour instead of wiring.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::channel::mpsc;
use futures::stream::BoxStream;
use futures::StreamExt;
use liefclock_core::{
    ActionStore, ClockGateway, NetworkMonitor, NetworkMonitorConfig, Notification,
    NotificationSink, PositionOptions, PositionSource, ShiftCache, UserDataCache,
    VisibilityObserver,
};
use liefclock_domain::{
    ActionKind, ActionSource, ClockAction, ClockPayload, LiefClockError, NewPendingAction,
    PendingAction, PermissionState, Position, Result, Shift, ShiftRef, Visibility,
};
use parking_lot::Mutex;
use serde_json::Value;

/// Deterministic timestamp `seconds` after a fixed epoch.
pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).single().unwrap()
}

pub fn new_action(kind: ActionKind, created_at: DateTime<Utc>) -> NewPendingAction {
    NewPendingAction::new(ClockAction::new(kind, ClockPayload::new(1.0, 1.0)), ActionSource::Manual)
        .with_created_at(created_at)
}

pub fn monitor(online: bool) -> Arc<NetworkMonitor> {
    Arc::new(NetworkMonitor::new(
        None,
        NetworkMonitorConfig { assume_online: online, ..NetworkMonitorConfig::default() },
    ))
}

// ---------------------------------------------------------------------------
// Action store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreInner {
    next_id: i64,
    actions: Vec<PendingAction>,
}

/// In-memory `ActionStore` with FIFO semantics matching the SQLite adapter.
#[derive(Default)]
pub struct MemoryActionStore {
    inner: Mutex<StoreInner>,
    fail_writes: Mutex<bool>,
}

impl MemoryActionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every write fail with a storage error.
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    /// Insert an action with a preset retry count.
    pub fn seed(&self, action: &NewPendingAction, retry_count: u32) -> i64 {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.actions.push(PendingAction {
            id,
            action: action.action.clone(),
            source: action.source,
            created_at: action.created_at,
            synced: false,
            synced_at: None,
            retry_count,
            last_retry_at: None,
        });
        id
    }

    pub fn all(&self) -> Vec<PendingAction> {
        self.inner.lock().actions.clone()
    }

    pub fn find(&self, id: i64) -> Option<PendingAction> {
        self.inner.lock().actions.iter().find(|a| a.id == id).cloned()
    }

    fn check_writable(&self) -> Result<()> {
        if *self.fail_writes.lock() {
            return Err(LiefClockError::Storage("disk full".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ActionStore for MemoryActionStore {
    async fn add_action(&self, action: &NewPendingAction) -> Result<i64> {
        self.check_writable()?;
        Ok(self.seed(action, 0))
    }

    async fn pending_actions(&self) -> Result<Vec<PendingAction>> {
        let mut pending: Vec<_> =
            self.inner.lock().actions.iter().filter(|a| !a.synced).cloned().collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(pending)
    }

    async fn mark_synced(&self, id: i64) -> Result<bool> {
        self.check_writable()?;
        let mut inner = self.inner.lock();
        Ok(match inner.actions.iter_mut().find(|a| a.id == id) {
            Some(action) => {
                action.synced = true;
                action.synced_at = Some(Utc::now());
                true
            }
            None => false,
        })
    }

    async fn increment_retry(&self, id: i64) -> Result<u32> {
        self.check_writable()?;
        let mut inner = self.inner.lock();
        let action = inner
            .actions
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| LiefClockError::InvalidInput(format!("no action {id}")))?;
        action.retry_count += 1;
        action.last_retry_at = Some(Utc::now());
        Ok(action.retry_count)
    }

    async fn clear_synced(&self) -> Result<usize> {
        self.check_writable()?;
        let mut inner = self.inner.lock();
        let before = inner.actions.len();
        inner.actions.retain(|a| !a.synced);
        Ok(before - inner.actions.len())
    }

    async fn get_action(&self, id: i64) -> Result<Option<PendingAction>> {
        Ok(self.find(id))
    }

    async fn pending_count(&self) -> Result<usize> {
        Ok(self.inner.lock().actions.iter().filter(|a| !a.synced).count())
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// `ClockGateway` that replays scripted outcomes in call order.
///
/// Calls beyond the script succeed with a generated shift reference.
#[derive(Default)]
pub struct ScriptedGateway {
    script: Mutex<VecDeque<Result<ShiftRef>>>,
    calls: Mutex<Vec<(ActionKind, ClockPayload)>>,
    delay: Mutex<Duration>,
    shifts: Mutex<Option<Result<Vec<Shift>>>>,
    counter: AtomicUsize,
    on_call: Mutex<Option<Box<dyn Fn(usize) + Send + Sync>>>,
}

impl ScriptedGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, outcome: Result<ShiftRef>) {
        self.script.lock().push_back(outcome);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn set_shifts(&self, shifts: Result<Vec<Shift>>) {
        *self.shifts.lock() = Some(shifts);
    }

    /// Hook invoked with the zero-based call index before each mutation.
    pub fn on_call(&self, hook: impl Fn(usize) + Send + Sync + 'static) {
        *self.on_call.lock() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> Vec<(ActionKind, ClockPayload)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    async fn respond(&self, kind: ActionKind, payload: &ClockPayload) -> Result<ShiftRef> {
        let index = {
            let mut calls = self.calls.lock();
            calls.push((kind, payload.clone()));
            calls.len() - 1
        };
        if let Some(hook) = self.on_call.lock().as_ref() {
            hook(index);
        }

        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.script.lock().pop_front();
        scripted.unwrap_or_else(|| {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(ShiftRef::new(format!("shift-{n}"), Utc::now()))
        })
    }
}

#[async_trait]
impl ClockGateway for ScriptedGateway {
    async fn clock_in(&self, payload: &ClockPayload) -> Result<ShiftRef> {
        self.respond(ActionKind::ClockIn, payload).await
    }

    async fn clock_out(&self, payload: &ClockPayload) -> Result<ShiftRef> {
        self.respond(ActionKind::ClockOut, payload).await
    }

    async fn shifts(&self) -> Result<Vec<Shift>> {
        self.shifts.lock().clone().unwrap_or_else(|| Ok(Vec::new()))
    }
}

// ---------------------------------------------------------------------------
// Caches
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryCache {
    shifts: Mutex<Vec<Shift>>,
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl ShiftCache for MemoryCache {
    async fn cache_shifts(&self, shifts: &[Shift]) -> Result<()> {
        *self.shifts.lock() = shifts.to_vec();
        Ok(())
    }

    async fn cached_shifts(&self) -> Result<Vec<Shift>> {
        let mut shifts = self.shifts.lock().clone();
        shifts.sort_by(|a, b| b.clock_in_at.cmp(&a.clock_in_at));
        Ok(shifts)
    }
}

#[async_trait]
impl UserDataCache for MemoryCache {
    async fn put(&self, key: &str, value: &Value) -> Result<()> {
        self.values.lock().insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.lock().get(key).cloned())
    }
}

// ---------------------------------------------------------------------------
// Device capabilities
// ---------------------------------------------------------------------------

/// Position source driven by the test through a channel.
pub struct ScriptedPositions {
    permission: Mutex<PermissionState>,
    initial: Mutex<Option<Result<Position>>>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Result<Position>>>>,
    sender: mpsc::UnboundedSender<Result<Position>>,
}

impl ScriptedPositions {
    pub fn new(permission: PermissionState) -> Arc<Self> {
        let (sender, receiver) = mpsc::unbounded();
        Arc::new(Self {
            permission: Mutex::new(permission),
            initial: Mutex::new(None),
            receiver: Mutex::new(Some(receiver)),
            sender,
        })
    }

    pub fn set_initial(&self, position: Result<Position>) {
        *self.initial.lock() = Some(position);
    }

    pub fn send(&self, sample: Result<Position>) {
        let _ = self.sender.unbounded_send(sample);
    }
}

#[async_trait]
impl PositionSource for ScriptedPositions {
    async fn permission(&self) -> PermissionState {
        *self.permission.lock()
    }

    async fn current_position(&self, _options: &PositionOptions) -> Result<Position> {
        self.initial
            .lock()
            .take()
            .unwrap_or_else(|| Err(LiefClockError::Timeout("no fix".into())))
    }

    fn watch_positions(&self, _options: &PositionOptions) -> BoxStream<'static, Result<Position>> {
        match self.receiver.lock().take() {
            Some(receiver) => receiver.boxed(),
            None => futures::stream::empty().boxed(),
        }
    }
}

/// Visibility observer driven by the test through a channel.
pub struct ScriptedVisibility {
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Visibility>>>,
    sender: mpsc::UnboundedSender<Visibility>,
}

impl ScriptedVisibility {
    pub fn new() -> Arc<Self> {
        let (sender, receiver) = mpsc::unbounded();
        Arc::new(Self { receiver: Mutex::new(Some(receiver)), sender })
    }

    pub fn send(&self, visibility: Visibility) {
        let _ = self.sender.unbounded_send(visibility);
    }
}

impl VisibilityObserver for ScriptedVisibility {
    fn visibility_changes(&self) -> BoxStream<'static, Visibility> {
        match self.receiver.lock().take() {
            Some(receiver) => receiver.boxed(),
            None => futures::stream::empty().boxed(),
        }
    }
}

pub struct RecordingNotifier {
    permission: PermissionState,
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new(permission: PermissionState) -> Arc<Self> {
        Arc::new(Self { permission, sent: Mutex::new(Vec::new()) })
    }

    pub fn titles(&self) -> Vec<String> {
        self.sent.lock().iter().map(|n| n.title.clone()).collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    fn permission(&self) -> PermissionState {
        self.permission
    }

    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().push(notification.clone());
        Ok(())
    }
}

/// Poll `condition` until it holds, advancing (possibly paused) time.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}
