//! Shared helpers for infra integration tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use liefclock_core::{NetworkMonitor, NetworkMonitorConfig};
use liefclock_domain::{ActionKind, ActionSource, ClockAction, ClockPayload, NewPendingAction};
use liefclock_infra::database::DbManager;
use tempfile::TempDir;

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a new migrated database in a fresh temp dir.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let manager = open(&temp_dir);
        Self { manager, temp_dir }
    }

    /// Drop the pool and open the same file again, as after a restart.
    pub fn reopen(self) -> Self {
        let Self { manager, temp_dir } = self;
        drop(manager);
        let manager = open(&temp_dir);
        Self { manager, temp_dir }
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

fn open(temp_dir: &TempDir) -> Arc<DbManager> {
    let manager =
        DbManager::new(temp_dir.path().join("liefclock.db"), 4).expect("db manager should be created");
    manager.run_migrations().expect("migrations should run");
    Arc::new(manager)
}

pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).single().expect("valid timestamp")
}

pub fn new_action(kind: ActionKind, note: &str, seconds: i64) -> NewPendingAction {
    NewPendingAction::new(
        ClockAction::new(kind, ClockPayload::new(52.37, 4.89).with_note(note)),
        ActionSource::Manual,
    )
    .with_created_at(at(seconds))
}

/// Monitor pinned to the given state with no probe loop.
pub fn monitor(online: bool) -> Arc<NetworkMonitor> {
    Arc::new(NetworkMonitor::new(
        None,
        NetworkMonitorConfig {
            probe_interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(1),
            assume_online: online,
            join_timeout: Duration::from_secs(1),
        },
    ))
}
