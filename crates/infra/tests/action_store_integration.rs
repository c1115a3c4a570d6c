//! Integration tests for the SQLite durable store
//!
//! **Coverage:**
//! - FIFO ordering by creation time, id as tie-breaker
//! - Durability across a pool restart
//! - Synced/cleared lifecycle and retry bookkeeping
//! - Concurrent writers
//! - Record counts across the three record sets

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use std::sync::Arc;

use liefclock_core::{ActionStore, ShiftCache, UserDataCache};
use liefclock_domain::{ActionKind, StorageStats};
use liefclock_infra::database::{SqliteActionStore, SqliteCacheStore};
use serde_json::json;
use support::{new_action, TestDatabase};

#[tokio::test]
async fn pending_actions_come_back_oldest_first() {
    let db = TestDatabase::new();
    let store = SqliteActionStore::new(db.manager.clone());

    // Inserted out of order; two share a timestamp.
    let late = store.add_action(&new_action(ActionKind::ClockOut, "late", 30)).await.unwrap();
    let early = store.add_action(&new_action(ActionKind::ClockIn, "early", 10)).await.unwrap();
    let tie = store.add_action(&new_action(ActionKind::ClockIn, "tie", 30)).await.unwrap();

    let ids: Vec<_> = store.pending_actions().await.unwrap().iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![early, late, tie]);
}

#[tokio::test]
async fn committed_actions_survive_restart() {
    let db = TestDatabase::new();
    let store = SqliteActionStore::new(db.manager.clone());
    let id = store.add_action(&new_action(ActionKind::ClockIn, "before crash", 0)).await.unwrap();
    store.increment_retry(id).await.unwrap();
    drop(store);

    let db = db.reopen();
    let store = SqliteActionStore::new(db.manager.clone());

    let pending = store.pending_actions().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, id);
    assert_eq!(pending[0].payload().note, "before crash");
    assert_eq!(pending[0].retry_count, 1);
    assert!(pending[0].last_retry_at.is_some());
}

#[tokio::test]
async fn synced_actions_leave_pending_set_and_are_swept() {
    let db = TestDatabase::new();
    let store = SqliteActionStore::new(db.manager.clone());
    let first = store.add_action(&new_action(ActionKind::ClockIn, "a", 0)).await.unwrap();
    let second = store.add_action(&new_action(ActionKind::ClockOut, "b", 1)).await.unwrap();

    assert!(store.mark_synced(first).await.unwrap());
    assert!(!store.mark_synced(9_999).await.unwrap());

    assert_eq!(store.pending_count().await.unwrap(), 1);
    let synced = store.get_action(first).await.unwrap().unwrap();
    assert!(synced.synced);
    assert!(synced.synced_at.is_some());

    assert_eq!(store.clear_synced().await.unwrap(), 1);
    assert!(store.get_action(first).await.unwrap().is_none());
    assert_eq!(store.all_actions().await.unwrap().len(), 1);
    assert_eq!(store.pending_actions().await.unwrap()[0].id, second);
}

#[tokio::test]
async fn retry_count_accumulates() {
    let db = TestDatabase::new();
    let store = SqliteActionStore::new(db.manager.clone());
    let id = store.add_action(&new_action(ActionKind::ClockIn, "a", 0)).await.unwrap();

    assert_eq!(store.increment_retry(id).await.unwrap(), 1);
    assert_eq!(store.increment_retry(id).await.unwrap(), 2);
    assert_eq!(store.increment_retry(id).await.unwrap(), 3);

    let action = store.get_action(id).await.unwrap().unwrap();
    assert!(action.retries_exhausted(3));
    assert!(!action.synced);
}

#[tokio::test]
async fn concurrent_writers_get_distinct_ids() {
    let db = TestDatabase::new();
    let store = Arc::new(SqliteActionStore::new(db.manager.clone()));

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.add_action(&new_action(ActionKind::ClockIn, "burst", i)).await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap());
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 16);
    assert_eq!(store.pending_count().await.unwrap(), 16);
}

#[tokio::test]
async fn storage_stats_count_every_record_set() {
    let db = TestDatabase::new();
    let actions = SqliteActionStore::new(db.manager.clone());
    let cache = SqliteCacheStore::new(db.manager.clone());

    let synced = actions.add_action(&new_action(ActionKind::ClockIn, "a", 0)).await.unwrap();
    actions.add_action(&new_action(ActionKind::ClockOut, "b", 1)).await.unwrap();
    actions.mark_synced(synced).await.unwrap();
    cache.cache_shifts(&[]).await.unwrap();
    cache.put("workLocation", &json!({"latitude": 1.0, "longitude": 2.0})).await.unwrap();

    let stats = db.manager.storage_stats().unwrap();
    assert_eq!(
        stats,
        StorageStats { offline_actions: 2, pending_actions: 1, cached_shifts: 0, cached_user_data: 1 }
    );
}
