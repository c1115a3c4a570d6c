//! SQLite implementation of the shift cache and the user data cache.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use liefclock_core::{ShiftCache, UserDataCache};
use liefclock_domain::{LiefClockError, Result as DomainResult, Shift};
use rusqlite::{params, OptionalExtension};
use serde_json::Value;
use tokio::task;
use tracing::debug;

use super::manager::{map_join_error, map_sql_error, DbManager};

/// Offline copies of server data.
pub struct SqliteCacheStore {
    db: Arc<DbManager>,
}

impl SqliteCacheStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ShiftCache for SqliteCacheStore {
    async fn cache_shifts(&self, shifts: &[Shift]) -> DomainResult<()> {
        let rows = shifts
            .iter()
            .map(|shift| {
                serde_json::to_string(shift)
                    .map(|json| (shift.id.clone(), shift.clock_in_at.timestamp_millis(), json))
                    .map_err(|e| LiefClockError::InvalidInput(format!("unserializable shift: {e}")))
            })
            .collect::<DomainResult<Vec<_>>>()?;
        let db = Arc::clone(&self.db);
        let now = Utc::now().timestamp_millis();

        let written = task::spawn_blocking(move || -> DomainResult<usize> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            tx.execute("DELETE FROM cached_shifts", []).map_err(map_sql_error)?;
            {
                let mut stmt = tx
                    .prepare(
                        "INSERT OR REPLACE INTO cached_shifts (id, clock_in_at, shift_json, cached_at)
                         VALUES (?1, ?2, ?3, ?4)",
                    )
                    .map_err(map_sql_error)?;
                for (id, clock_in_at, json) in &rows {
                    stmt.execute(params![id, clock_in_at, json, now]).map_err(map_sql_error)?;
                }
            }
            tx.commit().map_err(map_sql_error)?;
            Ok(rows.len())
        })
        .await
        .map_err(map_join_error)??;

        debug!(shifts = written, "Shift cache replaced");
        Ok(())
    }

    async fn cached_shifts(&self) -> DomainResult<Vec<Shift>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> DomainResult<Vec<Shift>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare("SELECT shift_json FROM cached_shifts ORDER BY clock_in_at DESC, id")
                .map_err(map_sql_error)?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0)).map_err(map_sql_error)?;

            let mut shifts = Vec::new();
            for json in rows {
                let json = json.map_err(map_sql_error)?;
                let shift = serde_json::from_str(&json)
                    .map_err(|e| LiefClockError::Storage(format!("corrupt cached shift: {e}")))?;
                shifts.push(shift);
            }
            Ok(shifts)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl UserDataCache for SqliteCacheStore {
    async fn put(&self, key: &str, value: &Value) -> DomainResult<()> {
        let key = key.to_string();
        let json = value.to_string();
        let now = Utc::now().timestamp_millis();
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO cached_user_data (key, value_json, cached_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json,
                                               cached_at = excluded.cached_at",
                params![key, json, now],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get(&self, key: &str) -> DomainResult<Option<Value>> {
        let key = key.to_string();
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<Value>> {
            let conn = db.get_connection()?;
            let json: Option<String> = conn
                .query_row(
                    "SELECT value_json FROM cached_user_data WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()
                .map_err(map_sql_error)?;
            json.map(|json| {
                serde_json::from_str(&json)
                    .map_err(|e| LiefClockError::Storage(format!("corrupt cached value: {e}")))
            })
            .transpose()
        })
        .await
        .map_err(map_join_error)?
    }
}
