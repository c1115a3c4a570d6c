//! SQLite implementation of the durable action store (`offlineActions`).

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use liefclock_core::ActionStore;
use liefclock_domain::{
    ActionKind, ActionSource, ClockAction, ClockPayload, LiefClockError, NewPendingAction,
    PendingAction, Result as DomainResult,
};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use tracing::{debug, instrument};

use super::manager::{map_join_error, map_sql_error, DbManager, SqliteConnection};

const ACTION_COLUMNS: &str =
    "id, kind, payload_json, source, created_at, synced, synced_at, retry_count, last_retry_at";

const INSERT_SQL: &str = "INSERT INTO offline_actions (kind, payload_json, source, created_at)
     VALUES (?1, ?2, ?3, ?4)";

const MARK_SYNCED_SQL: &str = "UPDATE offline_actions SET synced = 1, synced_at = ?2 WHERE id = ?1";

const INCREMENT_RETRY_SQL: &str = "UPDATE offline_actions
     SET retry_count = retry_count + 1, last_retry_at = ?2
     WHERE id = ?1
     RETURNING retry_count";

const CLEAR_SYNCED_SQL: &str = "DELETE FROM offline_actions WHERE synced = 1";

/// SQLite-backed action store.
pub struct SqliteActionStore {
    db: Arc<DbManager>,
}

impl SqliteActionStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Run `op` on a pooled connection off the async runtime.
    async fn with_connection<T, F>(&self, op: F) -> DomainResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> DomainResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let mut conn = db.get_connection()?;
            op(&mut conn)
        })
        .await
        .map_err(map_join_error)?
    }

    /// All rows, synced or not, oldest first. Used for inspection.
    pub async fn all_actions(&self) -> DomainResult<Vec<PendingAction>> {
        self.with_connection(|conn| {
            let sql = format!("SELECT {ACTION_COLUMNS} FROM offline_actions ORDER BY created_at, id");
            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let rows = stmt.query_map([], map_action_row).map_err(map_sql_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(map_sql_error)
        })
        .await
    }
}

#[async_trait]
impl ActionStore for SqliteActionStore {
    #[instrument(skip(self, action), fields(kind = %action.action.kind()))]
    async fn add_action(&self, action: &NewPendingAction) -> DomainResult<i64> {
        let kind = action.action.kind();
        let payload = serde_json::to_string(action.action.payload())
            .map_err(|e| LiefClockError::InvalidInput(format!("unserializable payload: {e}")))?;
        let source = action.source;
        let created_at = action.created_at.timestamp_millis();

        let id = self
            .with_connection(move |conn| {
                let tx = conn.transaction().map_err(map_sql_error)?;
                tx.execute(INSERT_SQL, params![kind.as_str(), payload, source.as_str(), created_at])
                    .map_err(map_sql_error)?;
                let id = tx.last_insert_rowid();
                tx.commit().map_err(map_sql_error)?;
                Ok(id)
            })
            .await?;

        debug!(action_id = id, "Action persisted");
        Ok(id)
    }

    async fn pending_actions(&self) -> DomainResult<Vec<PendingAction>> {
        self.with_connection(|conn| {
            // One statement, one read snapshot.
            let sql = format!(
                "SELECT {ACTION_COLUMNS} FROM offline_actions WHERE synced = 0 ORDER BY created_at, id"
            );
            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let rows = stmt.query_map([], map_action_row).map_err(map_sql_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(map_sql_error)
        })
        .await
    }

    async fn mark_synced(&self, id: i64) -> DomainResult<bool> {
        let now = Utc::now().timestamp_millis();
        self.with_connection(move |conn| {
            let changed = conn.execute(MARK_SYNCED_SQL, params![id, now]).map_err(map_sql_error)?;
            Ok(changed > 0)
        })
        .await
    }

    async fn increment_retry(&self, id: i64) -> DomainResult<u32> {
        let now = Utc::now().timestamp_millis();
        self.with_connection(move |conn| {
            let count: Option<i64> = conn
                .query_row(INCREMENT_RETRY_SQL, params![id, now], |row| row.get(0))
                .optional()
                .map_err(map_sql_error)?;
            let count = count
                .ok_or_else(|| LiefClockError::InvalidInput(format!("unknown action id {id}")))?;
            Ok(u32::try_from(count).unwrap_or(u32::MAX))
        })
        .await
    }

    async fn clear_synced(&self) -> DomainResult<usize> {
        self.with_connection(|conn| conn.execute(CLEAR_SYNCED_SQL, []).map_err(map_sql_error))
            .await
    }

    async fn get_action(&self, id: i64) -> DomainResult<Option<PendingAction>> {
        self.with_connection(move |conn| {
            let sql = format!("SELECT {ACTION_COLUMNS} FROM offline_actions WHERE id = ?1");
            conn.query_row(&sql, params![id], map_action_row).optional().map_err(map_sql_error)
        })
        .await
    }

    async fn pending_count(&self) -> DomainResult<usize> {
        self.with_connection(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM offline_actions WHERE synced = 0", [], |row| {
                    row.get(0)
                })
                .map_err(map_sql_error)?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
        .await
    }
}

fn map_action_row(row: &Row<'_>) -> rusqlite::Result<PendingAction> {
    let kind: String = row.get(1)?;
    let kind = ActionKind::from_str(&kind).map_err(|e| conversion_error(1, e))?;
    let payload_json: String = row.get(2)?;
    let payload: ClockPayload =
        serde_json::from_str(&payload_json).map_err(|e| conversion_error(2, e.to_string()))?;
    let source: String = row.get(3)?;
    let source = ActionSource::from_str(&source).map_err(|e| conversion_error(3, e))?;

    Ok(PendingAction {
        id: row.get(0)?,
        action: ClockAction::new(kind, payload),
        source,
        created_at: millis_to_datetime(row.get(4)?),
        synced: row.get::<_, i64>(5)? != 0,
        synced_at: row.get::<_, Option<i64>>(6)?.map(millis_to_datetime),
        retry_count: u32::try_from(row.get::<_, i64>(7)?).unwrap_or(u32::MAX),
        last_retry_at: row.get::<_, Option<i64>>(8)?.map(millis_to_datetime),
    })
}

pub(crate) fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        Box::<dyn std::error::Error + Send + Sync>::from(message),
    )
}
