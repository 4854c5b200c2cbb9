//! Database operations for the `sync_runs` lifecycle table.
//!
//! A run moves `queued → running → succeeded | failed`; the CLI wraps each
//! full pass in a run so operators can see history and failure messages.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use prestasync_core::store::StoreError;

/// A row from the `sync_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub trigger_source: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub categories_processed: i32,
    pub products_processed: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

const COLUMNS: &str = "id, public_id, trigger_source, status, started_at, completed_at, \
     categories_processed, products_processed, error_message, created_at";

/// Creates a new sync run in `queued` status.
///
/// # Errors
///
/// Returns [`StoreError::Backend`] if the insert fails.
pub async fn create_sync_run(pool: &PgPool, trigger_source: &str) -> Result<SyncRunRow, StoreError> {
    let public_id = Uuid::new_v4();

    sqlx::query_as::<_, SyncRunRow>(&format!(
        "INSERT INTO sync_runs (public_id, trigger_source, status) \
         VALUES ($1, $2, 'queued') \
         RETURNING {COLUMNS}"
    ))
    .bind(public_id)
    .bind(trigger_source)
    .fetch_one(pool)
    .await
    .map_err(StoreError::backend)
}

/// Marks a run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`StoreError::Backend`] if the run is not in `queued` status or
/// the update fails.
pub async fn start_sync_run(pool: &PgPool, id: i64) -> Result<(), StoreError> {
    let result = sqlx::query(
        "UPDATE sync_runs SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await
    .map_err(StoreError::backend)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::backend(format!(
            "sync run {id} is not in 'queued' status"
        )));
    }
    Ok(())
}

/// Marks a run as `succeeded` with its item counts.
///
/// # Errors
///
/// Returns [`StoreError::Backend`] if the run is not in `running` status or
/// the update fails.
pub async fn complete_sync_run(
    pool: &PgPool,
    id: i64,
    categories_processed: i32,
    products_processed: i32,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        "UPDATE sync_runs \
         SET status = 'succeeded', completed_at = NOW(), \
             categories_processed = $1, products_processed = $2 \
         WHERE id = $3 AND status = 'running'",
    )
    .bind(categories_processed)
    .bind(products_processed)
    .bind(id)
    .execute(pool)
    .await
    .map_err(StoreError::backend)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::backend(format!(
            "sync run {id} is not in 'running' status"
        )));
    }
    Ok(())
}

/// Marks a run as `failed` with an error message.
///
/// # Errors
///
/// Returns [`StoreError::Backend`] if the run is not in `running` status or
/// the update fails.
pub async fn fail_sync_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), StoreError> {
    let result = sqlx::query(
        "UPDATE sync_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await
    .map_err(StoreError::backend)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::backend(format!(
            "sync run {id} is not in 'running' status"
        )));
    }
    Ok(())
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`StoreError::Backend`] if the query fails.
pub async fn list_sync_runs(pool: &PgPool, limit: i64) -> Result<Vec<SyncRunRow>, StoreError> {
    sqlx::query_as::<_, SyncRunRow>(&format!(
        "SELECT {COLUMNS} FROM sync_runs ORDER BY created_at DESC, id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(StoreError::backend)
}
