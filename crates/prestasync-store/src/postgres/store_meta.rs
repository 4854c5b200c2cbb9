//! Store-level settings: the sync watermark and the store defaults the
//! engine validates at pass start. Both live as jsonb values in the
//! `store_settings` key/value table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use prestasync_core::catalog::StoreDefaults;
use prestasync_core::store::StoreError;

const WATERMARK_KEY: &str = "prestashop_last_sync";
const DEFAULTS_KEY: &str = "store_defaults";

async fn get_value(pool: &PgPool, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
    sqlx::query_scalar::<_, serde_json::Value>(
        "SELECT value FROM store_settings WHERE key = $1",
    )
    .bind(key)
    .fetch_optional(pool)
    .await
    .map_err(StoreError::backend)
}

async fn set_value(pool: &PgPool, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO store_settings (key, value) VALUES ($1, $2::jsonb) \
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await
    .map_err(StoreError::backend)?;
    Ok(())
}

/// Timestamp of the last completed sync pass, if one was recorded.
///
/// # Errors
///
/// Returns [`StoreError::Backend`] on query failure or a malformed stored
/// timestamp.
pub async fn get_watermark(pool: &PgPool) -> Result<Option<DateTime<Utc>>, StoreError> {
    let value = get_value(pool, WATERMARK_KEY).await?;
    match value.as_ref().and_then(serde_json::Value::as_str) {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(StoreError::backend),
        None => Ok(None),
    }
}

/// Records the completion timestamp of a sync pass.
///
/// # Errors
///
/// Returns [`StoreError::Backend`] if the upsert fails.
pub async fn set_watermark(pool: &PgPool, at: DateTime<Utc>) -> Result<(), StoreError> {
    set_value(
        pool,
        WATERMARK_KEY,
        serde_json::Value::String(at.to_rfc3339()),
    )
    .await
}

/// Store defaults (currencies, shipping profile). A store with none
/// configured yields the empty defaults, which the engine rejects as a
/// configuration error before processing anything.
///
/// # Errors
///
/// Returns [`StoreError::Backend`] on query failure or a malformed value.
pub async fn get_store_defaults(pool: &PgPool) -> Result<StoreDefaults, StoreError> {
    match get_value(pool, DEFAULTS_KEY).await? {
        Some(value) => serde_json::from_value(value).map_err(StoreError::backend),
        None => Ok(StoreDefaults::default()),
    }
}

/// Writes the store defaults; used by setup tooling, not the sync pass.
///
/// # Errors
///
/// Returns [`StoreError::Backend`] if the upsert fails.
pub async fn set_store_defaults(
    pool: &PgPool,
    defaults: &StoreDefaults,
) -> Result<(), StoreError> {
    let value = serde_json::to_value(defaults).map_err(StoreError::backend)?;
    set_value(pool, DEFAULTS_KEY, value).await
}
