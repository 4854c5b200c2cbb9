//! Database operations for the `collections` table.

use sqlx::PgPool;

use prestasync_core::catalog::{Collection, CollectionMetadata, CollectionUpdate, NewCollection};
use prestasync_core::store::StoreError;

#[derive(Debug, sqlx::FromRow)]
struct CollectionRow {
    id: i64,
    title: String,
    handle: String,
    metadata: serde_json::Value,
}

impl CollectionRow {
    fn into_collection(self) -> Result<Collection, StoreError> {
        let metadata: CollectionMetadata =
            serde_json::from_value(self.metadata).map_err(StoreError::backend)?;
        Ok(Collection {
            id: self.id,
            title: self.title,
            handle: self.handle,
            metadata,
        })
    }
}

/// Maps a unique-index violation on `handle` to the typed conflict error so
/// two source categories sharing a handle surface instead of merging.
fn map_handle_conflict(err: sqlx::Error, handle: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::DuplicateHandle {
                handle: handle.to_owned(),
            };
        }
    }
    StoreError::backend(err)
}

/// Looks up a collection by its handle.
///
/// # Errors
///
/// Returns [`StoreError::Backend`] if the query fails.
pub async fn get_by_handle(pool: &PgPool, handle: &str) -> Result<Option<Collection>, StoreError> {
    sqlx::query_as::<_, CollectionRow>(
        "SELECT id, title, handle, metadata FROM collections WHERE handle = $1",
    )
    .bind(handle)
    .fetch_optional(pool)
    .await
    .map_err(StoreError::backend)?
    .map(CollectionRow::into_collection)
    .transpose()
}

/// Returns every collection, oldest first.
///
/// # Errors
///
/// Returns [`StoreError::Backend`] if the query fails.
pub async fn list_all(pool: &PgPool) -> Result<Vec<Collection>, StoreError> {
    sqlx::query_as::<_, CollectionRow>(
        "SELECT id, title, handle, metadata FROM collections ORDER BY id",
    )
    .fetch_all(pool)
    .await
    .map_err(StoreError::backend)?
    .into_iter()
    .map(CollectionRow::into_collection)
    .collect()
}

/// Inserts a new collection.
///
/// # Errors
///
/// Returns [`StoreError::DuplicateHandle`] on a handle collision, or
/// [`StoreError::Backend`] on any other failure.
pub async fn create(pool: &PgPool, collection: NewCollection) -> Result<Collection, StoreError> {
    let metadata = serde_json::to_value(&collection.metadata).map_err(StoreError::backend)?;

    let row = sqlx::query_as::<_, CollectionRow>(
        "INSERT INTO collections (title, handle, metadata) \
         VALUES ($1, $2, $3::jsonb) \
         RETURNING id, title, handle, metadata",
    )
    .bind(&collection.title)
    .bind(&collection.handle)
    .bind(metadata)
    .fetch_one(pool)
    .await
    .map_err(|e| map_handle_conflict(e, &collection.handle))?;

    row.into_collection()
}

/// Applies a partial update; `None` fields keep their stored values.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] if the id does not exist,
/// [`StoreError::DuplicateHandle`] on a handle collision, or
/// [`StoreError::Backend`] on any other failure.
pub async fn update(
    pool: &PgPool,
    id: i64,
    update: CollectionUpdate,
) -> Result<Collection, StoreError> {
    let handle_context = update.handle.clone().unwrap_or_default();

    let row = sqlx::query_as::<_, CollectionRow>(
        "UPDATE collections SET \
             title = COALESCE($2, title), \
             handle = COALESCE($3, handle), \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, title, handle, metadata",
    )
    .bind(id)
    .bind(update.title)
    .bind(update.handle)
    .fetch_optional(pool)
    .await
    .map_err(|e| map_handle_conflict(e, &handle_context))?
    .ok_or(StoreError::NotFound)?;

    row.into_collection()
}
