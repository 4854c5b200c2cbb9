//! Category → collection reconciliation.

use prestasync_client::types::RawCategory;
use prestasync_core::store::{CatalogStore, StoreError};

use crate::error::SyncError;
use crate::normalize::{collection_update, normalize_collection};
use crate::report::CollectionOutcome;

/// Reconciles one source category against the target collection set.
pub struct CollectionReconciler<'a, S> {
    store: &'a S,
}

impl<'a, S: CatalogStore> CollectionReconciler<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Create-or-update for one category, keyed by the handle derived from
    /// `link_rewrite` (empty string when the source omits it).
    ///
    /// The diff-before-write means an unchanged category issues no mutation
    /// at all. A collection found by handle but correlated with a different
    /// source category is a genuine conflict, surfaced as
    /// [`StoreError::DuplicateHandle`] — two categories sharing a
    /// `link_rewrite` must never collapse into one collection.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] on a handle conflict or any store
    /// failure.
    pub async fn reconcile(&self, category: &RawCategory) -> Result<CollectionOutcome, SyncError> {
        let desired = normalize_collection(category);

        match self.store.get_collection_by_handle(&desired.handle).await? {
            Some(existing) if existing.metadata.prestashop_id != category.id => {
                Err(StoreError::DuplicateHandle {
                    handle: desired.handle,
                }
                .into())
            }
            Some(existing) => {
                let update = collection_update(&desired, &existing);
                if update.is_empty() {
                    tracing::debug!(
                        category_id = category.id,
                        handle = %desired.handle,
                        "collection unchanged"
                    );
                    return Ok(CollectionOutcome::Unchanged);
                }
                self.store.update_collection(existing.id, update).await?;
                tracing::info!(
                    category_id = category.id,
                    collection_id = existing.id,
                    "collection updated"
                );
                Ok(CollectionOutcome::Updated)
            }
            None => {
                let created = self.store.create_collection(desired).await?;
                tracing::info!(
                    category_id = category.id,
                    collection_id = created.id,
                    "collection created"
                );
                Ok(CollectionOutcome::Created)
            }
        }
    }
}
