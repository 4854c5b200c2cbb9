//! Full-pass import orchestration: categories first, then products.
//!
//! Per-item failures are isolated — a category or product that cannot be
//! synced is logged with its source id and skipped; the pass runs to
//! completion and reports counts. Only a configuration error discovered
//! before any item is processed aborts the pass.

use chrono::Utc;

use prestasync_client::PrestashopClient;
use prestasync_core::store::{CatalogStore, FileStore};

use crate::category::CollectionReconciler;
use crate::error::{ConfigurationError, SyncError};
use crate::product::ProductReconciler;
use crate::report::{ItemFailure, PassReport, SyncSummary};

/// Behaviour switches for a pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Re-slugify every product handle instead of trusting `link_rewrite`.
    pub generate_new_handles: bool,
}

/// Runs one full sync pass against a source store and a target catalog.
pub struct Importer<'a, S, F> {
    client: &'a PrestashopClient,
    store: &'a S,
    files: &'a F,
    options: SyncOptions,
}

impl<'a, S: CatalogStore, F: FileStore> Importer<'a, S, F> {
    pub fn new(client: &'a PrestashopClient, store: &'a S, files: &'a F, options: SyncOptions) -> Self {
        Self {
            client,
            store,
            files,
            options,
        }
    }

    /// One full pass: every category, then every product, then the
    /// watermark. Returns the summary with per-item failure detail.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Config`] when store defaults are missing — nothing is
    ///   processed.
    /// - [`SyncError::Source`] when a top-level listing cannot be fetched.
    /// - [`SyncError::Store`] when the watermark cannot be read or written.
    pub async fn run_full_sync(&self) -> Result<SyncSummary, SyncError> {
        let defaults = self.store.store_defaults().await?;
        if defaults.currencies.is_empty() {
            return Err(ConfigurationError::MissingCurrencies.into());
        }
        if defaults.shipping_profile_id.is_none() {
            return Err(ConfigurationError::MissingShippingProfile.into());
        }

        // Read for observability only: every pass re-scans the full catalog.
        match self.store.get_sync_watermark().await? {
            Some(at) => tracing::info!(last_sync = %at, "starting full sync pass"),
            None => tracing::info!("starting first full sync pass"),
        }

        let mut report = PassReport::default();

        tracing::info!("importing categories");
        let categories = self.client.list_categories().await?;
        let collection_reconciler = CollectionReconciler::new(self.store);
        let mut categories_processed = 0usize;

        for summary in &categories {
            let result = async {
                let category = self.client.get_category(summary.id).await?;
                collection_reconciler.reconcile(&category).await
            }
            .await;

            match result {
                Ok(outcome) => {
                    report.record_collection(outcome);
                    categories_processed += 1;
                }
                Err(err) => {
                    tracing::error!(
                        category_id = summary.id,
                        error = %err,
                        "category sync failed — skipping"
                    );
                    report.category_failures.push(ItemFailure {
                        source_id: summary.id,
                        error: err.to_string(),
                    });
                }
            }
        }

        if categories_processed > 0 {
            tracing::info!(count = categories_processed, "categories imported or updated");
        } else {
            tracing::info!("no categories imported or updated");
        }

        tracing::info!("importing products");
        let products = self.client.list_products().await?;
        let product_reconciler = ProductReconciler::new(
            self.client,
            self.store,
            self.files,
            &defaults,
            self.options.generate_new_handles,
        );
        let mut products_processed = 0usize;

        for summary in &products {
            let result = async {
                let product = self.client.get_product(summary.id).await?;

                // An image-listing failure downgrades to "detail carries no
                // images" — the rest of the product still syncs.
                let images = match self.client.get_product_images(product.id).await {
                    Ok(declinations) => {
                        Some(declinations.into_iter().map(|d| d.href).collect::<Vec<_>>())
                    }
                    Err(err) => {
                        tracing::warn!(
                            product_id = product.id,
                            error = %err,
                            "image listing failed — syncing product without images"
                        );
                        None
                    }
                };

                product_reconciler.sync(&product, images).await
            }
            .await;

            match result {
                Ok(outcome) => {
                    report.record_product(outcome);
                    products_processed += 1;
                }
                Err(err) => {
                    tracing::error!(
                        product_id = summary.id,
                        error = %err,
                        "product sync failed — skipping"
                    );
                    report.product_failures.push(ItemFailure {
                        source_id: summary.id,
                        error: err.to_string(),
                    });
                }
            }
        }

        if products_processed > 0 {
            tracing::info!(count = products_processed, "products imported or updated");
        } else {
            tracing::info!("no products imported or updated");
        }

        self.store.set_sync_watermark(Utc::now()).await?;

        Ok(SyncSummary {
            categories_processed,
            products_processed,
            report,
        })
    }
}
