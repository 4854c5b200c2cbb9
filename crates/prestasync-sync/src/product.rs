//! Product/variant/option reconciliation — the heart of the sync.
//!
//! For each source product the reconciler resolves identity, derives the
//! option set, fans out over combinations, folds stock records into
//! quantity/backorder posture, mirrors images, and issues minimal writes
//! against the target catalog.
//!
//! Failure policy: a source fetch failure aborts the product (the caller
//! records and skips it); an individual target write failure is recorded in
//! the [`ProductOutcome`] and the rest of the aggregate still syncs.

use std::collections::BTreeSet;

use prestasync_client::types::{RawCombination, RawProduct};
use prestasync_client::{PrestashopClient, SourceError};
use prestasync_core::catalog::{
    NewOption, OptionUpdate, OptionValue, Product, StoreDefaults, Variant, VariantOptionValue,
};
use prestasync_core::store::{CatalogStore, FileStore, StoreError};
use prestasync_core::OptionValueMetadata;

use crate::error::SyncError;
use crate::identity::{resolve_identity, Identity};
use crate::images::ImagePipeline;
use crate::normalize::{
    combination_variant_update, default_variant_update, normalize_combination_variant,
    normalize_default_variant, normalize_option_value, normalize_product, product_update,
    unwrap_text, StockPolicy,
};
use crate::options::{discover_options, OptionDiscovery};
use crate::report::{ProductAction, ProductOutcome, WriteEntity, WriteFailure};

/// Reconciles one source product aggregate into the target catalog.
pub struct ProductReconciler<'a, S, F> {
    client: &'a PrestashopClient,
    store: &'a S,
    files: &'a F,
    defaults: &'a StoreDefaults,
    generate_new_handles: bool,
}

impl<'a, S: CatalogStore, F: FileStore> ProductReconciler<'a, S, F> {
    pub fn new(
        client: &'a PrestashopClient,
        store: &'a S,
        files: &'a F,
        defaults: &'a StoreDefaults,
        generate_new_handles: bool,
    ) -> Self {
        Self {
            client,
            store,
            files,
            defaults,
            generate_new_handles,
        }
    }

    /// Syncs one product. `images` is `Some` only when the image listing for
    /// the product detail resolved; `None` skips the image pipeline entirely.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the source becomes unavailable mid-product
    /// or a load-bearing store operation (identity lookup, product create)
    /// fails. Partial write failures are reported, not raised.
    pub async fn sync(
        &self,
        product: &RawProduct,
        images: Option<Vec<String>>,
    ) -> Result<ProductOutcome, SyncError> {
        match resolve_identity(self.store, product.id, &product.reference).await? {
            Identity::Existing(existing) => self.update_existing(product, &existing, images).await,
            Identity::StandaloneVariant(variant) => self.absorb_variant(product, &variant).await,
            Identity::New => self.create_new(product, images).await,
        }
    }

    // -- create path --------------------------------------------------------

    async fn create_new(
        &self,
        product: &RawProduct,
        images: Option<Vec<String>>,
    ) -> Result<ProductOutcome, SyncError> {
        let mut outcome = ProductOutcome::new(ProductAction::Created);

        let mut normalized =
            normalize_product(product, images.as_deref(), self.generate_new_handles);
        normalized.profile_id = self.defaults.shipping_profile_id.clone();
        normalized.collection_id = self.resolve_collection_id(product).await?;

        let discovery = discover_options(self.client, product).await?;
        normalized.options = discovery.options.into_vec();

        // Hosted URLs replace these after the upload step; the aggregate is
        // created without images.
        let source_images = std::mem::take(&mut normalized.images);
        let handle = normalized.handle.clone();

        let created = self.store.create_product(normalized).await?;
        tracing::info!(
            product_id = product.id,
            target_id = created.id,
            "product created"
        );

        if product.associations.combinations.is_empty() {
            let stock = self.base_stock(product).await?;
            let desired = normalize_default_variant(product, stock, &self.defaults.currencies);
            match self.store.create_variant(created.id, desired).await {
                Ok(_) => outcome.variants_created += 1,
                Err(err) => record_write_failure(
                    &mut outcome,
                    WriteEntity::Variant,
                    product.id,
                    &err,
                ),
            }
        } else {
            for combination_ref in &product.associations.combinations {
                self.upsert_combination_variant(product, &created, combination_ref.id, &mut outcome)
                    .await?;
            }
        }

        if images.is_some() {
            self.mirror_images(
                product,
                created.id,
                &handle,
                &source_images,
                &created.images,
                &mut outcome,
            )
            .await;
        }

        Ok(outcome)
    }

    // -- update path --------------------------------------------------------

    async fn update_existing(
        &self,
        product: &RawProduct,
        existing: &Product,
        images: Option<Vec<String>>,
    ) -> Result<ProductOutcome, SyncError> {
        let mut outcome = ProductOutcome::new(ProductAction::Updated);

        let mut normalized =
            normalize_product(product, images.as_deref(), self.generate_new_handles);
        normalized.collection_id = self.resolve_collection_id(product).await?;
        let source_images = std::mem::take(&mut normalized.images);

        let discovery = discover_options(self.client, product).await?;

        // Options first: variant upserts need every referenced option to
        // exist with a resolved id.
        for desired_option in discovery.options.iter() {
            match existing.option_by_source_id(desired_option.metadata.prestashop_id) {
                Some(current) => {
                    let update = option_refresh(desired_option, current, &discovery);
                    if update.is_empty() {
                        continue;
                    }
                    match self
                        .store
                        .update_option(existing.id, current.id, update)
                        .await
                    {
                        Ok(()) => outcome.options_updated += 1,
                        Err(err) => record_write_failure(
                            &mut outcome,
                            WriteEntity::Option,
                            desired_option.metadata.prestashop_id,
                            &err,
                        ),
                    }
                }
                None => match self.store.add_option(existing.id, desired_option.clone()).await {
                    Ok(_) => outcome.options_added += 1,
                    Err(err) => record_write_failure(
                        &mut outcome,
                        WriteEntity::Option,
                        desired_option.metadata.prestashop_id,
                        &err,
                    ),
                },
            }
        }

        if product.associations.combinations.is_empty() {
            self.sync_default_variant(product, existing, &mut outcome)
                .await?;
        } else {
            // Orphan variants go before orphan options: a variant must never
            // outlive an option it references.
            self.delete_orphan_variants(product, existing, &mut outcome)
                .await?;
            self.delete_orphan_options(existing, &discovery, &mut outcome)
                .await;

            // Re-read the aggregate so freshly added option ids and the
            // surviving variant set are visible to the fan-out.
            let refreshed = self
                .store
                .get_product_by_external_id(product.id)
                .await?
                .ok_or(StoreError::NotFound)?;

            for combination_ref in &product.associations.combinations {
                self.upsert_combination_variant(
                    product,
                    &refreshed,
                    combination_ref.id,
                    &mut outcome,
                )
                .await?;
            }
        }

        if images.is_some() {
            let handle = normalized.handle.clone();
            self.mirror_images(
                product,
                existing.id,
                &handle,
                &source_images,
                &existing.images,
                &mut outcome,
            )
            .await;
        }

        let update = product_update(&normalized, existing);
        if !update.is_empty() {
            match self.store.update_product(existing.id, update).await {
                Ok(_) => {
                    tracing::info!(
                        product_id = product.id,
                        target_id = existing.id,
                        "product fields updated"
                    );
                }
                Err(err) => {
                    record_write_failure(&mut outcome, WriteEntity::Product, product.id, &err);
                }
            }
        }

        Ok(outcome)
    }

    // -- absorb path --------------------------------------------------------

    /// The source product matches an existing variant by SKU: it was
    /// imported as a standalone simple product before its configurable
    /// parent appeared. Update that variant in place instead of creating a
    /// duplicate product; the variant keeps its title and options.
    async fn absorb_variant(
        &self,
        product: &RawProduct,
        existing: &Variant,
    ) -> Result<ProductOutcome, SyncError> {
        let mut outcome = ProductOutcome::new(ProductAction::AbsorbedVariant);

        let stock = self.base_stock(product).await?;
        let desired = normalize_default_variant(product, stock, &self.defaults.currencies);
        let update = default_variant_update(&desired, existing, false);
        if update.is_empty() {
            return Ok(outcome);
        }

        match self.store.update_variant(existing.id, update).await {
            Ok(_) => {
                outcome.variants_updated += 1;
                tracing::info!(
                    product_id = product.id,
                    variant_id = existing.id,
                    "standalone product absorbed into existing variant"
                );
            }
            Err(err) => {
                record_write_failure(&mut outcome, WriteEntity::Variant, product.id, &err);
            }
        }

        Ok(outcome)
    }

    // -- variant fan-out ----------------------------------------------------

    /// Fetches one combination and creates or updates its target variant.
    /// Updates only re-synchronize title, price, stock, and option
    /// selections.
    async fn upsert_combination_variant(
        &self,
        product: &RawProduct,
        target: &Product,
        combination_id: i64,
        outcome: &mut ProductOutcome,
    ) -> Result<(), SyncError> {
        let Some(combination) = self.client.get_combination(combination_id).await? else {
            tracing::warn!(
                product_id = product.id,
                combination_id,
                "combination listed on product but not retrievable — skipping"
            );
            return Ok(());
        };

        let selections = self.combination_selections(&combination, target).await?;
        let stock = self.combination_stock(product, combination_id).await?;
        let desired = normalize_combination_variant(
            &combination,
            &product.price,
            stock,
            selections,
            &self.defaults.currencies,
        );

        match target.variant_by_source_id(combination_id) {
            Some(existing) => {
                let update = combination_variant_update(&desired, existing);
                if update.is_empty() {
                    return Ok(());
                }
                match self.store.update_variant(existing.id, update).await {
                    Ok(_) => outcome.variants_updated += 1,
                    Err(err) => record_write_failure(
                        outcome,
                        WriteEntity::Variant,
                        combination_id,
                        &err,
                    ),
                }
            }
            None => match self.store.create_variant(target.id, desired).await {
                Ok(_) => outcome.variants_created += 1,
                Err(err) => {
                    record_write_failure(outcome, WriteEntity::Variant, combination_id, &err);
                }
            },
        }

        Ok(())
    }

    /// Maps a combination's option-value ids onto the target product's
    /// options. A value whose parent group is not an option of this product
    /// is skipped, mirroring how the source pairs values to products.
    async fn combination_selections(
        &self,
        combination: &RawCombination,
        target: &Product,
    ) -> Result<Vec<VariantOptionValue>, SourceError> {
        let mut selections = Vec::new();
        for value_ref in &combination.associations.product_option_values {
            let value = self.client.get_option_value(value_ref.id).await?;
            if let Some(option) = target.option_by_source_id(value.id_attribute_group) {
                selections.push(VariantOptionValue {
                    option_id: option.id,
                    value: unwrap_text(value.name.as_ref()),
                    metadata: OptionValueMetadata {
                        prestashop_value: value.id,
                    },
                });
            }
        }
        Ok(selections)
    }

    /// Probes the source for every target variant's combination; a variant
    /// whose combination the source no longer returns is deleted. Transport
    /// failures propagate — only a definitive "gone" deletes data.
    async fn delete_orphan_variants(
        &self,
        product: &RawProduct,
        existing: &Product,
        outcome: &mut ProductOutcome,
    ) -> Result<(), SyncError> {
        for variant in &existing.variants {
            if self
                .client
                .get_combination(variant.metadata.prestashop_id)
                .await?
                .is_some()
            {
                continue;
            }
            match self.store.delete_variant(variant.id).await {
                Ok(()) => {
                    outcome.variants_deleted += 1;
                    tracing::info!(
                        product_id = product.id,
                        variant_id = variant.id,
                        combination_id = variant.metadata.prestashop_id,
                        "variant deleted — combination gone from source"
                    );
                }
                Err(err) => record_write_failure(
                    outcome,
                    WriteEntity::Variant,
                    variant.metadata.prestashop_id,
                    &err,
                ),
            }
        }
        Ok(())
    }

    /// Deletes target options whose source attribute group is no longer in
    /// the discovered set. Runs after orphan-variant deletion.
    async fn delete_orphan_options(
        &self,
        existing: &Product,
        discovery: &OptionDiscovery,
        outcome: &mut ProductOutcome,
    ) {
        for current in &existing.options {
            if discovery.options.contains(current.metadata.prestashop_id) {
                continue;
            }
            match self.store.delete_option(existing.id, current.id).await {
                Ok(()) => outcome.options_removed += 1,
                Err(err) => record_write_failure(
                    outcome,
                    WriteEntity::Option,
                    current.metadata.prestashop_id,
                    &err,
                ),
            }
        }
    }

    /// Simple-product path on update. Exactly one variant present means it
    /// is the default and is updated in place. With several variants left
    /// over (a configurable product degraded to simple), the one matching
    /// the product's SKU is updated if present, otherwise a fresh default
    /// variant is created — repeated passes converge on a single "Default"
    /// instead of stacking duplicates.
    async fn sync_default_variant(
        &self,
        product: &RawProduct,
        existing: &Product,
        outcome: &mut ProductOutcome,
    ) -> Result<(), SyncError> {
        let stock = self.base_stock(product).await?;
        let desired = normalize_default_variant(product, stock, &self.defaults.currencies);

        let in_place = match existing.variants.as_slice() {
            [only] => Some(only),
            variants => variants
                .iter()
                .find(|v| desired.sku.is_some() && v.sku == desired.sku),
        };

        match in_place {
            Some(current) => {
                let update = default_variant_update(&desired, current, true);
                if update.is_empty() {
                    return Ok(());
                }
                match self.store.update_variant(current.id, update).await {
                    Ok(_) => outcome.variants_updated += 1,
                    Err(err) => {
                        record_write_failure(outcome, WriteEntity::Variant, product.id, &err);
                    }
                }
            }
            None => match self.store.create_variant(existing.id, desired).await {
                Ok(_) => outcome.variants_created += 1,
                Err(err) => {
                    record_write_failure(outcome, WriteEntity::Variant, product.id, &err);
                }
            },
        }
        Ok(())
    }

    // -- stock --------------------------------------------------------------

    /// The product-level stock record (first entry), or the no-record
    /// posture when the source lists none.
    async fn base_stock(&self, product: &RawProduct) -> Result<StockPolicy, SyncError> {
        match product.associations.stock_availables.first() {
            Some(stock_ref) => {
                let record = self.client.get_stock_available(stock_ref.id).await?;
                Ok(StockPolicy::from_record(&record))
            }
            None => {
                tracing::warn!(product_id = product.id, "product has no stock records");
                Ok(StockPolicy::default())
            }
        }
    }

    /// Stock for one combination: the entry whose `id_product_attribute`
    /// matches, falling back to the product-level record.
    async fn combination_stock(
        &self,
        product: &RawProduct,
        combination_id: i64,
    ) -> Result<StockPolicy, SyncError> {
        let matched = product
            .associations
            .stock_availables
            .iter()
            .find(|s| s.id_product_attribute == combination_id);

        match matched {
            Some(stock_ref) => {
                let record = self.client.get_stock_available(stock_ref.id).await?;
                Ok(StockPolicy::from_record(&record))
            }
            None => self.base_stock(product).await,
        }
    }

    // -- collection assignment ----------------------------------------------

    /// The target collection correlated (via `metadata.prestashop_id`) with
    /// any of the product's source categories. The target supports a single
    /// collection per product; the first match wins.
    async fn resolve_collection_id(
        &self,
        product: &RawProduct,
    ) -> Result<Option<i64>, StoreError> {
        if product.associations.categories.is_empty() {
            return Ok(None);
        }
        let collections = self.store.list_collections().await?;
        Ok(collections
            .into_iter()
            .find(|collection| {
                product
                    .associations
                    .categories
                    .iter()
                    .any(|category| category.id == collection.metadata.prestashop_id)
            })
            .map(|collection| collection.id))
    }

    // -- images -------------------------------------------------------------

    async fn mirror_images(
        &self,
        product: &RawProduct,
        target_id: i64,
        handle: &str,
        source_images: &[String],
        current_images: &[String],
        outcome: &mut ProductOutcome,
    ) {
        let pipeline = ImagePipeline::new(self.client, self.files);
        let (hosted, failures) = pipeline.mirror(product.id, handle, source_images).await;
        outcome.write_failures.extend(failures);

        outcome.images_uploaded += hosted.len();
        if hosted == current_images {
            return;
        }
        if let Err(err) = self.store.set_product_images(target_id, hosted).await {
            record_write_failure(outcome, WriteEntity::Image, product.id, &err);
        }
    }
}

/// Title and value-list refresh for an option present on both sides.
///
/// Value lists are compared by source value id, not display string — the
/// create path stores id placeholders and resolved names only arrive with
/// combination fan-out, so a string comparison would rewrite every option on
/// every pass. When the id set differs, the new list carries resolved names
/// wherever discovery fetched the value.
fn option_refresh(
    desired: &NewOption,
    current: &prestasync_core::catalog::ProductOption,
    discovery: &OptionDiscovery,
) -> OptionUpdate {
    let desired_ids: BTreeSet<i64> = desired
        .values
        .iter()
        .map(|v| v.metadata.prestashop_value)
        .collect();
    let current_ids: BTreeSet<i64> = current
        .values
        .iter()
        .map(|v| v.metadata.prestashop_value)
        .collect();

    let values = (desired_ids != current_ids).then(|| {
        desired
            .values
            .iter()
            .map(|placeholder| {
                discovery
                    .value_by_id(placeholder.metadata.prestashop_value)
                    .map_or_else(|| placeholder.clone(), normalize_option_value)
            })
            .collect::<Vec<OptionValue>>()
    });

    OptionUpdate {
        title: (desired.title != current.title).then(|| desired.title.clone()),
        values,
    }
}

fn record_write_failure(
    outcome: &mut ProductOutcome,
    entity: WriteEntity,
    source_id: i64,
    err: &StoreError,
) {
    tracing::error!(source_id, error = %err, "target write failed — continuing");
    outcome.write_failures.push(WriteFailure {
        entity,
        source_id,
        error: err.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use prestasync_core::catalog::{OptionMetadata, ProductOption};

    fn placeholder(id: i64) -> OptionValue {
        OptionValue {
            value: id.to_string(),
            metadata: OptionValueMetadata {
                prestashop_value: id,
            },
        }
    }

    fn stored_option(title: &str, values: Vec<OptionValue>) -> ProductOption {
        ProductOption {
            id: 1,
            product_id: 1,
            title: title.to_string(),
            values,
            metadata: OptionMetadata { prestashop_id: 2 },
        }
    }

    fn desired_option(title: &str, value_ids: &[i64]) -> NewOption {
        NewOption {
            title: title.to_string(),
            values: value_ids.iter().map(|id| placeholder(*id)).collect(),
            metadata: OptionMetadata { prestashop_id: 2 },
        }
    }

    #[test]
    fn option_refresh_empty_when_ids_and_title_match() {
        let desired = desired_option("Color", &[7, 8]);
        let current = stored_option("Color", vec![placeholder(7), placeholder(8)]);
        let update = option_refresh(&desired, &current, &OptionDiscovery::default());
        assert!(update.is_empty());
    }

    #[test]
    fn option_refresh_ignores_display_string_differences() {
        let desired = desired_option("Color", &[7]);
        let mut resolved = placeholder(7);
        resolved.value = "Red".to_string();
        let current = stored_option("Color", vec![resolved]);
        let update = option_refresh(&desired, &current, &OptionDiscovery::default());
        assert!(update.is_empty(), "same id set must not rewrite values");
    }

    #[test]
    fn option_refresh_detects_value_set_change() {
        let desired = desired_option("Color", &[7, 9]);
        let current = stored_option("Color", vec![placeholder(7), placeholder(8)]);
        let update = option_refresh(&desired, &current, &OptionDiscovery::default());
        let values = update.values.expect("value set changed");
        let ids: Vec<i64> = values.iter().map(|v| v.metadata.prestashop_value).collect();
        assert_eq!(ids, vec![7, 9]);
    }

    #[test]
    fn option_refresh_detects_title_change() {
        let desired = desired_option("Colour", &[7]);
        let current = stored_option("Color", vec![placeholder(7)]);
        let update = option_refresh(&desired, &current, &OptionDiscovery::default());
        assert_eq!(update.title.as_deref(), Some("Colour"));
        assert!(update.values.is_none());
    }
}
