//! Postgres-backed [`CatalogStore`] implementation.

pub mod collections;
pub mod products;
pub mod store_meta;
pub mod sync_runs;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use prestasync_core::catalog::{
    Collection, CollectionUpdate, NewCollection, NewOption, NewProduct, NewVariant, OptionUpdate,
    Product, ProductOption, ProductUpdate, StoreDefaults, Variant, VariantUpdate,
};
use prestasync_core::store::{CatalogStore, StoreError};

pub use sync_runs::{
    complete_sync_run, create_sync_run, fail_sync_run, list_sync_runs, start_sync_run, SyncRunRow,
};

/// Target catalog persisted in Postgres.
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl CatalogStore for PgCatalog {
    async fn store_defaults(&self) -> Result<StoreDefaults, StoreError> {
        store_meta::get_store_defaults(&self.pool).await
    }

    async fn get_collection_by_handle(
        &self,
        handle: &str,
    ) -> Result<Option<Collection>, StoreError> {
        collections::get_by_handle(&self.pool, handle).await
    }

    async fn list_collections(&self) -> Result<Vec<Collection>, StoreError> {
        collections::list_all(&self.pool).await
    }

    async fn create_collection(
        &self,
        collection: NewCollection,
    ) -> Result<Collection, StoreError> {
        collections::create(&self.pool, collection).await
    }

    async fn update_collection(
        &self,
        id: i64,
        update: CollectionUpdate,
    ) -> Result<Collection, StoreError> {
        collections::update(&self.pool, id, update).await
    }

    async fn get_product_by_external_id(
        &self,
        external_id: i64,
    ) -> Result<Option<Product>, StoreError> {
        products::get_by_external_id(&self.pool, external_id).await
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        products::create(&self.pool, product).await
    }

    async fn update_product(&self, id: i64, update: ProductUpdate) -> Result<Product, StoreError> {
        products::update(&self.pool, id, update).await
    }

    async fn set_product_images(&self, id: i64, images: Vec<String>) -> Result<(), StoreError> {
        products::set_images(&self.pool, id, images).await
    }

    async fn get_variant_by_sku(&self, sku: &str) -> Result<Option<Variant>, StoreError> {
        products::get_variant_by_sku(&self.pool, sku).await
    }

    async fn create_variant(
        &self,
        product_id: i64,
        variant: NewVariant,
    ) -> Result<Variant, StoreError> {
        products::create_variant(&self.pool, product_id, variant).await
    }

    async fn update_variant(
        &self,
        variant_id: i64,
        update: VariantUpdate,
    ) -> Result<Variant, StoreError> {
        products::update_variant(&self.pool, variant_id, update).await
    }

    async fn delete_variant(&self, variant_id: i64) -> Result<(), StoreError> {
        products::delete_variant(&self.pool, variant_id).await
    }

    async fn add_option(
        &self,
        product_id: i64,
        option: NewOption,
    ) -> Result<ProductOption, StoreError> {
        products::add_option(&self.pool, product_id, option).await
    }

    async fn update_option(
        &self,
        product_id: i64,
        option_id: i64,
        update: OptionUpdate,
    ) -> Result<(), StoreError> {
        products::update_option(&self.pool, product_id, option_id, update).await
    }

    async fn delete_option(&self, product_id: i64, option_id: i64) -> Result<(), StoreError> {
        products::delete_option(&self.pool, product_id, option_id).await
    }

    async fn get_sync_watermark(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        store_meta::get_watermark(&self.pool).await
    }

    async fn set_sync_watermark(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        store_meta::set_watermark(&self.pool, at).await
    }
}
