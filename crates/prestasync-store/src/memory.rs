//! In-memory catalog and file stores.
//!
//! `MemoryCatalog` backs dry runs and the engine's end-to-end tests: it
//! implements the full [`CatalogStore`] surface over mutex-guarded maps and
//! counts every catalog mutation, so idempotence ("a second pass issues zero
//! writes") is directly assertable. Watermark bookkeeping is deliberately
//! not counted — it is run metadata, not catalog data.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use prestasync_core::catalog::{
    Collection, CollectionUpdate, NewCollection, NewOption, NewProduct, NewVariant, OptionUpdate,
    Product, ProductOption, ProductUpdate, StoreDefaults, Variant, VariantUpdate,
};
use prestasync_core::store::{CatalogStore, FileStore, StoreError};

#[derive(Default)]
struct Inner {
    collections: Vec<Collection>,
    products: Vec<Product>,
    watermark: Option<DateTime<Utc>>,
    next_id: i64,
    writes: u64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn product_mut(&mut self, id: i64) -> Result<&mut Product, StoreError> {
        self.products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound)
    }
}

/// An in-memory target catalog.
pub struct MemoryCatalog {
    inner: Mutex<Inner>,
    defaults: StoreDefaults,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new(defaults: StoreDefaults) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            defaults,
        }
    }

    /// A catalog with one currency and a default shipping profile, enough
    /// for any pass to run.
    #[must_use]
    pub fn with_default_store() -> Self {
        Self::new(StoreDefaults {
            currencies: vec!["usd".to_string()],
            shipping_profile_id: Some("sp_default".to_string()),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::backend("memory store mutex poisoned"))
    }

    /// Number of catalog mutations issued so far (creates, updates, deletes,
    /// image replacements). Watermark writes are excluded.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.inner.lock().map(|inner| inner.writes).unwrap_or(0)
    }

    /// Snapshot of all stored products, for assertions.
    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.inner
            .lock()
            .map(|inner| inner.products.clone())
            .unwrap_or_default()
    }

    /// Snapshot of all stored collections, for assertions.
    #[must_use]
    pub fn collections(&self) -> Vec<Collection> {
        self.inner
            .lock()
            .map(|inner| inner.collections.clone())
            .unwrap_or_default()
    }
}

impl CatalogStore for MemoryCatalog {
    async fn store_defaults(&self) -> Result<StoreDefaults, StoreError> {
        Ok(self.defaults.clone())
    }

    async fn get_collection_by_handle(
        &self,
        handle: &str,
    ) -> Result<Option<Collection>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .collections
            .iter()
            .find(|c| c.handle == handle)
            .cloned())
    }

    async fn list_collections(&self) -> Result<Vec<Collection>, StoreError> {
        Ok(self.lock()?.collections.clone())
    }

    async fn create_collection(
        &self,
        collection: NewCollection,
    ) -> Result<Collection, StoreError> {
        let mut inner = self.lock()?;
        if inner.collections.iter().any(|c| c.handle == collection.handle) {
            return Err(StoreError::DuplicateHandle {
                handle: collection.handle,
            });
        }
        let created = Collection {
            id: inner.next_id(),
            title: collection.title,
            handle: collection.handle,
            metadata: collection.metadata,
        };
        inner.collections.push(created.clone());
        inner.writes += 1;
        Ok(created)
    }

    async fn update_collection(
        &self,
        id: i64,
        update: CollectionUpdate,
    ) -> Result<Collection, StoreError> {
        let mut inner = self.lock()?;
        if let Some(handle) = &update.handle {
            if inner
                .collections
                .iter()
                .any(|c| c.id != id && &c.handle == handle)
            {
                return Err(StoreError::DuplicateHandle {
                    handle: handle.clone(),
                });
            }
        }
        let collection = inner
            .collections
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::NotFound)?;
        if let Some(title) = update.title {
            collection.title = title;
        }
        if let Some(handle) = update.handle {
            collection.handle = handle;
        }
        let updated = collection.clone();
        inner.writes += 1;
        Ok(updated)
    }

    async fn get_product_by_external_id(
        &self,
        external_id: i64,
    ) -> Result<Option<Product>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .products
            .iter()
            .find(|p| p.external_id == external_id)
            .cloned())
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut inner = self.lock()?;
        let product_id = inner.next_id();
        let options = product
            .options
            .into_iter()
            .map(|option| {
                let id = inner.next_id();
                ProductOption {
                    id,
                    product_id,
                    title: option.title,
                    values: option.values,
                    metadata: option.metadata,
                }
            })
            .collect();
        let created = Product {
            id: product_id,
            title: product.title,
            subtitle: product.subtitle,
            description: product.description,
            handle: product.handle,
            is_giftcard: product.is_giftcard,
            discountable: product.discountable,
            weight: product.weight,
            height: product.height,
            length: product.length,
            width: product.width,
            external_id: product.external_id,
            status: product.status,
            images: product.images,
            options,
            variants: Vec::new(),
            collection_id: product.collection_id,
            profile_id: product.profile_id,
            metadata: product.metadata,
        };
        inner.products.push(created.clone());
        inner.writes += 1;
        Ok(created)
    }

    async fn update_product(&self, id: i64, update: ProductUpdate) -> Result<Product, StoreError> {
        let mut inner = self.lock()?;
        let product = inner.product_mut(id)?;
        if let Some(title) = update.title {
            product.title = title;
        }
        if let Some(subtitle) = update.subtitle {
            product.subtitle = subtitle;
        }
        if let Some(description) = update.description {
            product.description = description;
        }
        if let Some(handle) = update.handle {
            product.handle = handle;
        }
        if let Some(status) = update.status {
            product.status = status;
        }
        if let Some(weight) = update.weight {
            product.weight = weight;
        }
        if let Some(height) = update.height {
            product.height = height;
        }
        if let Some(length) = update.length {
            product.length = length;
        }
        if let Some(width) = update.width {
            product.width = width;
        }
        if let Some(collection_id) = update.collection_id {
            product.collection_id = Some(collection_id);
        }
        if let Some(metadata) = update.metadata {
            product.metadata = metadata;
        }
        let updated = product.clone();
        inner.writes += 1;
        Ok(updated)
    }

    async fn set_product_images(&self, id: i64, images: Vec<String>) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.product_mut(id)?.images = images;
        inner.writes += 1;
        Ok(())
    }

    async fn get_variant_by_sku(&self, sku: &str) -> Result<Option<Variant>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .products
            .iter()
            .flat_map(|p| p.variants.iter())
            .find(|v| v.sku.as_deref() == Some(sku))
            .cloned())
    }

    async fn create_variant(
        &self,
        product_id: i64,
        variant: NewVariant,
    ) -> Result<Variant, StoreError> {
        let mut inner = self.lock()?;
        let id = inner.next_id();
        let product = inner.product_mut(product_id)?;
        let created = Variant {
            id,
            product_id,
            title: variant.title,
            sku: variant.sku,
            barcode: variant.barcode,
            ean: variant.ean,
            upc: variant.upc,
            prices: variant.prices,
            inventory_quantity: variant.inventory_quantity,
            allow_backorder: variant.allow_backorder,
            manage_inventory: variant.manage_inventory,
            weight: variant.weight,
            height: variant.height,
            length: variant.length,
            width: variant.width,
            options: variant.options,
            metadata: variant.metadata,
        };
        product.variants.push(created.clone());
        inner.writes += 1;
        Ok(created)
    }

    async fn update_variant(
        &self,
        variant_id: i64,
        update: VariantUpdate,
    ) -> Result<Variant, StoreError> {
        let mut inner = self.lock()?;
        let variant = inner
            .products
            .iter_mut()
            .flat_map(|p| p.variants.iter_mut())
            .find(|v| v.id == variant_id)
            .ok_or(StoreError::NotFound)?;
        if let Some(title) = update.title {
            variant.title = title;
        }
        if let Some(sku) = update.sku {
            variant.sku = sku;
        }
        if let Some(barcode) = update.barcode {
            variant.barcode = barcode;
        }
        if let Some(ean) = update.ean {
            variant.ean = ean;
        }
        if let Some(upc) = update.upc {
            variant.upc = upc;
        }
        if let Some(prices) = update.prices {
            variant.prices = prices;
        }
        if let Some(quantity) = update.inventory_quantity {
            variant.inventory_quantity = quantity;
        }
        if let Some(allow_backorder) = update.allow_backorder {
            variant.allow_backorder = allow_backorder;
        }
        if let Some(manage_inventory) = update.manage_inventory {
            variant.manage_inventory = manage_inventory;
        }
        if let Some(options) = update.options {
            variant.options = options;
        }
        let updated = variant.clone();
        inner.writes += 1;
        Ok(updated)
    }

    async fn delete_variant(&self, variant_id: i64) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        for product in &mut inner.products {
            if let Some(index) = product.variants.iter().position(|v| v.id == variant_id) {
                product.variants.remove(index);
                inner.writes += 1;
                return Ok(());
            }
        }
        Err(StoreError::NotFound)
    }

    async fn add_option(
        &self,
        product_id: i64,
        option: NewOption,
    ) -> Result<ProductOption, StoreError> {
        let mut inner = self.lock()?;
        let id = inner.next_id();
        let product = inner.product_mut(product_id)?;
        let created = ProductOption {
            id,
            product_id,
            title: option.title,
            values: option.values,
            metadata: option.metadata,
        };
        product.options.push(created.clone());
        inner.writes += 1;
        Ok(created)
    }

    async fn update_option(
        &self,
        product_id: i64,
        option_id: i64,
        update: OptionUpdate,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let product = inner.product_mut(product_id)?;
        let option = product
            .options
            .iter_mut()
            .find(|o| o.id == option_id)
            .ok_or(StoreError::NotFound)?;
        if let Some(title) = update.title {
            option.title = title;
        }
        if let Some(values) = update.values {
            option.values = values;
        }
        inner.writes += 1;
        Ok(())
    }

    async fn delete_option(&self, product_id: i64, option_id: i64) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let product = inner.product_mut(product_id)?;
        let index = product
            .options
            .iter()
            .position(|o| o.id == option_id)
            .ok_or(StoreError::NotFound)?;
        product.options.remove(index);
        inner.writes += 1;
        Ok(())
    }

    async fn get_sync_watermark(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.lock()?.watermark)
    }

    async fn set_sync_watermark(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.lock()?.watermark = Some(at);
        Ok(())
    }
}

/// An in-memory file store handing out `memory://` URLs.
#[derive(Default)]
pub struct MemoryFiles {
    seq: AtomicU64,
    uploads: Mutex<Vec<(String, usize)>>,
}

impl MemoryFiles {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filenames and byte sizes uploaded so far, in order.
    #[must_use]
    pub fn uploads(&self) -> Vec<(String, usize)> {
        self.uploads.lock().map(|u| u.clone()).unwrap_or_default()
    }
}

impl FileStore for MemoryFiles {
    async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<String, StoreError> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.uploads
            .lock()
            .map_err(|_| StoreError::backend("memory file store mutex poisoned"))?
            .push((filename.to_owned(), bytes.len()));
        Ok(format!("memory://uploads/{seq}/{filename}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prestasync_core::catalog::{
        CollectionMetadata, MoneyAmount, ProductMetadata, ProductStatus, VariantMetadata,
    };

    fn new_collection(handle: &str, prestashop_id: i64) -> NewCollection {
        NewCollection {
            title: handle.to_uppercase(),
            handle: handle.to_string(),
            metadata: CollectionMetadata { prestashop_id },
        }
    }

    fn new_product(external_id: i64, handle: &str) -> NewProduct {
        NewProduct {
            title: "Product".to_string(),
            subtitle: None,
            description: None,
            handle: handle.to_string(),
            is_giftcard: false,
            discountable: true,
            weight: 0,
            height: 0,
            length: 0,
            width: 0,
            external_id,
            status: ProductStatus::Published,
            images: vec![],
            options: vec![],
            collection_id: None,
            profile_id: Some("sp_default".to_string()),
            metadata: ProductMetadata {
                prestashop_id: external_id,
                reference: format!("REF-{external_id}"),
                manufacturer_name: None,
                date_upd: None,
                meta_keywords: vec![],
            },
        }
    }

    fn new_variant(sku: &str, prestashop_id: i64) -> NewVariant {
        NewVariant {
            title: "Default".to_string(),
            sku: Some(sku.to_string()),
            barcode: None,
            ean: None,
            upc: None,
            prices: vec![MoneyAmount {
                currency_code: "usd".to_string(),
                amount: 1999,
            }],
            inventory_quantity: 1,
            allow_backorder: false,
            manage_inventory: true,
            weight: 0,
            height: 0,
            length: 0,
            width: 0,
            options: vec![],
            metadata: VariantMetadata {
                prestashop_id,
                isbn: None,
                supplier_reference: None,
                location: None,
            },
        }
    }

    #[tokio::test]
    async fn duplicate_collection_handle_is_rejected() {
        let store = MemoryCatalog::with_default_store();
        store.create_collection(new_collection("shoes", 3)).await.unwrap();

        let err = store
            .create_collection(new_collection("shoes", 4))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateHandle { handle } if handle == "shoes"));
    }

    #[tokio::test]
    async fn collection_lookup_by_handle() {
        let store = MemoryCatalog::with_default_store();
        store.create_collection(new_collection("shoes", 3)).await.unwrap();

        let found = store.get_collection_by_handle("shoes").await.unwrap();
        assert_eq!(found.map(|c| c.metadata.prestashop_id), Some(3));
        assert!(store.get_collection_by_handle("hats").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn product_aggregate_roundtrip_with_variant() {
        let store = MemoryCatalog::with_default_store();
        let created = store.create_product(new_product(19, "shirt")).await.unwrap();
        store
            .create_variant(created.id, new_variant("REF-19", 19))
            .await
            .unwrap();

        let fetched = store
            .get_product_by_external_id(19)
            .await
            .unwrap()
            .expect("product should exist");
        assert_eq!(fetched.variants.len(), 1);
        assert_eq!(fetched.variants[0].sku.as_deref(), Some("REF-19"));

        let by_sku = store.get_variant_by_sku("REF-19").await.unwrap();
        assert!(by_sku.is_some());
    }

    #[tokio::test]
    async fn write_count_tracks_catalog_mutations_only() {
        let store = MemoryCatalog::with_default_store();
        assert_eq!(store.write_count(), 0);

        let product = store.create_product(new_product(1, "p")).await.unwrap();
        store
            .create_variant(product.id, new_variant("SKU-1", 1))
            .await
            .unwrap();
        assert_eq!(store.write_count(), 2);

        store.set_sync_watermark(Utc::now()).await.unwrap();
        assert_eq!(store.write_count(), 2, "watermark writes are not counted");
    }

    #[tokio::test]
    async fn delete_variant_removes_it_from_parent() {
        let store = MemoryCatalog::with_default_store();
        let product = store.create_product(new_product(1, "p")).await.unwrap();
        let variant = store
            .create_variant(product.id, new_variant("SKU-1", 1))
            .await
            .unwrap();

        store.delete_variant(variant.id).await.unwrap();
        let fetched = store.get_product_by_external_id(1).await.unwrap().unwrap();
        assert!(fetched.variants.is_empty());

        let err = store.delete_variant(variant.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn memory_files_hand_out_distinct_urls() {
        let files = MemoryFiles::new();
        let a = files.upload("shirt.jpeg", &[1, 2, 3]).await.unwrap();
        let b = files.upload("shirt.jpeg", &[4, 5]).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(files.uploads().len(), 2);
        assert_eq!(files.uploads()[0], ("shirt.jpeg".to_string(), 3));
    }
}
