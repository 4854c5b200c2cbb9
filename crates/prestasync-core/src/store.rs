//! Capability traits the sync engine consumes.
//!
//! The engine never talks to a database or a CDN directly; it is generic over
//! [`CatalogStore`] (target catalog persistence) and [`FileStore`] (image
//! hosting). Lookups that find nothing return `Ok(None)` — "not found" is an
//! expected branch condition for create-vs-update decisions, never an error.

use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::catalog::{
    Collection, CollectionUpdate, NewCollection, NewOption, NewProduct, NewVariant, OptionUpdate,
    Product, ProductOption, ProductUpdate, StoreDefaults, Variant, VariantUpdate,
};

/// Errors surfaced by catalog-store and file-store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A mutation referenced an entity that does not exist.
    #[error("record not found")]
    NotFound,

    /// A collection create collided with an existing handle. Two source
    /// categories sharing a `link_rewrite` surface here instead of being
    /// silently merged.
    #[error("handle \"{handle}\" already exists")]
    DuplicateHandle { handle: String },

    /// Backend-specific failure (database, filesystem, lock poisoning).
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Wraps a backend error without requiring a foreign `From` impl.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Target catalog persistence capability.
///
/// One method per operation the reconcilers need; implementations decide how
/// aggregates are stored. `Product` is always returned fully resolved
/// (options, variants, images) because identity resolution and diffing need
/// the whole aggregate.
pub trait CatalogStore {
    /// Store-wide defaults (currencies, shipping profile). An empty currency
    /// list or missing profile is a configuration error the caller raises.
    fn store_defaults(&self) -> impl Future<Output = Result<StoreDefaults, StoreError>>;

    // -- collections --------------------------------------------------------

    fn get_collection_by_handle(
        &self,
        handle: &str,
    ) -> impl Future<Output = Result<Option<Collection>, StoreError>>;

    fn list_collections(&self) -> impl Future<Output = Result<Vec<Collection>, StoreError>>;

    fn create_collection(
        &self,
        collection: NewCollection,
    ) -> impl Future<Output = Result<Collection, StoreError>>;

    fn update_collection(
        &self,
        id: i64,
        update: CollectionUpdate,
    ) -> impl Future<Output = Result<Collection, StoreError>>;

    // -- products -----------------------------------------------------------

    fn get_product_by_external_id(
        &self,
        external_id: i64,
    ) -> impl Future<Output = Result<Option<Product>, StoreError>>;

    /// Creates the product together with its options; the returned aggregate
    /// carries the assigned option ids, which variant creation needs.
    fn create_product(
        &self,
        product: NewProduct,
    ) -> impl Future<Output = Result<Product, StoreError>>;

    fn update_product(
        &self,
        id: i64,
        update: ProductUpdate,
    ) -> impl Future<Output = Result<Product, StoreError>>;

    /// Full-replace of the product image list with hosted URLs.
    fn set_product_images(
        &self,
        id: i64,
        images: Vec<String>,
    ) -> impl Future<Output = Result<(), StoreError>>;

    // -- variants -----------------------------------------------------------

    fn get_variant_by_sku(
        &self,
        sku: &str,
    ) -> impl Future<Output = Result<Option<Variant>, StoreError>>;

    fn create_variant(
        &self,
        product_id: i64,
        variant: NewVariant,
    ) -> impl Future<Output = Result<Variant, StoreError>>;

    fn update_variant(
        &self,
        variant_id: i64,
        update: VariantUpdate,
    ) -> impl Future<Output = Result<Variant, StoreError>>;

    fn delete_variant(&self, variant_id: i64) -> impl Future<Output = Result<(), StoreError>>;

    // -- options ------------------------------------------------------------

    fn add_option(
        &self,
        product_id: i64,
        option: NewOption,
    ) -> impl Future<Output = Result<ProductOption, StoreError>>;

    fn update_option(
        &self,
        product_id: i64,
        option_id: i64,
        update: OptionUpdate,
    ) -> impl Future<Output = Result<(), StoreError>>;

    fn delete_option(
        &self,
        product_id: i64,
        option_id: i64,
    ) -> impl Future<Output = Result<(), StoreError>>;

    // -- sync watermark -----------------------------------------------------

    /// Timestamp of the last completed pass, if any. Read at pass start for
    /// observability; every pass still re-scans the full source catalog.
    fn get_sync_watermark(
        &self,
    ) -> impl Future<Output = Result<Option<DateTime<Utc>>, StoreError>>;

    fn set_sync_watermark(
        &self,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), StoreError>>;
}

/// Image hosting capability: persist bytes, get back a hosted URL.
pub trait FileStore {
    fn upload(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> impl Future<Output = Result<String, StoreError>>;
}
