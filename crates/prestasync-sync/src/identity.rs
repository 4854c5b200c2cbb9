//! Product identity resolution across sync passes.
//!
//! The ordering is load-bearing: a product previously imported as a
//! standalone simple product must be found through its variant's SKU and
//! absorbed in place — looking up by external id alone would create a
//! duplicate product next to it.

use prestasync_core::catalog::{Product, Variant};
use prestasync_core::store::{CatalogStore, StoreError};

/// How a source product maps onto the current target catalog.
#[derive(Debug)]
pub enum Identity {
    /// A product with this external id already exists: update path.
    Existing(Box<Product>),
    /// No product, but a variant carries the product's reference as SKU —
    /// it was imported standalone before its configurable parent appeared.
    StandaloneVariant(Box<Variant>),
    /// Nothing matches: create path.
    New,
}

/// Resolves a source product id (and its reference/SKU surrogate) against
/// the target catalog.
///
/// Step 1 looks up by external id with the full aggregate; step 2 falls back
/// to a variant SKU lookup; otherwise the product is new. Lookups returning
/// nothing are expected branch results, never errors.
///
/// # Errors
///
/// Returns [`StoreError`] only for backend failures.
pub async fn resolve_identity<S: CatalogStore>(
    store: &S,
    external_id: i64,
    reference: &str,
) -> Result<Identity, StoreError> {
    if let Some(product) = store.get_product_by_external_id(external_id).await? {
        return Ok(Identity::Existing(Box::new(product)));
    }

    if !reference.is_empty() {
        if let Some(variant) = store.get_variant_by_sku(reference).await? {
            return Ok(Identity::StandaloneVariant(Box::new(variant)));
        }
    }

    Ok(Identity::New)
}
