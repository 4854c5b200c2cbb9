//! Target-catalog domain types.
//!
//! These model the normalized product/variant/option/collection aggregate the
//! target commerce platform understands. Source records are mapped into the
//! `New*` shapes by the sync engine's normalizers; the id-carrying shapes are
//! what a [`crate::store::CatalogStore`] hands back. Cross-system identity is
//! anchored twice: `external_id` on the product itself, and `prestashop_id`
//! inside entity metadata for re-lookup when the external-id index is not
//! available.

use serde::{Deserialize, Serialize};

/// Publication status derived from the source `active` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Published,
    Draft,
}

/// A price in integer minor-currency units (e.g. cents).
///
/// The source carries a single price; it is duplicated across every store
/// currency at normalization time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyAmount {
    /// ISO 4217 currency code, lowercase (e.g. `"usd"`).
    pub currency_code: String,
    /// Amount in minor units: `round(round(raw, 2) * 100)`.
    pub amount: i64,
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    /// Source category id — the correlation key across sync passes.
    pub prestashop_id: i64,
}

/// Creation payload for a target collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCollection {
    pub title: String,
    pub handle: String,
    pub metadata: CollectionMetadata,
}

/// A collection as stored in the target catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: i64,
    pub title: String,
    pub handle: String,
    pub metadata: CollectionMetadata,
}

/// Field-level partial update for a collection. `None` means unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionUpdate {
    pub title: Option<String>,
    pub handle: Option<String>,
}

impl CollectionUpdate {
    /// `true` when no field changed — the caller must skip the write entirely
    /// so a no-op pass produces zero mutations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.handle.is_none()
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionMetadata {
    /// Source attribute-group id.
    pub prestashop_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionValueMetadata {
    /// Source attribute-value id.
    pub prestashop_value: i64,
}

/// One admissible value of a product option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionValue {
    pub value: String,
    pub metadata: OptionValueMetadata,
}

/// Creation payload for a product option (e.g. "Color").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOption {
    pub title: String,
    pub values: Vec<OptionValue>,
    pub metadata: OptionMetadata,
}

/// A product option as stored in the target catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    pub id: i64,
    pub product_id: i64,
    pub title: String,
    pub values: Vec<OptionValue>,
    pub metadata: OptionMetadata,
}

/// Partial update for a product option. `None` means unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionUpdate {
    pub title: Option<String>,
    pub values: Option<Vec<OptionValue>>,
}

impl OptionUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.values.is_none()
    }
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantMetadata {
    /// Source combination id. Simple products have no combination record;
    /// their default variant carries the parent product id here instead.
    pub prestashop_id: i64,
    pub isbn: Option<String>,
    pub supplier_reference: Option<String>,
    pub location: Option<String>,
}

/// A concrete option selection on a variant: "this variant is Color=Red".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantOptionValue {
    /// Target option id the selection belongs to.
    pub option_id: i64,
    pub value: String,
    pub metadata: OptionValueMetadata,
}

/// Creation payload for a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVariant {
    pub title: String,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub ean: Option<String>,
    pub upc: Option<String>,
    pub prices: Vec<MoneyAmount>,
    pub inventory_quantity: i64,
    pub allow_backorder: bool,
    /// Derived: `true` iff `inventory_quantity > 0`.
    pub manage_inventory: bool,
    pub weight: i64,
    pub height: i64,
    pub length: i64,
    pub width: i64,
    pub options: Vec<VariantOptionValue>,
    pub metadata: VariantMetadata,
}

/// A variant as stored in the target catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: i64,
    pub product_id: i64,
    pub title: String,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub ean: Option<String>,
    pub upc: Option<String>,
    pub prices: Vec<MoneyAmount>,
    pub inventory_quantity: i64,
    pub allow_backorder: bool,
    pub manage_inventory: bool,
    pub weight: i64,
    pub height: i64,
    pub length: i64,
    pub width: i64,
    pub options: Vec<VariantOptionValue>,
    pub metadata: VariantMetadata,
}

/// Partial update for a variant. `None` means unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantUpdate {
    pub title: Option<String>,
    pub sku: Option<Option<String>>,
    pub barcode: Option<Option<String>>,
    pub ean: Option<Option<String>>,
    pub upc: Option<Option<String>>,
    pub prices: Option<Vec<MoneyAmount>>,
    pub inventory_quantity: Option<i64>,
    pub allow_backorder: Option<bool>,
    pub manage_inventory: Option<bool>,
    pub options: Option<Vec<VariantOptionValue>>,
}

impl VariantUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.sku.is_none()
            && self.barcode.is_none()
            && self.ean.is_none()
            && self.upc.is_none()
            && self.prices.is_none()
            && self.inventory_quantity.is_none()
            && self.allow_backorder.is_none()
            && self.manage_inventory.is_none()
            && self.options.is_none()
    }
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductMetadata {
    /// Source product id — redundant identity anchor next to `external_id`.
    pub prestashop_id: i64,
    /// Source `reference` field, the SKU surrogate.
    pub reference: String,
    pub manufacturer_name: Option<String>,
    pub date_upd: Option<String>,
    pub meta_keywords: Vec<String>,
}

/// Creation payload for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub handle: String,
    pub is_giftcard: bool,
    pub discountable: bool,
    pub weight: i64,
    pub height: i64,
    pub length: i64,
    pub width: i64,
    /// Source product id — the cross-system identity key.
    pub external_id: i64,
    pub status: ProductStatus,
    /// Source image URLs; replaced with hosted URLs once mirrored.
    pub images: Vec<String>,
    pub options: Vec<NewOption>,
    pub collection_id: Option<i64>,
    pub profile_id: Option<String>,
    pub metadata: ProductMetadata,
}

/// A product aggregate as stored in the target catalog, with its variants,
/// options and images resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub handle: String,
    pub is_giftcard: bool,
    pub discountable: bool,
    pub weight: i64,
    pub height: i64,
    pub length: i64,
    pub width: i64,
    pub external_id: i64,
    pub status: ProductStatus,
    pub images: Vec<String>,
    pub options: Vec<ProductOption>,
    pub variants: Vec<Variant>,
    pub collection_id: Option<i64>,
    pub profile_id: Option<String>,
    pub metadata: ProductMetadata,
}

impl Product {
    /// Finds an option by its source attribute-group id.
    #[must_use]
    pub fn option_by_source_id(&self, prestashop_id: i64) -> Option<&ProductOption> {
        self.options
            .iter()
            .find(|o| o.metadata.prestashop_id == prestashop_id)
    }

    /// Finds a variant by its source combination id.
    #[must_use]
    pub fn variant_by_source_id(&self, prestashop_id: i64) -> Option<&Variant> {
        self.variants
            .iter()
            .find(|v| v.metadata.prestashop_id == prestashop_id)
    }
}

/// Field-level partial update for a product. `None` means unchanged;
/// `collection_id` is never unset by a sync pass, only reassigned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductUpdate {
    pub title: Option<String>,
    pub subtitle: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub handle: Option<String>,
    pub status: Option<ProductStatus>,
    pub weight: Option<i64>,
    pub height: Option<i64>,
    pub length: Option<i64>,
    pub width: Option<i64>,
    pub collection_id: Option<i64>,
    pub metadata: Option<ProductMetadata>,
}

impl ProductUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.subtitle.is_none()
            && self.description.is_none()
            && self.handle.is_none()
            && self.status.is_none()
            && self.weight.is_none()
            && self.height.is_none()
            && self.length.is_none()
            && self.width.is_none()
            && self.collection_id.is_none()
            && self.metadata.is_none()
    }
}

// ---------------------------------------------------------------------------
// Store-level configuration
// ---------------------------------------------------------------------------

/// Store-wide defaults every normalized product depends on. Missing values
/// are a fatal configuration error for a sync pass, checked up front.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDefaults {
    /// Every store currency; variant prices are duplicated across all of them.
    pub currencies: Vec<String>,
    /// Shipping profile attached to newly created products.
    pub shipping_profile_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_update_empty_by_default() {
        assert!(CollectionUpdate::default().is_empty());
    }

    #[test]
    fn collection_update_not_empty_with_title() {
        let update = CollectionUpdate {
            title: Some("Shoes".to_string()),
            handle: None,
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn variant_update_empty_by_default() {
        assert!(VariantUpdate::default().is_empty());
    }

    #[test]
    fn variant_update_detects_unset_sku_as_change() {
        let update = VariantUpdate {
            sku: Some(None),
            ..VariantUpdate::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn product_update_empty_by_default() {
        assert!(ProductUpdate::default().is_empty());
    }

    #[test]
    fn option_lookup_by_source_id() {
        let product = Product {
            id: 1,
            title: "Shirt".to_string(),
            subtitle: None,
            description: None,
            handle: "shirt".to_string(),
            is_giftcard: false,
            discountable: true,
            weight: 0,
            height: 0,
            length: 0,
            width: 0,
            external_id: 9,
            status: ProductStatus::Published,
            images: vec![],
            options: vec![ProductOption {
                id: 77,
                product_id: 1,
                title: "Size".to_string(),
                values: vec![],
                metadata: OptionMetadata { prestashop_id: 3 },
            }],
            variants: vec![],
            collection_id: None,
            profile_id: None,
            metadata: ProductMetadata {
                prestashop_id: 9,
                reference: "REF-9".to_string(),
                manufacturer_name: None,
                date_upd: None,
                meta_keywords: vec![],
            },
        };

        assert_eq!(product.option_by_source_id(3).map(|o| o.id), Some(77));
        assert!(product.option_by_source_id(4).is_none());
    }

    #[test]
    fn serde_roundtrip_variant() {
        let variant = Variant {
            id: 5,
            product_id: 1,
            title: "Red - L".to_string(),
            sku: Some("REF-9-RL".to_string()),
            barcode: None,
            ean: None,
            upc: None,
            prices: vec![MoneyAmount {
                currency_code: "usd".to_string(),
                amount: 2499,
            }],
            inventory_quantity: 4,
            allow_backorder: true,
            manage_inventory: true,
            weight: 0,
            height: 0,
            length: 0,
            width: 0,
            options: vec![],
            metadata: VariantMetadata {
                prestashop_id: 12,
                isbn: None,
                supplier_reference: None,
                location: None,
            },
        };

        let json = serde_json::to_string(&variant).expect("serialize");
        let decoded: Variant = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded, variant);
    }
}
