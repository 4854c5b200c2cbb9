//! Normalization from raw PrestaShop records to target-catalog shapes.
//!
//! Pure functions only; every remote record the reconcilers fetch passes
//! through here exactly once. Numeric-as-string coercion, money conversion,
//! and localized-text unwrapping all live in this module so the reconcilers
//! deal in typed target shapes.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use prestasync_client::types::{RawCategory, RawCombination, RawOption, RawOptionValue, RawProduct,
    RawStockAvailable, TextValue};
use prestasync_core::catalog::{
    Collection, CollectionMetadata, CollectionUpdate, MoneyAmount, NewCollection, NewOption,
    NewProduct, NewVariant, OptionMetadata, OptionValue, OptionValueMetadata, Product,
    ProductMetadata, ProductStatus, ProductUpdate, Variant, VariantMetadata, VariantOptionValue,
    VariantUpdate,
};

// ---------------------------------------------------------------------------
// Scalar coercion
// ---------------------------------------------------------------------------

/// Unwraps an optional localized text field; both wire shapes yield the same
/// string, absence yields `""`.
#[must_use]
pub fn unwrap_text(field: Option<&TextValue>) -> String {
    field.map(|t| t.as_str().to_owned()).unwrap_or_default()
}

/// Like [`unwrap_text`] but collapses the empty string to `None`.
#[must_use]
pub fn text_opt(field: Option<&TextValue>) -> Option<String> {
    let text = unwrap_text(field);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// `"1"` ⇒ `true`; everything else — `"0"`, `""`, garbage — ⇒ `false`.
/// String-typed flags are never used as raw truthiness.
#[must_use]
pub fn parse_flag(raw: &str) -> bool {
    raw.trim() == "1"
}

fn parse_decimal(raw: &str) -> Decimal {
    raw.trim().parse().unwrap_or(Decimal::ZERO)
}

fn coerce_number(raw: &str) -> f64 {
    raw.trim().parse().unwrap_or(0.0)
}

/// Converts a decimal amount to integer minor units:
/// `round(round(x, 2) * 100)`. Rounding to cents happens first, so
/// `19.999` becomes `2000`, not `1999`.
#[must_use]
pub fn minor_units(amount: Decimal) -> i64 {
    let cents = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        * Decimal::from(100);
    cents
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

/// Parses a numeric-as-string price and converts it to minor units.
/// Unparseable input coerces to zero.
#[must_use]
pub fn to_minor_units(raw: &str) -> i64 {
    minor_units(parse_decimal(raw))
}

/// A combination's price is a delta on the product base price: both are
/// summed as decimals before minor-unit conversion, so `"19.99" + "5.00"`
/// is `2499`, never a sum of independently rounded halves.
#[must_use]
pub fn combined_minor_units(base: &str, delta: &str) -> i64 {
    minor_units(parse_decimal(base) + parse_decimal(delta))
}

/// Dimension coercion: numeric-or-zero, truncated to an integer.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn dimension_units(raw: &str) -> i64 {
    coerce_number(raw).trunc() as i64
}

/// Weight keeps the source convention of a ×100 scale before truncation.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn weight_units(raw: &str) -> i64 {
    (coerce_number(raw) * 100.0).trunc() as i64
}

fn none_if_empty(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_owned())
    }
}

/// Source keyword lists are comma-separated; blank entries are dropped.
fn split_meta_keywords(field: Option<&TextValue>) -> Vec<String> {
    unwrap_text(field)
        .split(',')
        .filter(|entry| !(entry.is_empty() || *entry == " "))
        .map(str::to_owned)
        .collect()
}

/// `manufacturer_name` is a string, or literal `false` when unset.
fn manufacturer_name(value: &serde_json::Value) -> Option<String> {
    value.as_str().map(str::to_owned)
}

/// Builds a URL-safe handle from a display name.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            for lower in c.to_lowercase() {
                slug.push(lower);
            }
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Picks the product handle: the source `link_rewrite` wins unless handle
/// regeneration is forced or the slug is missing.
#[must_use]
pub fn handle_for(name: &str, link_rewrite: Option<&TextValue>, generate_new_handles: bool) -> String {
    let rewrite = unwrap_text(link_rewrite);
    if generate_new_handles || rewrite.is_empty() {
        slugify(name)
    } else {
        rewrite
    }
}

// ---------------------------------------------------------------------------
// Stock policy
// ---------------------------------------------------------------------------

/// Inventory posture derived from one stock record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockPolicy {
    pub quantity: i64,
    pub allow_backorder: bool,
}

impl StockPolicy {
    /// `out_of_stock` code `0` denies backorders; `1` (allow) and `2`
    /// (defer to shop default) both map to allow.
    #[must_use]
    pub fn from_record(stock: &RawStockAvailable) -> Self {
        Self {
            quantity: stock.quantity,
            allow_backorder: stock.out_of_stock != 0,
        }
    }

    /// Inventory is only managed while something is actually in stock.
    #[must_use]
    pub fn manage_inventory(&self) -> bool {
        self.quantity > 0
    }
}

impl Default for StockPolicy {
    /// Posture for a product with no stock record at all: nothing on hand,
    /// backorders deferred to the shop default (allowed).
    fn default() -> Self {
        Self {
            quantity: 0,
            allow_backorder: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// Maps a source category onto a target collection creation payload.
#[must_use]
pub fn normalize_collection(category: &RawCategory) -> NewCollection {
    NewCollection {
        title: unwrap_text(category.name.as_ref()),
        handle: unwrap_text(category.link_rewrite.as_ref()),
        metadata: CollectionMetadata {
            prestashop_id: category.id,
        },
    }
}

/// Field-level diff; an empty update means the write must be skipped.
#[must_use]
pub fn collection_update(desired: &NewCollection, existing: &Collection) -> CollectionUpdate {
    CollectionUpdate {
        title: (desired.title != existing.title).then(|| desired.title.clone()),
        handle: (desired.handle != existing.handle).then(|| desired.handle.clone()),
    }
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// Maps a full source product onto a target product creation payload.
///
/// Options and collection assignment are resolved by the reconciler and
/// filled in afterwards; `images` holds source URLs until the image pipeline
/// replaces them with hosted ones.
#[must_use]
pub fn normalize_product(
    product: &RawProduct,
    images: Option<&[String]>,
    generate_new_handles: bool,
) -> NewProduct {
    let title = unwrap_text(product.name.as_ref());
    NewProduct {
        handle: handle_for(&title, product.link_rewrite.as_ref(), generate_new_handles),
        subtitle: text_opt(product.description_short.as_ref()),
        description: text_opt(product.description.as_ref()),
        is_giftcard: false,
        discountable: true,
        weight: weight_units(&product.weight),
        height: dimension_units(&product.height),
        length: dimension_units(&product.depth),
        width: dimension_units(&product.width),
        external_id: product.id,
        status: if parse_flag(&product.active) {
            ProductStatus::Published
        } else {
            ProductStatus::Draft
        },
        images: images.map(<[String]>::to_vec).unwrap_or_default(),
        options: Vec::new(),
        collection_id: None,
        profile_id: None,
        metadata: ProductMetadata {
            prestashop_id: product.id,
            reference: product.reference.clone(),
            manufacturer_name: manufacturer_name(&product.manufacturer_name),
            date_upd: product.date_upd.clone(),
            meta_keywords: split_meta_keywords(product.meta_keywords.as_ref()),
        },
        title,
    }
}

/// Scalar field diff between the freshly normalized product and the stored
/// one. Options and images are reconciled separately and excluded here;
/// `collection_id` is only ever reassigned, never unset.
#[must_use]
pub fn product_update(desired: &NewProduct, existing: &Product) -> ProductUpdate {
    ProductUpdate {
        title: (desired.title != existing.title).then(|| desired.title.clone()),
        subtitle: (desired.subtitle != existing.subtitle).then(|| desired.subtitle.clone()),
        description: (desired.description != existing.description)
            .then(|| desired.description.clone()),
        handle: (desired.handle != existing.handle).then(|| desired.handle.clone()),
        status: (desired.status != existing.status).then_some(desired.status),
        weight: (desired.weight != existing.weight).then_some(desired.weight),
        height: (desired.height != existing.height).then_some(desired.height),
        length: (desired.length != existing.length).then_some(desired.length),
        width: (desired.width != existing.width).then_some(desired.width),
        collection_id: desired
            .collection_id
            .filter(|id| existing.collection_id != Some(*id)),
        metadata: (desired.metadata != existing.metadata).then(|| desired.metadata.clone()),
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Maps an attribute group onto a target option payload. Values carry the
/// source value id as a placeholder string; concrete display values arrive
/// with the combinations that use them.
#[must_use]
pub fn normalize_option(option: &RawOption) -> NewOption {
    NewOption {
        title: unwrap_text(option.name.as_ref()),
        values: option
            .associations
            .product_option_values
            .iter()
            .map(|value| OptionValue {
                value: value.id.to_string(),
                metadata: OptionValueMetadata {
                    prestashop_value: value.id,
                },
            })
            .collect(),
        metadata: OptionMetadata {
            prestashop_id: option.id,
        },
    }
}

/// Maps a fetched attribute value onto a target option value with its
/// display name resolved.
#[must_use]
pub fn normalize_option_value(value: &RawOptionValue) -> OptionValue {
    OptionValue {
        value: unwrap_text(value.name.as_ref()),
        metadata: OptionValueMetadata {
            prestashop_value: value.id,
        },
    }
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

/// Joins option values into a display title, association order preserved,
/// last value unsuffixed.
#[must_use]
pub fn variant_title(options: &[VariantOptionValue]) -> String {
    if options.is_empty() {
        return "Default".to_string();
    }
    options
        .iter()
        .map(|o| o.value.as_str())
        .collect::<Vec<_>>()
        .join(" - ")
}

fn price_rows(amount: i64, currencies: &[String]) -> Vec<MoneyAmount> {
    currencies
        .iter()
        .map(|currency| MoneyAmount {
            currency_code: currency.clone(),
            amount,
        })
        .collect()
}

/// Maps a combination onto a variant creation payload. The price is the
/// product base plus the combination delta, duplicated per store currency.
#[must_use]
pub fn normalize_combination_variant(
    combination: &RawCombination,
    base_price: &str,
    stock: StockPolicy,
    options: Vec<VariantOptionValue>,
    currencies: &[String],
) -> NewVariant {
    let amount = combined_minor_units(base_price, &combination.price);
    NewVariant {
        title: variant_title(&options),
        sku: none_if_empty(&combination.reference),
        barcode: none_if_empty(&combination.ean13),
        ean: none_if_empty(&combination.ean13),
        upc: none_if_empty(&combination.upc),
        prices: price_rows(amount, currencies),
        inventory_quantity: stock.quantity,
        allow_backorder: stock.allow_backorder,
        manage_inventory: stock.manage_inventory(),
        weight: weight_units(&combination.weight),
        height: 0,
        length: 0,
        width: 0,
        options,
        metadata: VariantMetadata {
            prestashop_id: combination.id,
            isbn: none_if_empty(&combination.isbn),
            supplier_reference: none_if_empty(&combination.supplier_reference),
            location: none_if_empty(&combination.location),
        },
    }
}

/// Maps a simple product onto its single `"Default"` variant. The variant
/// has no options and takes SKU and barcodes straight from the product.
#[must_use]
pub fn normalize_default_variant(
    product: &RawProduct,
    stock: StockPolicy,
    currencies: &[String],
) -> NewVariant {
    NewVariant {
        title: "Default".to_string(),
        sku: none_if_empty(&product.reference),
        barcode: none_if_empty(&product.ean13),
        ean: none_if_empty(&product.ean13),
        upc: none_if_empty(&product.upc),
        prices: price_rows(to_minor_units(&product.price), currencies),
        inventory_quantity: stock.quantity,
        allow_backorder: stock.allow_backorder,
        manage_inventory: stock.manage_inventory(),
        weight: weight_units(&product.weight),
        height: dimension_units(&product.height),
        length: dimension_units(&product.depth),
        width: dimension_units(&product.width),
        options: Vec::new(),
        // Simple products have no combination record; the parent product id
        // doubles as the variant correlation anchor.
        metadata: VariantMetadata {
            prestashop_id: product.id,
            isbn: none_if_empty(&product.isbn),
            supplier_reference: none_if_empty(&product.supplier_reference),
            location: none_if_empty(&product.location),
        },
    }
}

/// Update payload for an existing combination variant: each pass only
/// re-synchronizes title, price, stock posture, and option selections.
#[must_use]
pub fn combination_variant_update(desired: &NewVariant, existing: &Variant) -> VariantUpdate {
    VariantUpdate {
        title: (desired.title != existing.title).then(|| desired.title.clone()),
        prices: (desired.prices != existing.prices).then(|| desired.prices.clone()),
        inventory_quantity: (desired.inventory_quantity != existing.inventory_quantity)
            .then_some(desired.inventory_quantity),
        allow_backorder: (desired.allow_backorder != existing.allow_backorder)
            .then_some(desired.allow_backorder),
        manage_inventory: (desired.manage_inventory != existing.manage_inventory)
            .then_some(desired.manage_inventory),
        options: (desired.options != existing.options).then(|| desired.options.clone()),
        ..VariantUpdate::default()
    }
}

/// Update payload for the default variant of a simple product, or for a
/// standalone variant being absorbed: identity fields and prices, no option
/// changes. `retitle` keeps the existing title on the absorb path.
#[must_use]
pub fn default_variant_update(
    desired: &NewVariant,
    existing: &Variant,
    retitle: bool,
) -> VariantUpdate {
    VariantUpdate {
        title: (retitle && desired.title != existing.title).then(|| desired.title.clone()),
        sku: (desired.sku != existing.sku).then(|| desired.sku.clone()),
        barcode: (desired.barcode != existing.barcode).then(|| desired.barcode.clone()),
        ean: (desired.ean != existing.ean).then(|| desired.ean.clone()),
        upc: (desired.upc != existing.upc).then(|| desired.upc.clone()),
        prices: (desired.prices != existing.prices).then(|| desired.prices.clone()),
        inventory_quantity: (desired.inventory_quantity != existing.inventory_quantity)
            .then_some(desired.inventory_quantity),
        allow_backorder: (desired.allow_backorder != existing.allow_backorder)
            .then_some(desired.allow_backorder),
        manage_inventory: (desired.manage_inventory != existing.manage_inventory)
            .then_some(desired.manage_inventory),
        options: None,
    }
}
