//! PrestaShop webservice response types.
//!
//! ## Observed wire quirks
//!
//! ### Numeric-as-string fields
//! Scalar numerics (`price`, `weight`, `quantity`, the `active` flag) arrive
//! as decimal strings (`"19.99"`, `"1"`). They stay `String` here; coercion
//! is the normalizers' job, so a malformed value degrades predictably instead
//! of failing the whole fetch.
//!
//! ### Association ids
//! Ids inside `associations` lists are strings (`{"id": "25"}`) while
//! top-level `id` fields are numbers. `de_flexible_i64` accepts both, plus
//! `null`/empty-string as `0`, which the webservice emits for
//! `id_product_attribute` on product-level stock rows.
//!
//! ### Localized text
//! Depending on webservice version and language configuration, localized
//! fields arrive either as a plain string (`"Shoes"`) or wrapped
//! (`{"value": "Shoes"}`). [`TextValue`] is the single internal
//! representation for both shapes; both unwrap identically.

use serde::{Deserialize, Deserializer};

/// A localized text field in either of the two observed wire shapes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TextValue {
    Plain(String),
    Wrapped { value: String },
}

impl TextValue {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            TextValue::Plain(s) => s,
            TextValue::Wrapped { value } => value,
        }
    }

    #[must_use]
    pub fn into_string(self) -> String {
        match self {
            TextValue::Plain(s) => s,
            TextValue::Wrapped { value } => value,
        }
    }
}

impl Default for TextValue {
    fn default() -> Self {
        TextValue::Plain(String::new())
    }
}

/// Accepts an id as a JSON number, a numeric string, `null`, or `""`.
///
/// `null` and the empty string map to `0` (the webservice's "no record"
/// marker on foreign keys); anything else must parse as an integer.
pub(crate) fn de_flexible_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Num(i64),
        Text(String),
    }

    match Option::<IdRepr>::deserialize(deserializer)? {
        None => Ok(0),
        Some(IdRepr::Num(n)) => Ok(n),
        Some(IdRepr::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(0)
            } else {
                trimmed.parse::<i64>().map_err(serde::de::Error::custom)
            }
        }
    }
}

/// A bare foreign-key entry inside an `associations` list.
#[derive(Debug, Clone, Deserialize)]
pub struct IdRef {
    #[serde(deserialize_with = "de_flexible_i64")]
    pub id: i64,
}

/// A stock reference on a product: the stock record id plus the combination
/// it belongs to (`0` for product-level stock).
#[derive(Debug, Clone, Deserialize)]
pub struct StockRef {
    #[serde(deserialize_with = "de_flexible_i64")]
    pub id: i64,
    #[serde(default, deserialize_with = "de_flexible_i64")]
    pub id_product_attribute: i64,
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCategory {
    pub id: i64,
    #[serde(default)]
    pub name: Option<TextValue>,
    #[serde(default)]
    pub link_rewrite: Option<TextValue>,
    #[serde(default)]
    pub active: String,
    #[serde(default)]
    pub date_upd: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoriesEnvelope {
    #[serde(default)]
    pub categories: Vec<RawCategory>,
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// Foreign-key lists a full product detail carries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductAssociations {
    #[serde(default)]
    pub categories: Vec<IdRef>,
    #[serde(default)]
    pub stock_availables: Vec<StockRef>,
    #[serde(default)]
    pub product_option_values: Vec<IdRef>,
    #[serde(default)]
    pub combinations: Vec<IdRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProduct {
    pub id: i64,
    #[serde(default)]
    pub name: Option<TextValue>,
    #[serde(default)]
    pub link_rewrite: Option<TextValue>,
    #[serde(default)]
    pub description: Option<TextValue>,
    #[serde(default)]
    pub description_short: Option<TextValue>,
    /// SKU surrogate; the webservice has no first-class SKU field.
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub supplier_reference: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub ean13: String,
    #[serde(default)]
    pub isbn: String,
    #[serde(default)]
    pub upc: String,
    /// Major-currency units as a decimal string, e.g. `"19.99"`.
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub height: String,
    #[serde(default)]
    pub width: String,
    #[serde(default)]
    pub depth: String,
    /// `"1"` published, `"0"` draft.
    #[serde(default)]
    pub active: String,
    /// String name, or `false` when the product has no manufacturer.
    #[serde(default)]
    pub manufacturer_name: serde_json::Value,
    #[serde(default)]
    pub meta_keywords: Option<TextValue>,
    #[serde(default)]
    pub date_upd: Option<String>,
    #[serde(default)]
    pub associations: ProductAssociations,
}

#[derive(Debug, Deserialize)]
pub struct ProductsEnvelope {
    #[serde(default)]
    pub products: Vec<RawProduct>,
}

// ---------------------------------------------------------------------------
// Options (attribute groups) and option values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptionAssociations {
    #[serde(default)]
    pub product_option_values: Vec<IdRef>,
}

/// An attribute group, e.g. "Color". Only reachable by following an option
/// value's `id_attribute_group` — products link values, not groups.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOption {
    pub id: i64,
    #[serde(default)]
    pub name: Option<TextValue>,
    #[serde(default)]
    pub public_name: Option<TextValue>,
    #[serde(default)]
    pub associations: OptionAssociations,
}

#[derive(Debug, Deserialize)]
pub struct OptionsEnvelope {
    #[serde(default)]
    pub product_options: Vec<RawOption>,
}

/// An attribute value, e.g. "Red", pointing at its parent group.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOptionValue {
    pub id: i64,
    #[serde(default, deserialize_with = "de_flexible_i64")]
    pub id_attribute_group: i64,
    #[serde(default)]
    pub name: Option<TextValue>,
    #[serde(default)]
    pub position: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OptionValuesEnvelope {
    #[serde(default)]
    pub product_option_values: Vec<RawOptionValue>,
}

// ---------------------------------------------------------------------------
// Combinations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CombinationAssociations {
    #[serde(default)]
    pub product_option_values: Vec<IdRef>,
}

/// One concrete variant of a configurable product. `price` is a delta on top
/// of the parent product's base price, not an absolute amount.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCombination {
    pub id: i64,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub supplier_reference: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub ean13: String,
    #[serde(default)]
    pub isbn: String,
    #[serde(default)]
    pub upc: String,
    /// Price impact relative to the parent product, decimal string.
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub associations: CombinationAssociations,
}

#[derive(Debug, Deserialize)]
pub struct CombinationsEnvelope {
    #[serde(default)]
    pub combinations: Vec<RawCombination>,
}

// ---------------------------------------------------------------------------
// Stock
// ---------------------------------------------------------------------------

/// A stock record for a product or a specific combination.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStockAvailable {
    pub id: i64,
    #[serde(default, deserialize_with = "de_flexible_i64")]
    pub id_product: i64,
    #[serde(default, deserialize_with = "de_flexible_i64")]
    pub id_product_attribute: i64,
    #[serde(default, deserialize_with = "de_flexible_i64")]
    pub quantity: i64,
    /// Backorder policy code: `0` deny, `1` allow, `2` defer to the shop
    /// default. Collapsed to a boolean during normalization (`0` ⇒ deny).
    #[serde(default, deserialize_with = "de_flexible_i64")]
    pub out_of_stock: i64,
}

#[derive(Debug, Deserialize)]
pub struct StockAvailablesEnvelope {
    #[serde(default)]
    pub stock_availables: Vec<RawStockAvailable>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_value_plain_unwraps() {
        let parsed: TextValue = serde_json::from_str("\"Shoes\"").unwrap();
        assert_eq!(parsed.as_str(), "Shoes");
    }

    #[test]
    fn text_value_wrapped_unwraps() {
        let parsed: TextValue = serde_json::from_str("{\"value\": \"Shoes\"}").unwrap();
        assert_eq!(parsed.as_str(), "Shoes");
    }

    #[test]
    fn flexible_id_accepts_number_and_string() {
        let a: IdRef = serde_json::from_str("{\"id\": 25}").unwrap();
        let b: IdRef = serde_json::from_str("{\"id\": \"25\"}").unwrap();
        assert_eq!(a.id, 25);
        assert_eq!(b.id, 25);
    }

    #[test]
    fn flexible_id_maps_null_and_empty_to_zero() {
        let a: StockRef = serde_json::from_str("{\"id\": 1, \"id_product_attribute\": null}")
            .unwrap();
        let b: StockRef = serde_json::from_str("{\"id\": 1, \"id_product_attribute\": \"\"}")
            .unwrap();
        assert_eq!(a.id_product_attribute, 0);
        assert_eq!(b.id_product_attribute, 0);
    }

    #[test]
    fn flexible_id_rejects_garbage() {
        let result = serde_json::from_str::<IdRef>("{\"id\": \"abc\"}");
        assert!(result.is_err());
    }

    #[test]
    fn product_associations_default_when_absent() {
        let product: RawProduct = serde_json::from_str("{\"id\": 7}").unwrap();
        assert!(product.associations.combinations.is_empty());
        assert!(product.associations.stock_availables.is_empty());
    }

    #[test]
    fn stock_out_of_stock_parses_string_code() {
        let stock: RawStockAvailable = serde_json::from_str(
            "{\"id\": 3, \"quantity\": \"12\", \"out_of_stock\": \"2\"}",
        )
        .unwrap();
        assert_eq!(stock.quantity, 12);
        assert_eq!(stock.out_of_stock, 2);
    }
}
