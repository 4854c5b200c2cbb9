//! Option discovery: deriving a product's option set from the option-value
//! ids the source links to it.
//!
//! The source only attaches *values* to a product; the option (attribute
//! group) has to be reached by fetching each value and following its
//! `id_attribute_group`. Several values on one product usually share a
//! parent, so discovery de-duplicates by source group id.
//!
//! Discovery folds into an owned [`DiscoveredOptions`] state rather than a
//! shared accumulator, and combinations are processed one at a time by
//! design — the fold is the concurrency contract.

use prestasync_client::types::{RawOptionValue, RawProduct};
use prestasync_client::{PrestashopClient, SourceError};
use prestasync_core::catalog::NewOption;

use crate::normalize::normalize_option;

/// The option set discovered for one product, de-duplicated by source
/// attribute-group id.
#[derive(Debug, Default)]
pub struct DiscoveredOptions {
    options: Vec<NewOption>,
}

impl DiscoveredOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, prestashop_id: i64) -> bool {
        self.options
            .iter()
            .any(|o| o.metadata.prestashop_id == prestashop_id)
    }

    /// Folds one option into the set; an already-known group id is a no-op.
    #[must_use]
    pub fn absorb(mut self, option: NewOption) -> Self {
        if !self.contains(option.metadata.prestashop_id) {
            self.options.push(option);
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &NewOption> {
        self.options.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<NewOption> {
        self.options
    }
}

/// Everything option discovery learned about one product: the de-duplicated
/// option set plus every fetched value record, which the update path uses to
/// refresh option value-lists with resolved display names.
#[derive(Debug, Default)]
pub struct OptionDiscovery {
    pub options: DiscoveredOptions,
    pub values: Vec<RawOptionValue>,
}

impl OptionDiscovery {
    /// Looks up a fetched value record by its source id.
    #[must_use]
    pub fn value_by_id(&self, prestashop_value: i64) -> Option<&RawOptionValue> {
        self.values.iter().find(|v| v.id == prestashop_value)
    }
}

/// Walks a product's `product_option_values` association, fetching each value
/// and its parent group, folding the groups into a de-duplicated option set.
///
/// # Errors
///
/// Returns the first [`SourceError`] encountered; option discovery is
/// all-or-nothing for a product because a partial option set would produce
/// variants referencing options that were never created.
pub async fn discover_options(
    client: &PrestashopClient,
    product: &RawProduct,
) -> Result<OptionDiscovery, SourceError> {
    let mut discovered = DiscoveredOptions::new();
    let mut values = Vec::new();

    for value_ref in &product.associations.product_option_values {
        let value = client.get_option_value(value_ref.id).await?;
        let group_id = value.id_attribute_group;
        values.push(value);

        if discovered.contains(group_id) {
            continue;
        }
        let option = client.get_option(group_id).await?;
        discovered = discovered.absorb(normalize_option(&option));
    }

    Ok(OptionDiscovery {
        options: discovered,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use prestasync_core::catalog::{OptionMetadata, OptionValue, OptionValueMetadata};

    fn option(prestashop_id: i64, title: &str) -> NewOption {
        NewOption {
            title: title.to_string(),
            values: vec![OptionValue {
                value: "7".to_string(),
                metadata: OptionValueMetadata {
                    prestashop_value: 7,
                },
            }],
            metadata: OptionMetadata { prestashop_id },
        }
    }

    #[test]
    fn absorb_deduplicates_by_group_id() {
        let discovered = DiscoveredOptions::new()
            .absorb(option(2, "Color"))
            .absorb(option(3, "Size"))
            .absorb(option(2, "Color again"));

        let titles: Vec<_> = discovered.iter().map(|o| o.title.as_str()).collect();
        assert_eq!(titles, vec!["Color", "Size"]);
    }

    #[test]
    fn contains_checks_group_id() {
        let discovered = DiscoveredOptions::new().absorb(option(2, "Color"));
        assert!(discovered.contains(2));
        assert!(!discovered.contains(9));
    }

    #[test]
    fn value_by_id_finds_fetched_record() {
        let discovery = OptionDiscovery {
            options: DiscoveredOptions::new(),
            values: vec![
                RawOptionValue {
                    id: 7,
                    id_attribute_group: 2,
                    name: None,
                    position: None,
                },
                RawOptionValue {
                    id: 12,
                    id_attribute_group: 3,
                    name: None,
                    position: None,
                },
            ],
        };

        assert_eq!(discovery.value_by_id(12).map(|v| v.id_attribute_group), Some(3));
        assert!(discovery.value_by_id(99).is_none());
    }
}
