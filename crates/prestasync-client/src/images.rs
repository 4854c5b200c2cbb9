//! Parsing for the image-listing endpoint, the one XML-only surface of the
//! webservice.
//!
//! `GET /api/images/products/{id}` answers with:
//!
//! ```xml
//! <prestashop xmlns:xlink="http://www.w3.org/1999/xlink">
//!   <image>
//!     <declination id="25" xlink:href="https://shop.example.com/api/images/products/19/25"/>
//!     <declination id="26" xlink:href="https://shop.example.com/api/images/products/19/26"/>
//!   </image>
//! </prestashop>
//! ```
//!
//! A product with a single image emits one bare `declination` element rather
//! than a list; both shapes deserialize into the same `Vec`.

use serde::Deserialize;

use crate::error::SourceError;

/// One hosted image of a product, as listed by the webservice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDeclination {
    pub id: i64,
    /// Absolute URL of the image resource (still requires `ws_key` to fetch).
    pub href: String,
}

#[derive(Debug, Deserialize)]
struct PrestashopDocument {
    #[serde(default)]
    image: Option<ImageNode>,
}

#[derive(Debug, Deserialize)]
struct ImageNode {
    #[serde(default)]
    declination: Vec<DeclinationNode>,
}

#[derive(Debug, Deserialize)]
struct DeclinationNode {
    #[serde(rename = "@id")]
    id: i64,
    #[serde(rename = "@href")]
    href: String,
}

/// Parses the image-listing XML body into declination entries.
///
/// A document without an `<image>` node (product has no images) yields an
/// empty list, not an error.
///
/// # Errors
///
/// Returns [`SourceError::Xml`] if the body is not valid listing XML.
pub fn parse_image_listing(xml: &str, context: &str) -> Result<Vec<ImageDeclination>, SourceError> {
    let document: PrestashopDocument =
        quick_xml::de::from_str(xml).map_err(|e| SourceError::Xml {
            context: context.to_owned(),
            source: e,
        })?;

    Ok(document
        .image
        .map(|node| {
            node.declination
                .into_iter()
                .map(|d| ImageDeclination {
                    id: d.id,
                    href: d.href,
                })
                .collect()
        })
        .unwrap_or_default())
}
