//! HTTP client for the PrestaShop webservice.
//!
//! Wraps `reqwest` with PrestaShop-specific error handling, `ws_key` query
//! authentication, and typed response deserialization. Responses are JSON
//! except the image-listing endpoint, which only speaks XML. All endpoints
//! retry transient failures with back-off before surfacing an error.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::SourceError;
use crate::images::{parse_image_listing, ImageDeclination};
use crate::retry::retry_with_backoff;
use crate::types::{
    CategoriesEnvelope, CombinationsEnvelope, OptionValuesEnvelope, OptionsEnvelope,
    ProductsEnvelope, RawCategory, RawCombination, RawOption, RawOptionValue, RawProduct,
    RawStockAvailable, StockAvailablesEnvelope,
};

const ACCEPT_JSON: &str = "application/json";
const ACCEPT_XML: &str = "application/xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Xml,
}

/// Client for the PrestaShop webservice API.
///
/// Construct with [`PrestashopClient::new`] against the store's base URL
/// (the `/api` prefix is appended per request); point at a mock server in
/// tests the same way.
pub struct PrestashopClient {
    client: Client,
    base_url: Url,
    ws_key: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl PrestashopClient {
    /// Creates a new client for the store at `base_url`.
    ///
    /// `max_retries` is the number of additional attempts after the first
    /// failure for transient errors; `backoff_base_ms` the starting delay of
    /// the exponential back-off schedule.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidBaseUrl`] if `base_url` does not parse,
    /// or [`SourceError::Http`] if the underlying `reqwest::Client` cannot be
    /// constructed.
    pub fn new(
        base_url: &str,
        ws_key: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("prestasync/0.1 (catalog-sync)")
            .build()?;

        // Normalise: exactly one trailing slash so Url::join appends to the
        // path instead of replacing the last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url =
            Url::parse(&normalised).map_err(|e| SourceError::InvalidBaseUrl {
                base_url: base_url.to_owned(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url,
            ws_key: ws_key.to_owned(),
            max_retries,
            backoff_base_ms,
        })
    }

    // -- categories ---------------------------------------------------------

    /// Lists all categories (summary records).
    ///
    /// # Errors
    ///
    /// Any [`SourceError`] from transport, auth, or deserialization.
    pub async fn list_categories(&self) -> Result<Vec<RawCategory>, SourceError> {
        let url = self.api_url("api/categories", Format::Json)?;
        let envelope: Option<CategoriesEnvelope> = self.fetch_envelope(&url, "categories").await?;
        Ok(envelope.map(|e| e.categories).unwrap_or_default())
    }

    /// Fetches one category in full.
    ///
    /// # Errors
    ///
    /// [`SourceError::NotFound`] if the id does not exist, otherwise any
    /// transport or deserialization error.
    pub async fn get_category(&self, id: i64) -> Result<RawCategory, SourceError> {
        let url = self.api_url(&format!("api/categories/{id}"), Format::Json)?;
        let envelope: Option<CategoriesEnvelope> =
            self.fetch_envelope(&url, &format!("category {id}")).await?;
        Self::first_or_not_found(envelope.map(|e| e.categories).unwrap_or_default(), &url)
    }

    // -- products -----------------------------------------------------------

    /// Lists all products (summary records).
    ///
    /// # Errors
    ///
    /// Any [`SourceError`] from transport, auth, or deserialization.
    pub async fn list_products(&self) -> Result<Vec<RawProduct>, SourceError> {
        let url = self.api_url("api/products", Format::Json)?;
        let envelope: Option<ProductsEnvelope> = self.fetch_envelope(&url, "products").await?;
        Ok(envelope.map(|e| e.products).unwrap_or_default())
    }

    /// Fetches one product in full, including its association lists.
    ///
    /// # Errors
    ///
    /// [`SourceError::NotFound`] if the id does not exist, otherwise any
    /// transport or deserialization error.
    pub async fn get_product(&self, id: i64) -> Result<RawProduct, SourceError> {
        let url = self.api_url(&format!("api/products/{id}"), Format::Json)?;
        let envelope: Option<ProductsEnvelope> =
            self.fetch_envelope(&url, &format!("product {id}")).await?;
        Self::first_or_not_found(envelope.map(|e| e.products).unwrap_or_default(), &url)
    }

    // -- options ------------------------------------------------------------

    /// Fetches an attribute group by id.
    ///
    /// # Errors
    ///
    /// [`SourceError::NotFound`] if the id does not exist, otherwise any
    /// transport or deserialization error.
    pub async fn get_option(&self, id: i64) -> Result<RawOption, SourceError> {
        let url = self.api_url(&format!("api/product_options/{id}"), Format::Json)?;
        let envelope: Option<OptionsEnvelope> =
            self.fetch_envelope(&url, &format!("option {id}")).await?;
        Self::first_or_not_found(envelope.map(|e| e.product_options).unwrap_or_default(), &url)
    }

    /// Fetches an attribute value by id; its `id_attribute_group` leads to
    /// the parent option.
    ///
    /// # Errors
    ///
    /// [`SourceError::NotFound`] if the id does not exist, otherwise any
    /// transport or deserialization error.
    pub async fn get_option_value(&self, id: i64) -> Result<RawOptionValue, SourceError> {
        let url = self.api_url(&format!("api/product_option_values/{id}"), Format::Json)?;
        let envelope: Option<OptionValuesEnvelope> = self
            .fetch_envelope(&url, &format!("option value {id}"))
            .await?;
        Self::first_or_not_found(
            envelope.map(|e| e.product_option_values).unwrap_or_default(),
            &url,
        )
    }

    // -- stock --------------------------------------------------------------

    /// Fetches a stock record by id.
    ///
    /// # Errors
    ///
    /// [`SourceError::NotFound`] if the id does not exist, otherwise any
    /// transport or deserialization error.
    pub async fn get_stock_available(&self, id: i64) -> Result<RawStockAvailable, SourceError> {
        let url = self.api_url(&format!("api/stock_availables/{id}"), Format::Json)?;
        let envelope: Option<StockAvailablesEnvelope> = self
            .fetch_envelope(&url, &format!("stock record {id}"))
            .await?;
        Self::first_or_not_found(envelope.map(|e| e.stock_availables).unwrap_or_default(), &url)
    }

    // -- combinations -------------------------------------------------------

    /// Fetches one combination record, or `None` when the source no longer
    /// has it (HTTP 404 or empty envelope).
    ///
    /// This is the variant-deletion probe: `Ok(None)` means "definitively
    /// gone"; transport failures stay errors so a network flap never reads
    /// as a deletion.
    ///
    /// # Errors
    ///
    /// Any [`SourceError`] other than not-found.
    pub async fn get_combination(&self, id: i64) -> Result<Option<RawCombination>, SourceError> {
        let url = self.api_url(&format!("api/combinations/{id}"), Format::Json)?;
        let envelope: Result<Option<CombinationsEnvelope>, SourceError> =
            self.fetch_envelope(&url, &format!("combination {id}")).await;
        match envelope {
            Ok(envelope) => Ok(envelope.and_then(|e| e.combinations.into_iter().next())),
            Err(SourceError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    // -- images -------------------------------------------------------------

    /// Lists a product's image declinations via the XML-only endpoint.
    ///
    /// # Errors
    ///
    /// [`SourceError::Xml`] on a malformed body, otherwise any transport
    /// error. A product without images yields an empty list.
    pub async fn get_product_images(
        &self,
        product_id: i64,
    ) -> Result<Vec<ImageDeclination>, SourceError> {
        let url = self.api_url(&format!("api/images/products/{product_id}"), Format::Xml)?;
        let body = match self.get_text(&url, ACCEPT_XML).await {
            Ok(body) => body,
            // No images on the product answers 404 rather than an empty list.
            Err(SourceError::NotFound { .. }) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        parse_image_listing(&body, &format!("images of product {product_id}"))
    }

    /// Downloads raw image bytes from a declination URL, appending `ws_key`.
    ///
    /// # Errors
    ///
    /// Any [`SourceError`] from transport or auth.
    pub async fn download_image(&self, href: &str) -> Result<Vec<u8>, SourceError> {
        let mut url = Url::parse(href).map_err(|e| SourceError::InvalidBaseUrl {
            base_url: href.to_owned(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut().append_pair("ws_key", &self.ws_key);
        self.get_bytes(&url).await
    }

    // -- internals ----------------------------------------------------------

    /// Builds a webservice URL with `ws_key` (and `output_format=JSON` for
    /// JSON endpoints) appended as query parameters.
    fn api_url(&self, path: &str, format: Format) -> Result<Url, SourceError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| SourceError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("ws_key", &self.ws_key);
            if format == Format::Json {
                pairs.append_pair("output_format", "JSON");
            }
        }
        Ok(url)
    }

    /// Fetches and parses a JSON envelope. Returns `Ok(None)` when the body
    /// is a bare array — the webservice's way of saying "no records".
    async fn fetch_envelope<T: DeserializeOwned>(
        &self,
        url: &Url,
        context: &str,
    ) -> Result<Option<T>, SourceError> {
        let body = self.get_text(url, ACCEPT_JSON).await?;
        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
                context: context.to_owned(),
                source: e,
            })?;
        if value.is_array() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| SourceError::Deserialize {
                context: context.to_owned(),
                source: e,
            })
    }

    /// Sends a GET request with retry, triaging the status code into typed
    /// errors, and returns the response body.
    async fn get_text(&self, url: &Url, accept: &'static str) -> Result<String, SourceError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .get(url.clone())
                    .header(reqwest::header::ACCEPT, accept)
                    .send()
                    .await?;
                let status = response.status();

                if status == StatusCode::NOT_FOUND {
                    return Err(SourceError::NotFound {
                        url: Self::display_url(&url),
                    });
                }

                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(match Self::extract_error_message(&body) {
                        Some(message) => SourceError::ApiError(message),
                        None => SourceError::UnexpectedStatus {
                            status: status.as_u16(),
                            url: Self::display_url(&url),
                        },
                    });
                }

                Ok(response.text().await?)
            }
        })
        .await
    }

    /// Sends a GET request with retry and returns the raw body bytes.
    async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, SourceError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move {
                let response = self.client.get(url.clone()).send().await?;
                let status = response.status();

                if status == StatusCode::NOT_FOUND {
                    return Err(SourceError::NotFound {
                        url: Self::display_url(&url),
                    });
                }

                if !status.is_success() {
                    return Err(SourceError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: Self::display_url(&url),
                    });
                }

                Ok(response.bytes().await?.to_vec())
            }
        })
        .await
    }

    /// URL without its query string, for error messages and logs — the query
    /// carries the webservice key and must never be echoed.
    fn display_url(url: &Url) -> String {
        let mut clean = url.clone();
        clean.set_query(None);
        clean.to_string()
    }

    /// Pulls the first message out of a PrestaShop error body:
    /// `{"errors": [{"code": 21, "message": "..."}]}`.
    fn extract_error_message(body: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        value
            .get("errors")?
            .as_array()?
            .first()?
            .get("message")?
            .as_str()
            .map(str::to_owned)
    }

    fn first_or_not_found<T>(mut items: Vec<T>, url: &Url) -> Result<T, SourceError> {
        if items.is_empty() {
            Err(SourceError::NotFound {
                url: Self::display_url(url),
            })
        } else {
            Ok(items.remove(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> PrestashopClient {
        PrestashopClient::new(base_url, "test-key", 30, 0, 0)
            .expect("client construction should not fail")
    }

    #[test]
    fn api_url_appends_key_and_format() {
        let client = test_client("https://shop.example.com");
        let url = client.api_url("api/products/5", Format::Json).unwrap();
        assert_eq!(
            url.as_str(),
            "https://shop.example.com/api/products/5?ws_key=test-key&output_format=JSON"
        );
    }

    #[test]
    fn api_url_xml_omits_output_format() {
        let client = test_client("https://shop.example.com/");
        let url = client
            .api_url("api/images/products/19", Format::Xml)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://shop.example.com/api/images/products/19?ws_key=test-key"
        );
    }

    #[test]
    fn display_url_strips_the_query_string() {
        let client = test_client("https://shop.example.com");
        let url = client.api_url("api/products", Format::Json).unwrap();
        assert_eq!(
            PrestashopClient::display_url(&url),
            "https://shop.example.com/api/products"
        );
    }

    #[test]
    fn extract_error_message_reads_first_error() {
        let body = r#"{"errors": [{"code": 21, "message": "Invalid webservice key"}]}"#;
        assert_eq!(
            PrestashopClient::extract_error_message(body).as_deref(),
            Some("Invalid webservice key")
        );
    }

    #[test]
    fn extract_error_message_none_for_plain_body() {
        assert!(PrestashopClient::extract_error_message("<html>boom</html>").is_none());
    }
}
