use thiserror::Error;

/// Errors returned by the PrestaShop webservice client.
///
/// Everything here reads as "source unavailable" to the sync engine; the
/// variants exist so retry policy and the variant-deletion probe can
/// distinguish transient transport failures from definitive answers.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The webservice returned an error body with a message.
    #[error("PrestaShop API error: {0}")]
    ApiError(String),

    /// HTTP 404, or a detail endpoint answering with an empty record list.
    #[error("record not found: {url}")]
    NotFound { url: String },

    /// Any other non-2xx status without a parseable error body.
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The image-listing XML body could not be parsed.
    #[error("XML parse error for {context}: {source}")]
    Xml {
        context: String,
        #[source]
        source: quick_xml::DeError,
    },

    /// The configured store base URL is not usable.
    #[error("invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}
