//! Image mirroring: source URLs → downloaded bytes → hosted URLs.
//!
//! The product's hosted image list is always a full replace, so a re-run
//! re-downloads and re-uploads everything. Wasteful, but the source gives no
//! image fingerprint to diff against, and the replace keeps the target
//! consistent when source images change in place.

use std::collections::HashSet;

use prestasync_client::PrestashopClient;
use prestasync_core::store::FileStore;

use crate::report::{WriteEntity, WriteFailure};

/// Drops duplicate URLs, keeping the first occurrence of each.
#[must_use]
pub fn dedupe_urls(urls: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.iter()
        .filter(|url| seen.insert(url.as_str()))
        .cloned()
        .collect()
}

/// Downloads and re-hosts a product's images.
pub struct ImagePipeline<'a, F> {
    client: &'a PrestashopClient,
    files: &'a F,
}

impl<'a, F: FileStore> ImagePipeline<'a, F> {
    pub fn new(client: &'a PrestashopClient, files: &'a F) -> Self {
        Self { client, files }
    }

    /// Mirrors the deduped URL list into hosted storage. Returns the hosted
    /// URLs in order plus a failure record per image that could not be moved;
    /// one bad image never aborts the rest.
    ///
    /// The upload filename derives from the product handle with a `.jpeg`
    /// extension, matching how the source serves renditions.
    pub async fn mirror(
        &self,
        source_product_id: i64,
        handle: &str,
        urls: &[String],
    ) -> (Vec<String>, Vec<WriteFailure>) {
        let mut hosted = Vec::new();
        let mut failures = Vec::new();
        let filename = format!("{handle}.jpeg");

        for url in dedupe_urls(urls) {
            let bytes = match self.client.download_image(&url).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(
                        product_id = source_product_id,
                        url = %url,
                        error = %err,
                        "image download failed"
                    );
                    failures.push(WriteFailure {
                        entity: WriteEntity::Image,
                        source_id: source_product_id,
                        error: err.to_string(),
                    });
                    continue;
                }
            };

            match self.files.upload(&filename, &bytes).await {
                Ok(url) => hosted.push(url),
                Err(err) => {
                    tracing::warn!(
                        product_id = source_product_id,
                        error = %err,
                        "image upload failed"
                    );
                    failures.push(WriteFailure {
                        entity: WriteEntity::Image,
                        source_id: source_product_id,
                        error: err.to_string(),
                    });
                }
            }
        }

        (hosted, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_first_occurrence_order() {
        let urls = vec![
            "https://a/1".to_string(),
            "https://a/2".to_string(),
            "https://a/1".to_string(),
            "https://a/3".to_string(),
            "https://a/2".to_string(),
        ];
        assert_eq!(
            dedupe_urls(&urls),
            vec!["https://a/1", "https://a/2", "https://a/3"]
        );
    }

    #[test]
    fn dedupe_empty_is_empty() {
        assert!(dedupe_urls(&[]).is_empty());
    }
}
