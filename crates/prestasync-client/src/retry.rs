//! Retry with exponential back-off and jitter for source API calls.
//!
//! [`retry_with_backoff`] wraps a fallible async operation and retries on
//! transient errors only (network failures, 5xx). Definitive answers —
//! 404, 4xx, API error bodies, parse failures — are returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::SourceError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:**
/// - Network-level failures: timeout, connection reset.
/// - HTTP 5xx responses: transient server/infrastructure errors.
///
/// **Not retriable (hard stop):**
/// - [`SourceError::NotFound`] — a definitive answer, and the variant-deletion
///   probe depends on it being delivered promptly.
/// - [`SourceError::ApiError`] — application-level error; retrying won't fix it.
/// - [`SourceError::Deserialize`] / [`SourceError::Xml`] — malformed response.
/// - [`SourceError::UnexpectedStatus`] below 500 — client-side problem.
pub(crate) fn is_retriable(err: &SourceError) -> bool {
    match err {
        SourceError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        SourceError::UnexpectedStatus { status, .. } => *status >= 500,
        SourceError::ApiError(_)
        | SourceError::NotFound { .. }
        | SourceError::Deserialize { .. }
        | SourceError::Xml { .. }
        | SourceError::InvalidBaseUrl { .. } => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient
/// errors. Delay doubles per attempt from `backoff_base_ms`, capped at 60 s,
/// with ±25 % jitter.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "PrestaShop transient error — retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deserialize_err() -> SourceError {
        let src = serde_json::from_str::<()>("invalid").unwrap_err();
        SourceError::Deserialize {
            context: "test".to_owned(),
            source: src,
        }
    }

    #[test]
    fn not_found_is_not_retriable() {
        assert!(!is_retriable(&SourceError::NotFound {
            url: "https://shop.example.com/api/combinations/9".to_owned()
        }));
    }

    #[test]
    fn api_error_is_not_retriable() {
        assert!(!is_retriable(&SourceError::ApiError("bad key".to_owned())));
    }

    #[test]
    fn deserialize_error_is_not_retriable() {
        assert!(!is_retriable(&deserialize_err()));
    }

    #[test]
    fn server_error_status_is_retriable() {
        assert!(is_retriable(&SourceError::UnexpectedStatus {
            status: 503,
            url: "https://shop.example.com/api/products".to_owned()
        }));
    }

    #[test]
    fn client_error_status_is_not_retriable() {
        assert!(!is_retriable(&SourceError::UnexpectedStatus {
            status: 401,
            url: "https://shop.example.com/api/products".to_owned()
        }));
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, SourceError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn does_not_retry_not_found() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(SourceError::NotFound {
                    url: "https://shop.example.com/api/combinations/9".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1, "NotFound must not retry");
        assert!(matches!(result, Err(SourceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt < 3 {
                    Err::<u32, _>(SourceError::UnexpectedStatus {
                        status: 502,
                        url: "https://shop.example.com/api/products".to_owned(),
                    })
                } else {
                    Ok(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99, "should succeed after retries");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
