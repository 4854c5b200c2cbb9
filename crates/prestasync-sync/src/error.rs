use prestasync_client::SourceError;
use prestasync_core::StoreError;
use thiserror::Error;

/// Errors that abort the sync of a single entity, or — for configuration —
/// the whole pass.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The source API could not deliver a record the sync needed.
    #[error("source unavailable: {0}")]
    Source(#[from] SourceError),

    /// The target catalog rejected a load-bearing operation (identity
    /// lookup, product create). Individual variant/option/image write
    /// failures are collected into the pass report instead.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Store defaults required by normalization are missing. Fatal for the
    /// pass: no product can be normalized without them.
    #[error(transparent)]
    Config(#[from] ConfigurationError),
}

/// Missing store-level defaults, checked before any item is processed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("the target store has no currencies configured")]
    MissingCurrencies,

    #[error("the target store has no default shipping profile configured")]
    MissingShippingProfile,
}
