use thiserror::Error;

pub mod app_config;
pub mod catalog;
pub mod config;
pub mod store;

pub use app_config::AppConfig;
pub use catalog::{
    Collection, CollectionMetadata, CollectionUpdate, MoneyAmount, NewCollection, NewOption,
    NewProduct, NewVariant, OptionMetadata, OptionUpdate, OptionValue, OptionValueMetadata,
    Product, ProductMetadata, ProductOption, ProductStatus, ProductUpdate, StoreDefaults, Variant,
    VariantMetadata, VariantOptionValue, VariantUpdate,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use store::{CatalogStore, FileStore, StoreError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
