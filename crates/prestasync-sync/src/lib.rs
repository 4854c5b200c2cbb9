pub mod category;
pub mod error;
pub mod identity;
pub mod images;
pub mod normalize;
pub mod options;
pub mod orchestrator;
pub mod product;
pub mod report;

pub use category::CollectionReconciler;
pub use error::{ConfigurationError, SyncError};
pub use identity::{resolve_identity, Identity};
pub use orchestrator::{Importer, SyncOptions};
pub use product::ProductReconciler;
pub use report::{
    CollectionOutcome, ItemFailure, PassReport, ProductAction, ProductOutcome, SyncSummary,
    WriteEntity, WriteFailure,
};
