//! Per-pass result accounting.
//!
//! Target writes inside a product sync are individually fallible; instead of
//! suppressing failures next to each call, they are recorded as typed
//! [`WriteFailure`]s so a pass result is observable and testable. A pass
//! always runs to completion — failures isolate to the item that caused them.

/// Which target entity a failed write was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteEntity {
    Collection,
    Product,
    Variant,
    Option,
    Image,
}

/// One failed create/update/delete against the target catalog, with enough
/// context (source id) for manual reconciliation.
#[derive(Debug, Clone)]
pub struct WriteFailure {
    pub entity: WriteEntity,
    /// Source-system id of the record being written.
    pub source_id: i64,
    pub error: String,
}

/// How the reconciler classified a product when it was synced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductAction {
    Created,
    Updated,
    /// The product matched an existing variant by SKU and was folded into it
    /// instead of becoming a duplicate product.
    AbsorbedVariant,
}

/// Outcome of syncing one product aggregate.
#[derive(Debug, Clone)]
pub struct ProductOutcome {
    pub action: ProductAction,
    pub variants_created: usize,
    pub variants_updated: usize,
    pub variants_deleted: usize,
    pub options_added: usize,
    pub options_updated: usize,
    pub options_removed: usize,
    pub images_uploaded: usize,
    pub write_failures: Vec<WriteFailure>,
}

impl ProductOutcome {
    #[must_use]
    pub fn new(action: ProductAction) -> Self {
        Self {
            action,
            variants_created: 0,
            variants_updated: 0,
            variants_deleted: 0,
            options_added: 0,
            options_updated: 0,
            options_removed: 0,
            images_uploaded: 0,
            write_failures: Vec::new(),
        }
    }
}

/// Outcome of reconciling one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionOutcome {
    Created,
    Updated,
    /// Diff against the existing collection was empty — no write issued.
    Unchanged,
}

/// An item (category or product) that failed entirely and was skipped.
#[derive(Debug, Clone)]
pub struct ItemFailure {
    pub source_id: i64,
    pub error: String,
}

/// Aggregated result of one full sync pass.
#[derive(Debug, Default)]
pub struct PassReport {
    pub collections_created: usize,
    pub collections_updated: usize,
    pub products_created: usize,
    pub products_updated: usize,
    pub variants_absorbed: usize,
    pub category_failures: Vec<ItemFailure>,
    pub product_failures: Vec<ItemFailure>,
    pub write_failures: Vec<WriteFailure>,
}

impl PassReport {
    pub fn record_collection(&mut self, outcome: CollectionOutcome) {
        match outcome {
            CollectionOutcome::Created => self.collections_created += 1,
            CollectionOutcome::Updated => self.collections_updated += 1,
            CollectionOutcome::Unchanged => {}
        }
    }

    pub fn record_product(&mut self, outcome: ProductOutcome) {
        match outcome.action {
            ProductAction::Created => self.products_created += 1,
            ProductAction::Updated => self.products_updated += 1,
            ProductAction::AbsorbedVariant => self.variants_absorbed += 1,
        }
        self.write_failures.extend(outcome.write_failures);
    }
}

/// Result of [`crate::Importer::run_full_sync`]: item counts plus the report.
#[derive(Debug)]
pub struct SyncSummary {
    pub categories_processed: usize,
    pub products_processed: usize,
    pub report: PassReport,
}

impl SyncSummary {
    /// Whether a failed pass should be scheduled again. Always `true` — the
    /// batch contract retries unconditionally; callers owning the schedule
    /// are expected to impose their own budget.
    #[must_use]
    pub fn should_retry(&self) -> bool {
        true
    }
}
