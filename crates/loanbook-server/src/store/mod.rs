//! Storage abstraction for the catalog pipeline
//!
//! Every pipeline component and query handler receives a [`CatalogStore`]
//! at construction instead of reaching for a global connection handle; this
//! is what lets the validation and reconciliation logic run against the
//! in-memory store in tests.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    AuditEntry, BatchStatus, ChunkLog, ChunkWrite, InvalidRow, Product, ProductRecord, RowOutcome,
    StagingRow, UploadBatch, ValidationCounts,
};

pub mod memory;
pub mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Storage operation errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQL query or connection error
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Requested record does not exist
    #[error("{0}")]
    NotFound(String),

    /// Invariant violation detected by the store itself
    #[error("{0}")]
    Internal(String),
}

impl StoreError {
    /// Create a not found error with resource context
    pub fn not_found(resource_type: &str, identifier: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{} '{}' not found", resource_type, identifier))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Filter for canonical product listing
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Substring match against product id or name.
    pub search: Option<String>,
    /// When set, restrict to active (or inactive) products.
    pub active_only: Option<bool>,
    pub limit: i64,
    pub offset: i64,
}

/// Data-access contract for batches, staging rows, canonical products,
/// audit history, and chunk logs.
///
/// Transactional guarantees the implementations must uphold:
/// - `create_batch` writes the batch header and all staging rows in one
///   transaction; a failure leaves neither behind.
/// - `apply_validation` persists every row outcome, the recounted
///   valid/invalid totals, and the VALIDATED status atomically.
/// - `commit_chunk` applies one chunk's product upserts, audit entries,
///   PROCESSED marks, and chunk log as a single unit of work.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    // ------------------------------------------------------------------
    // Batches and staging
    // ------------------------------------------------------------------

    /// Create the batch header (status UPLOADED, totals initialized) and
    /// stage all records in ordinal order, tagged PENDING.
    async fn create_batch(
        &self,
        file_name: &str,
        uploaded_by: &str,
        records: &[ProductRecord],
    ) -> StoreResult<Uuid>;

    async fn get_batch(&self, batch_id: Uuid) -> StoreResult<UploadBatch>;

    /// Most-recent-first page of batches plus the unfiltered total.
    async fn list_batches(&self, limit: i64, offset: i64) -> StoreResult<(Vec<UploadBatch>, i64)>;

    async fn update_batch_status(&self, batch_id: Uuid, status: BatchStatus) -> StoreResult<()>;

    /// Transition to PROCESSING and stamp the processing-start time,
    /// clearing any previous completion timestamp.
    async fn mark_processing_started(&self, batch_id: Uuid) -> StoreResult<()>;

    /// Transition to COMPLETED and stamp the processing-end time.
    async fn mark_completed(&self, batch_id: Uuid) -> StoreResult<()>;

    /// All staging rows for a batch in ordinal order.
    async fn staging_rows(&self, batch_id: Uuid) -> StoreResult<Vec<StagingRow>>;

    /// Persist per-row validation outcomes, recount valid/invalid totals,
    /// and set the batch VALIDATED.
    async fn apply_validation(
        &self,
        batch_id: Uuid,
        outcomes: &[RowOutcome],
    ) -> StoreResult<ValidationCounts>;

    async fn invalid_rows(&self, batch_id: Uuid) -> StoreResult<Vec<InvalidRow>>;

    /// Staging ids of all VALID rows in insertion order. The processor
    /// snapshots this once so chunk offsets stay stable while rows flip
    /// to PROCESSED.
    async fn valid_row_ids(&self, batch_id: Uuid) -> StoreResult<Vec<i64>>;

    async fn staging_rows_by_ids(&self, staging_ids: &[i64]) -> StoreResult<Vec<StagingRow>>;

    /// Recount `processed_records` from the staging table and persist it.
    /// A recount rather than an increment, so it self-corrects on retry.
    async fn recount_processed(&self, batch_id: Uuid) -> StoreResult<i64>;

    /// Reset a FAILED batch for reprocessing: status back to VALIDATED,
    /// processed count and processing timestamps cleared, and any staging
    /// rows left PROCESSED reverted to VALID.
    async fn reset_for_retry(&self, batch_id: Uuid) -> StoreResult<()>;

    // ------------------------------------------------------------------
    // Reconciliation
    // ------------------------------------------------------------------

    /// Canonical products for the given identifiers (missing ids are
    /// simply absent from the result).
    async fn products_by_ids(&self, product_ids: &[String]) -> StoreResult<Vec<Product>>;

    /// Apply one chunk's unit of work atomically.
    async fn commit_chunk(&self, batch_id: Uuid, write: ChunkWrite) -> StoreResult<()>;

    async fn chunk_logs(&self, batch_id: Uuid) -> StoreResult<Vec<ChunkLog>>;

    async fn audit_for_batch(&self, batch_id: Uuid) -> StoreResult<Vec<AuditEntry>>;

    // ------------------------------------------------------------------
    // Catalog reads
    // ------------------------------------------------------------------

    async fn get_product(&self, product_id: &str) -> StoreResult<Product>;

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<(Vec<Product>, i64)>;

    /// Audit history for one product within the last `months_back` months,
    /// newest first.
    async fn product_history(
        &self,
        product_id: &str,
        months_back: i32,
    ) -> StoreResult<Vec<AuditEntry>>;
}
