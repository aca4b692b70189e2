//! End-to-end pipeline tests over the in-memory store
//!
//! Drives whole upload lifecycles: parse, stage, validate, chunked
//! reconciliation, retry after a mid-run failure, and report reads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use loanbook_server::config::BatchConfig;
use loanbook_server::ingest::{processor, validator, UploadPipeline};
use loanbook_server::models::{
    AuditEntry, BatchStatus, ChunkLog, ChunkWrite, InvalidRow, Product, ProductRecord, RowOutcome,
    StagingRow, UploadBatch, ValidationCounts,
};
use loanbook_server::store::{
    CatalogStore, MemoryStore, ProductFilter, StoreError, StoreResult,
};

fn config(chunk_size: usize) -> BatchConfig {
    BatchConfig {
        chunk_size,
        ..Default::default()
    }
}

fn record(id: &str, pricing: f64) -> ProductRecord {
    ProductRecord {
        product_id: id.to_string(),
        pricing: Some(pricing),
        ..Default::default()
    }
}

fn csv(rows: &[(&str, &str)]) -> Vec<u8> {
    let mut out = String::from("ProductID,Pricing\n");
    for (id, pricing) in rows {
        out.push_str(&format!("{id},{pricing}\n"));
    }
    out.into_bytes()
}

#[tokio::test]
async fn upload_reaches_completed_with_exact_counts() {
    let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
    let pipeline = UploadPipeline::new(Arc::clone(&store), config(2));

    let bytes = csv(&[
        ("P-1", "4.5"),
        ("P-2", "3.9"),
        ("P-3", "150.0"), // invalid: rate outside 0-100
        ("P-4", "2.2"),
    ]);
    let receipt = pipeline.ingest(&bytes, "rates.csv", "analyst").await.unwrap();
    assert_eq!(receipt.total_records, 4);

    // Validation and reconciliation run on a background task; poll for a
    // terminal state the way an API client would.
    let batch = wait_terminal(&store, receipt.batch_id).await;

    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.valid_records, 3);
    assert_eq!(batch.invalid_records, 1);
    assert_eq!(batch.processed_records, 3);

    // Chunk accounting: ceil(3/2) chunks, outcomes sum to the valid count.
    let logs = store.chunk_logs(receipt.batch_id).await.unwrap();
    assert_eq!(logs.len(), 2);
    let created: i64 = logs.iter().map(|l| l.records_created).sum();
    let updated: i64 = logs.iter().map(|l| l.records_updated).sum();
    let skipped: i64 = logs.iter().map(|l| l.records_skipped).sum();
    assert_eq!(created + updated + skipped, 3);
    assert_eq!(created, 3);

    // The invalid row never reached the catalog.
    assert!(store.get_product("P-3").await.is_err());
    let error_text = store.invalid_rows(receipt.batch_id).await.unwrap()[0]
        .errors
        .join("; ");
    assert!(error_text.contains("0-100"));
}

#[tokio::test]
async fn unchanged_reupload_creates_no_audit() {
    let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());

    let first = stage_validate(&store, &[record("P-1", 4.5), record("P-2", 3.9)]).await;
    processor::process_batch(&store, &config(10), first, "analyst")
        .await
        .unwrap();

    let second = stage_validate(&store, &[record("P-1", 4.5), record("P-2", 3.9)]).await;
    processor::process_batch(&store, &config(10), second, "analyst")
        .await
        .unwrap();

    assert!(store.audit_for_batch(second).await.unwrap().is_empty());
    let logs = store.chunk_logs(second).await.unwrap();
    assert_eq!(logs.iter().map(|l| l.records_skipped).sum::<i64>(), 2);

    let batch = store.get_batch(second).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.processed_records, 2);
}

#[tokio::test]
async fn retry_resumes_without_duplicate_audits() {
    let failing = Arc::new(FailOnceAtChunk {
        inner: MemoryStore::new(),
        target_chunk: 2,
        tripped: AtomicBool::new(false),
    });
    let store: Arc<dyn CatalogStore> = failing;

    // 5 valid rows, chunk size 2 -> chunks [P-0,P-1], [P-2,P-3], [P-4];
    // the second chunk fails on the first attempt.
    let records: Vec<ProductRecord> = (0..5)
        .map(|i| record(&format!("P-{i}"), 4.0))
        .collect();
    let batch_id = stage_validate(&store, &records).await;

    let result = processor::process_batch(&store, &config(2), batch_id, "analyst").await;
    assert!(result.is_err());

    let batch = store.get_batch(batch_id).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Failed);
    assert_eq!(batch.processed_records, 2);

    // Retry: processed rows revert to valid, reconciliation runs again.
    store.reset_for_retry(batch_id).await.unwrap();
    processor::process_batch(&store, &config(2), batch_id, "analyst")
        .await
        .unwrap();

    let batch = store.get_batch(batch_id).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.processed_records, 5);

    // First-chunk products were created before the failure, so the rerun
    // skips them; each product still has exactly one audit entry.
    let audit = store.audit_for_batch(batch_id).await.unwrap();
    assert_eq!(audit.len(), 5);
    let mut audited: Vec<&str> = audit.iter().map(|a| a.product_id.as_str()).collect();
    audited.sort_unstable();
    audited.dedup();
    assert_eq!(audited.len(), 5);
}

#[tokio::test]
async fn cancel_before_processing_blocks_reconciliation() {
    let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
    let pipeline = UploadPipeline::new(Arc::clone(&store), config(2));

    let batch_id = stage_validate(&store, &[record("P-1", 4.5)]).await;
    let status = pipeline.cancel(batch_id, "analyst").await.unwrap();
    assert_eq!(status, BatchStatus::Failed);

    let result = processor::process_batch(&store, &config(2), batch_id, "analyst").await;
    assert!(result.is_err());
    assert!(store.get_product("P-1").await.is_err());
}

#[tokio::test]
async fn revalidation_is_idempotent() {
    let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
    let batch_id = store
        .create_batch(
            "rates.csv",
            "analyst",
            &[record("P-1", 4.5), record("P-2", -1.0)],
        )
        .await
        .unwrap();

    let first = validator::validate_batch(&store, batch_id).await.unwrap();
    let first_errors: Vec<InvalidRow> = store.invalid_rows(batch_id).await.unwrap();
    let second = validator::validate_batch(&store, batch_id).await.unwrap();
    let second_errors: Vec<InvalidRow> = store.invalid_rows(batch_id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first_errors.len(), second_errors.len());
    assert_eq!(first_errors[0].errors, second_errors[0].errors);
}

async fn stage_validate(store: &Arc<dyn CatalogStore>, records: &[ProductRecord]) -> Uuid {
    let batch_id = store
        .create_batch("rates.csv", "analyst", records)
        .await
        .unwrap();
    validator::validate_batch(store, batch_id).await.unwrap();
    batch_id
}

async fn wait_terminal(store: &Arc<dyn CatalogStore>, batch_id: Uuid) -> UploadBatch {
    for _ in 0..100 {
        let batch = store.get_batch(batch_id).await.unwrap();
        if matches!(batch.status, BatchStatus::Completed | BatchStatus::Failed) {
            return batch;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("batch {batch_id} never reached a terminal state");
}

/// Store wrapper that fails one specific chunk commit exactly once.
struct FailOnceAtChunk {
    inner: MemoryStore,
    target_chunk: i64,
    tripped: AtomicBool,
}

#[async_trait]
impl CatalogStore for FailOnceAtChunk {
    async fn create_batch(
        &self,
        file_name: &str,
        uploaded_by: &str,
        records: &[ProductRecord],
    ) -> StoreResult<Uuid> {
        self.inner.create_batch(file_name, uploaded_by, records).await
    }

    async fn get_batch(&self, batch_id: Uuid) -> StoreResult<UploadBatch> {
        self.inner.get_batch(batch_id).await
    }

    async fn list_batches(&self, limit: i64, offset: i64) -> StoreResult<(Vec<UploadBatch>, i64)> {
        self.inner.list_batches(limit, offset).await
    }

    async fn update_batch_status(&self, batch_id: Uuid, status: BatchStatus) -> StoreResult<()> {
        self.inner.update_batch_status(batch_id, status).await
    }

    async fn mark_processing_started(&self, batch_id: Uuid) -> StoreResult<()> {
        self.inner.mark_processing_started(batch_id).await
    }

    async fn mark_completed(&self, batch_id: Uuid) -> StoreResult<()> {
        self.inner.mark_completed(batch_id).await
    }

    async fn staging_rows(&self, batch_id: Uuid) -> StoreResult<Vec<StagingRow>> {
        self.inner.staging_rows(batch_id).await
    }

    async fn apply_validation(
        &self,
        batch_id: Uuid,
        outcomes: &[RowOutcome],
    ) -> StoreResult<ValidationCounts> {
        self.inner.apply_validation(batch_id, outcomes).await
    }

    async fn invalid_rows(&self, batch_id: Uuid) -> StoreResult<Vec<InvalidRow>> {
        self.inner.invalid_rows(batch_id).await
    }

    async fn valid_row_ids(&self, batch_id: Uuid) -> StoreResult<Vec<i64>> {
        self.inner.valid_row_ids(batch_id).await
    }

    async fn staging_rows_by_ids(&self, staging_ids: &[i64]) -> StoreResult<Vec<StagingRow>> {
        self.inner.staging_rows_by_ids(staging_ids).await
    }

    async fn recount_processed(&self, batch_id: Uuid) -> StoreResult<i64> {
        self.inner.recount_processed(batch_id).await
    }

    async fn reset_for_retry(&self, batch_id: Uuid) -> StoreResult<()> {
        self.inner.reset_for_retry(batch_id).await
    }

    async fn products_by_ids(&self, product_ids: &[String]) -> StoreResult<Vec<Product>> {
        self.inner.products_by_ids(product_ids).await
    }

    async fn commit_chunk(&self, batch_id: Uuid, write: ChunkWrite) -> StoreResult<()> {
        if write.chunk_number == self.target_chunk
            && !self.tripped.swap(true, Ordering::SeqCst)
        {
            return Err(StoreError::Internal("injected chunk failure".to_string()));
        }
        self.inner.commit_chunk(batch_id, write).await
    }

    async fn chunk_logs(&self, batch_id: Uuid) -> StoreResult<Vec<ChunkLog>> {
        self.inner.chunk_logs(batch_id).await
    }

    async fn audit_for_batch(&self, batch_id: Uuid) -> StoreResult<Vec<AuditEntry>> {
        self.inner.audit_for_batch(batch_id).await
    }

    async fn get_product(&self, product_id: &str) -> StoreResult<Product> {
        self.inner.get_product(product_id).await
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<(Vec<Product>, i64)> {
        self.inner.list_products(filter).await
    }

    async fn product_history(
        &self,
        product_id: &str,
        months_back: i32,
    ) -> StoreResult<Vec<AuditEntry>> {
        self.inner.product_history(product_id, months_back).await
    }
}
