//! Upload ingestion pipeline
//!
//! One entry point per operator action: ingest a catalog file, retry a
//! failed batch, cancel a running one. Validation and reconciliation run on
//! a background task so the upload request returns as soon as the batch is
//! staged.

pub mod parser;
pub mod processor;
pub mod rules;
pub mod validator;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::BatchConfig;
use crate::models::{BatchStatus, RowStatus};
use crate::store::{CatalogStore, StoreError};

pub use parser::ParseError;
pub use processor::{ProcessError, ProcessOutcome};
pub use validator::ValidationError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Batch {batch_id} is {status} and cannot be {action}")]
    InvalidState {
        batch_id: Uuid,
        status: BatchStatus,
        action: &'static str,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the upload endpoint returns once a file is staged.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    pub batch_id: Uuid,
    pub file_name: String,
    pub total_records: i64,
    pub status: BatchStatus,
}

/// Orchestrates the batch lifecycle over a [`CatalogStore`].
#[derive(Clone)]
pub struct UploadPipeline {
    store: Arc<dyn CatalogStore>,
    config: BatchConfig,
}

impl UploadPipeline {
    pub fn new(store: Arc<dyn CatalogStore>, config: BatchConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Parse an uploaded file, stage it as a new batch, and kick off
    /// validation and reconciliation in the background.
    ///
    /// The parse is all-or-nothing: a file with unreadable dates or
    /// identifiers is rejected here and no batch is created.
    pub async fn ingest(
        &self,
        bytes: &[u8],
        file_name: &str,
        uploaded_by: &str,
    ) -> Result<UploadReceipt, PipelineError> {
        let records = parser::parse_catalog(bytes)?;
        let total_records = records.len() as i64;

        let batch_id = self
            .store
            .create_batch(file_name, uploaded_by, &records)
            .await?;

        tracing::info!(
            %batch_id,
            file_name,
            uploaded_by,
            total_records,
            "Batch staged"
        );

        self.spawn_run(batch_id, uploaded_by.to_string(), true);

        Ok(UploadReceipt {
            batch_id,
            file_name: file_name.to_string(),
            total_records,
            status: BatchStatus::Uploaded,
        })
    }

    /// Retry a FAILED batch: already-PROCESSED rows revert to VALID and
    /// reconciliation runs again from the first unprocessed chunk's data.
    /// A batch that failed before its validation pass finished still has
    /// PENDING rows, so those batches are re-validated first.
    pub async fn retry(&self, batch_id: Uuid, actor: &str) -> Result<BatchStatus, PipelineError> {
        let batch = self.store.get_batch(batch_id).await?;
        if !batch.status.retryable() {
            return Err(PipelineError::InvalidState {
                batch_id,
                status: batch.status,
                action: "retried",
            });
        }

        self.store.reset_for_retry(batch_id).await?;
        tracing::info!(%batch_id, actor, "Batch reset for retry");

        let rows = self.store.staging_rows(batch_id).await?;
        let needs_validation = rows.iter().any(|row| row.status == RowStatus::Pending);

        self.spawn_run(batch_id, actor.to_string(), needs_validation);
        Ok(BatchStatus::Validated)
    }

    /// Cancel a batch that has not finished. Processing observes the status
    /// change at the next chunk boundary; already-committed chunks stand.
    pub async fn cancel(&self, batch_id: Uuid, actor: &str) -> Result<BatchStatus, PipelineError> {
        let batch = self.store.get_batch(batch_id).await?;
        if !batch.status.cancellable() {
            return Err(PipelineError::InvalidState {
                batch_id,
                status: batch.status,
                action: "cancelled",
            });
        }

        self.store
            .update_batch_status(batch_id, BatchStatus::Failed)
            .await?;
        tracing::info!(%batch_id, actor, "Batch cancelled");
        Ok(BatchStatus::Failed)
    }

    /// Run validation (optionally) and reconciliation for a batch on a
    /// detached task. Failures are persisted on the batch itself, so the
    /// task only logs them.
    fn spawn_run(&self, batch_id: Uuid, actor: String, validate_first: bool) {
        let store = Arc::clone(&self.store);
        let config = self.config.clone();
        tokio::spawn(async move {
            if let Err(error) = run_batch(&store, &config, batch_id, &actor, validate_first).await {
                tracing::error!(%batch_id, %error, "Background batch run failed");
            }
        });
    }

    /// Drive a batch through validation and reconciliation inline.
    /// Used by tests and maintenance tooling where the caller wants to
    /// wait for the outcome instead of polling status.
    pub async fn run_to_completion(
        &self,
        batch_id: Uuid,
        actor: &str,
    ) -> Result<ProcessOutcome, PipelineError> {
        run_batch(&self.store, &self.config, batch_id, actor, true).await
    }
}

async fn run_batch(
    store: &Arc<dyn CatalogStore>,
    config: &BatchConfig,
    batch_id: Uuid,
    actor: &str,
    validate_first: bool,
) -> Result<ProcessOutcome, PipelineError> {
    if validate_first {
        let counts = validator::validate_batch(store, batch_id).await?;
        if counts.valid == 0 {
            // Nothing to reconcile; the batch still completes so its
            // invalid-row report is reachable through the normal flow.
            tracing::warn!(%batch_id, invalid = counts.invalid, "No valid rows in batch");
        }
    }

    let outcome = processor::process_batch(store, config, batch_id, actor).await?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn pipeline() -> UploadPipeline {
        UploadPipeline::new(Arc::new(MemoryStore::new()), BatchConfig::default())
    }

    const CSV: &[u8] = b"ProductID,Pricing\nP-1,4.5\nP-2,3.9\n";

    #[tokio::test]
    async fn test_ingest_stages_batch() {
        let pipeline = pipeline();
        let receipt = pipeline
            .ingest(CSV, "rates.csv", "analyst")
            .await
            .unwrap();
        assert_eq!(receipt.total_records, 2);
        assert_eq!(receipt.status, BatchStatus::Uploaded);

        let batch = pipeline.store().get_batch(receipt.batch_id).await.unwrap();
        assert_eq!(batch.file_name, "rates.csv");
        assert_eq!(batch.uploaded_by, "analyst");
        assert_eq!(batch.total_records, 2);
    }

    #[tokio::test]
    async fn test_ingest_rejects_bad_file_without_staging() {
        let pipeline = pipeline();
        let result = pipeline
            .ingest(
                b"ProductID,WithdrawnDate\nP-1,sometime soon\n",
                "rates.csv",
                "analyst",
            )
            .await;
        assert!(matches!(result, Err(PipelineError::Parse(_))));

        let (batches, total) = pipeline.store().list_batches(10, 0).await.unwrap();
        assert!(batches.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_retry_requires_failed_state() {
        let pipeline = pipeline();
        let receipt = pipeline
            .ingest(CSV, "rates.csv", "analyst")
            .await
            .unwrap();
        let result = pipeline.retry(receipt.batch_id, "analyst").await;
        assert!(matches!(result, Err(PipelineError::InvalidState { .. })));
    }

    async fn wait_terminal(store: &Arc<dyn CatalogStore>, batch_id: Uuid) -> BatchStatus {
        for _ in 0..100 {
            let batch = store.get_batch(batch_id).await.unwrap();
            if matches!(batch.status, BatchStatus::Completed | BatchStatus::Failed) {
                return batch.status;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("batch never reached a terminal state");
    }

    #[tokio::test]
    async fn test_retry_revalidates_pending_rows() {
        let pipeline = pipeline();
        let store = Arc::clone(pipeline.store());
        let batch_id = store
            .create_batch(
                "rates.csv",
                "analyst",
                &[crate::models::ProductRecord {
                    product_id: "P-1".to_string(),
                    pricing: Some(4.5),
                    ..Default::default()
                }],
            )
            .await
            .unwrap();

        // Cancelled mid-validation: every row is still PENDING.
        store
            .update_batch_status(batch_id, BatchStatus::Validating)
            .await
            .unwrap();
        store
            .update_batch_status(batch_id, BatchStatus::Failed)
            .await
            .unwrap();

        pipeline.retry(batch_id, "analyst").await.unwrap();
        assert_eq!(wait_terminal(&store, batch_id).await, BatchStatus::Completed);

        let batch = store.get_batch(batch_id).await.unwrap();
        assert_eq!(batch.valid_records, 1);
        assert_eq!(batch.processed_records, 1);
        assert!(store.get_product("P-1").await.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_requires_in_flight_state() {
        let pipeline = pipeline();
        let receipt = pipeline
            .ingest(CSV, "rates.csv", "analyst")
            .await
            .unwrap();
        // UPLOADED is not cancellable; the batch has not started.
        let result = pipeline.cancel(receipt.batch_id, "analyst").await;
        assert!(matches!(result, Err(PipelineError::InvalidState { .. })));

        pipeline
            .store()
            .update_batch_status(receipt.batch_id, BatchStatus::Processing)
            .await
            .unwrap();
        let status = pipeline.cancel(receipt.batch_id, "analyst").await.unwrap();
        assert_eq!(status, BatchStatus::Failed);
    }
}
