//! Get reconciliation report query
//!
//! Full account of what one COMPLETED batch did to the canonical catalog:
//! products created, products updated with before/after values, rows that
//! failed validation, and the count left untouched because they matched
//! the catalog exactly.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AuditEntry, BatchStatus, ChangeType, InvalidRow};
use crate::store::{CatalogStore, StoreError};

#[derive(Debug, Clone)]
pub struct GetReconciliationQuery {
    pub batch_id: Uuid,
}

#[derive(Debug, Error)]
pub enum GetReconciliationError {
    /// Report only exists once every chunk has committed.
    #[error("Batch {batch_id} is {status}; the reconciliation report is available once COMPLETED")]
    NotCompleted {
        batch_id: Uuid,
        status: BatchStatus,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize)]
pub struct ReconciliationReport {
    pub batch_id: Uuid,
    pub file_name: String,
    pub uploaded_by: String,
    pub total_records: i64,
    pub valid_records: i64,
    pub invalid_records: i64,
    pub created: Vec<AuditEntry>,
    pub updated: Vec<AuditEntry>,
    pub invalid: Vec<InvalidRow>,
    /// Valid rows that matched the canonical catalog exactly.
    pub unchanged: i64,
    pub total_processing_ms: i64,
}

pub async fn handle(
    store: &Arc<dyn CatalogStore>,
    query: GetReconciliationQuery,
) -> Result<ReconciliationReport, GetReconciliationError> {
    let batch = store.get_batch(query.batch_id).await?;
    if batch.status != BatchStatus::Completed {
        return Err(GetReconciliationError::NotCompleted {
            batch_id: query.batch_id,
            status: batch.status,
        });
    }

    let audit = store.audit_for_batch(query.batch_id).await?;
    let invalid = store.invalid_rows(query.batch_id).await?;
    let logs = store.chunk_logs(query.batch_id).await?;

    let (created, updated): (Vec<AuditEntry>, Vec<AuditEntry>) = audit
        .into_iter()
        .partition(|entry| entry.change_type == ChangeType::Insert);

    Ok(ReconciliationReport {
        batch_id: batch.batch_id,
        file_name: batch.file_name,
        uploaded_by: batch.uploaded_by,
        total_records: batch.total_records,
        valid_records: batch.valid_records,
        invalid_records: batch.invalid_records,
        created,
        updated,
        invalid,
        unchanged: logs.iter().map(|l| l.records_skipped).sum(),
        total_processing_ms: logs.iter().map(|l| l.processing_ms).sum(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatchConfig;
    use crate::ingest::{processor::process_batch, validator::validate_batch};
    use crate::models::ProductRecord;
    use crate::store::MemoryStore;

    fn record(id: &str, pricing: f64) -> ProductRecord {
        ProductRecord {
            product_id: id.to_string(),
            pricing: Some(pricing),
            ..Default::default()
        }
    }

    async fn completed_batch(
        store: &Arc<dyn CatalogStore>,
        records: &[ProductRecord],
    ) -> Uuid {
        let batch_id = store
            .create_batch("rates.csv", "analyst", records)
            .await
            .unwrap();
        validate_batch(store, batch_id).await.unwrap();
        process_batch(store, &BatchConfig::default(), batch_id, "analyst")
            .await
            .unwrap();
        batch_id
    }

    #[tokio::test]
    async fn test_report_partitions_created_and_updated() {
        let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
        completed_batch(&store, &[record("P-1", 4.5)]).await;
        let second = completed_batch(
            &store,
            &[record("P-1", 3.9), record("P-2", 5.0), record("P-3", 150.0)],
        )
        .await;

        let report = handle(&store, GetReconciliationQuery { batch_id: second })
            .await
            .unwrap();
        assert_eq!(report.created.len(), 1);
        assert_eq!(report.created[0].product_id, "P-2");
        assert_eq!(report.updated.len(), 1);
        assert_eq!(report.updated[0].product_id, "P-1");
        assert_eq!(report.updated[0].old_pricing, Some(4.5));
        assert_eq!(report.updated[0].new_pricing, Some(3.9));
        assert_eq!(report.invalid.len(), 1);
        assert_eq!(report.unchanged, 0);
    }

    #[tokio::test]
    async fn test_unchanged_counts_exact_matches() {
        let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
        completed_batch(&store, &[record("P-1", 4.5)]).await;
        let second = completed_batch(&store, &[record("P-1", 4.5)]).await;

        let report = handle(&store, GetReconciliationQuery { batch_id: second })
            .await
            .unwrap();
        assert!(report.created.is_empty());
        assert!(report.updated.is_empty());
        assert_eq!(report.unchanged, 1);
    }

    #[tokio::test]
    async fn test_report_gated_on_completed() {
        let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
        let batch_id = store
            .create_batch("rates.csv", "analyst", &[record("P-1", 4.5)])
            .await
            .unwrap();

        let result = handle(&store, GetReconciliationQuery { batch_id }).await;
        assert!(matches!(
            result,
            Err(GetReconciliationError::NotCompleted { .. })
        ));
    }
}
