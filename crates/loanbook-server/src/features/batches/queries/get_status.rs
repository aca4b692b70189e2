//! Get batch status query
//!
//! Polling endpoint payload for one batch: lifecycle status, record
//! counts, chunk progress, and timestamps.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::ingest::processor::total_chunks;
use crate::models::BatchStatus;
use crate::store::{CatalogStore, StoreError};

#[derive(Debug, Clone)]
pub struct GetStatusQuery {
    pub batch_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct BatchStatusResponse {
    pub batch_id: Uuid,
    pub file_name: String,
    pub uploaded_by: String,
    pub status: BatchStatus,
    pub total_records: i64,
    pub valid_records: i64,
    pub invalid_records: i64,
    pub processed_records: i64,
    /// Percentage of valid rows reconciled so far, 0-100.
    pub progress_pct: f64,
    pub chunks_completed: i64,
    pub chunks_total: i64,
    pub records_created: i64,
    pub records_updated: i64,
    pub records_skipped: i64,
    pub uploaded_at: DateTime<Utc>,
    pub processing_started: Option<DateTime<Utc>>,
    pub processing_completed: Option<DateTime<Utc>>,
}

pub async fn handle(
    store: &Arc<dyn CatalogStore>,
    chunk_size: usize,
    query: GetStatusQuery,
) -> Result<BatchStatusResponse, StoreError> {
    let batch = store.get_batch(query.batch_id).await?;
    let logs = store.chunk_logs(query.batch_id).await?;

    let progress_pct = if batch.valid_records > 0 {
        (batch.processed_records as f64 / batch.valid_records as f64 * 100.0).clamp(0.0, 100.0)
    } else if batch.status == BatchStatus::Completed {
        100.0
    } else {
        0.0
    };

    Ok(BatchStatusResponse {
        batch_id: batch.batch_id,
        file_name: batch.file_name,
        uploaded_by: batch.uploaded_by,
        status: batch.status,
        total_records: batch.total_records,
        valid_records: batch.valid_records,
        invalid_records: batch.invalid_records,
        processed_records: batch.processed_records,
        progress_pct,
        chunks_completed: logs.len() as i64,
        chunks_total: total_chunks(batch.valid_records, chunk_size),
        records_created: logs.iter().map(|l| l.records_created).sum(),
        records_updated: logs.iter().map(|l| l.records_updated).sum(),
        records_skipped: logs.iter().map(|l| l.records_skipped).sum(),
        uploaded_at: batch.uploaded_at,
        processing_started: batch.processing_started,
        processing_completed: batch.processing_completed,
    })
}
