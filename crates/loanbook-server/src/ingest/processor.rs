//! Chunked batch reconciliation
//!
//! Applies a VALIDATED batch's rows to the canonical product table in fixed
//! size chunks, each committed as one atomic unit. The set of VALID staging
//! ids is snapshotted once before the first chunk, so chunk boundaries stay
//! stable while rows flip to PROCESSED underneath.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use uuid::Uuid;

use crate::config::BatchConfig;
use crate::models::{
    BatchStatus, ChangeType, ChunkStats, ChunkWrite, NewAuditEntry, ProductRecord,
};
use crate::store::{CatalogStore, StoreError};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Batch {batch_id} is {status} and cannot be processed")]
    InvalidState {
        batch_id: Uuid,
        status: BatchStatus,
    },

    #[error("Chunk {chunk_number} of batch {batch_id} failed: {source}")]
    ChunkFailed {
        batch_id: Uuid,
        chunk_number: i64,
        source: StoreError,
    },

    #[error("Chunk {chunk_number} of batch {batch_id} timed out after {timeout_secs}s")]
    ChunkTimeout {
        batch_id: Uuid,
        chunk_number: i64,
        timeout_secs: u64,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of one processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Every valid row was reconciled and the batch is COMPLETED.
    Completed,
    /// The batch left PROCESSING state mid-run (operator cancel); whatever
    /// chunks already committed stay committed.
    Cancelled,
}

/// Number of chunks needed for `valid` rows at `chunk_size` rows per chunk.
pub fn total_chunks(valid: i64, chunk_size: usize) -> i64 {
    if valid <= 0 {
        return 0;
    }
    (valid + chunk_size as i64 - 1) / chunk_size as i64
}

/// Reconcile a VALIDATED batch into the canonical product table.
///
/// On any chunk failure the batch is marked FAILED and the error returned;
/// chunks committed before the failure remain applied, which is what makes
/// retry resume instead of restart.
pub async fn process_batch(
    store: &Arc<dyn CatalogStore>,
    config: &BatchConfig,
    batch_id: Uuid,
    actor: &str,
) -> Result<ProcessOutcome, ProcessError> {
    let batch = store.get_batch(batch_id).await?;
    if batch.status != BatchStatus::Validated {
        return Err(ProcessError::InvalidState {
            batch_id,
            status: batch.status,
        });
    }

    store.mark_processing_started(batch_id).await?;

    let valid_ids = store.valid_row_ids(batch_id).await?;
    let chunk_count = total_chunks(valid_ids.len() as i64, config.chunk_size);

    tracing::info!(
        %batch_id,
        valid_rows = valid_ids.len(),
        chunks = chunk_count,
        chunk_size = config.chunk_size,
        "Batch processing started"
    );

    for (chunk_index, chunk_ids) in valid_ids.chunks(config.chunk_size).enumerate() {
        let chunk_number = chunk_index as i64 + 1;

        // Re-read status before each chunk so an operator cancel takes
        // effect at the next chunk boundary.
        let current = store.get_batch(batch_id).await?;
        if current.status != BatchStatus::Processing {
            tracing::warn!(
                %batch_id,
                status = %current.status,
                chunk_number,
                "Batch left processing state, stopping"
            );
            return Ok(ProcessOutcome::Cancelled);
        }

        match process_chunk(store, config, batch_id, actor, chunk_number, chunk_ids).await {
            Ok(stats) => {
                let processed = store.recount_processed(batch_id).await?;
                tracing::info!(
                    %batch_id,
                    chunk_number,
                    created = stats.created,
                    updated = stats.updated,
                    skipped = stats.skipped,
                    processed_total = processed,
                    elapsed_ms = stats.processing_ms,
                    "Chunk committed"
                );
            }
            Err(error) => {
                store
                    .update_batch_status(batch_id, BatchStatus::Failed)
                    .await?;
                tracing::error!(%batch_id, chunk_number, %error, "Batch processing failed");
                return Err(error);
            }
        }
    }

    store.mark_completed(batch_id).await?;
    tracing::info!(%batch_id, "Batch processing complete");
    Ok(ProcessOutcome::Completed)
}

/// Build and commit one chunk's unit of work.
async fn process_chunk(
    store: &Arc<dyn CatalogStore>,
    config: &BatchConfig,
    batch_id: Uuid,
    actor: &str,
    chunk_number: i64,
    chunk_ids: &[i64],
) -> Result<ChunkStats, ProcessError> {
    let started = Instant::now();

    let rows = store.staging_rows_by_ids(chunk_ids).await?;

    let product_ids: Vec<String> = rows.iter().map(|row| row.record.product_id.clone()).collect();
    let existing: HashMap<String, ProductRecord> = store
        .products_by_ids(&product_ids)
        .await?
        .into_iter()
        .map(|product| (product.record.product_id.clone(), product.record))
        .collect();

    let mut upserts = Vec::new();
    let mut audits = Vec::new();
    let mut stats = ChunkStats::default();

    for row in &rows {
        let incoming = &row.record;
        match existing.get(&incoming.product_id) {
            None => {
                stats.created += 1;
                audits.push(NewAuditEntry {
                    product_id: incoming.product_id.clone(),
                    product_name: incoming.product_name.clone(),
                    change_type: ChangeType::Insert,
                    old_pricing: None,
                    new_pricing: incoming.pricing,
                    old_withdrawn_date: None,
                    new_withdrawn_date: incoming.withdrawn_date,
                });
                upserts.push(incoming.clone());
            }
            Some(current) if current != incoming => {
                stats.updated += 1;
                audits.push(NewAuditEntry {
                    product_id: incoming.product_id.clone(),
                    product_name: incoming.product_name.clone(),
                    change_type: ChangeType::Update,
                    old_pricing: current.pricing,
                    new_pricing: incoming.pricing,
                    old_withdrawn_date: current.withdrawn_date,
                    new_withdrawn_date: incoming.withdrawn_date,
                });
                upserts.push(incoming.clone());
            }
            Some(_) => {
                // Byte-for-byte identical to the canonical row; nothing to
                // write and nothing to audit.
                stats.skipped += 1;
            }
        }
    }

    stats.processing_ms = started.elapsed().as_millis() as i64;

    let write = ChunkWrite {
        chunk_number,
        actor: actor.to_string(),
        upserts,
        audits,
        processed_staging_ids: chunk_ids.to_vec(),
        stats,
    };

    let timeout = Duration::from_secs(config.chunk_timeout_secs);
    match tokio::time::timeout(timeout, store.commit_chunk(batch_id, write)).await {
        Ok(Ok(())) => Ok(stats),
        Ok(Err(source)) => Err(ProcessError::ChunkFailed {
            batch_id,
            chunk_number,
            source,
        }),
        Err(_) => Err(ProcessError::ChunkTimeout {
            batch_id,
            chunk_number,
            timeout_secs: config.chunk_timeout_secs,
        }),
    }
}
