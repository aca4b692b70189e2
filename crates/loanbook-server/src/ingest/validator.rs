//! Batch validation pass
//!
//! Re-derives every staging row's status from the rule catalog. The pass is
//! a pure function of the staged data, so running it twice produces the same
//! counts and the same per-row verdicts.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::ingest::rules;
use crate::models::{BatchStatus, RowOutcome, RowStatus, ValidationCounts};
use crate::store::{CatalogStore, StoreError};

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Batch {batch_id} is {status} and cannot be validated")]
    InvalidState {
        batch_id: Uuid,
        status: BatchStatus,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Validate every staging row of a batch and persist the outcomes.
///
/// Accepts batches in UPLOADED or VALIDATED state; the latter makes a
/// re-validation after an edit or retry harmless. Leaves the batch
/// VALIDATED with refreshed valid/invalid counts, or FAILED when the
/// pass itself errors.
pub async fn validate_batch(
    store: &Arc<dyn CatalogStore>,
    batch_id: Uuid,
) -> Result<ValidationCounts, ValidationError> {
    let batch = store.get_batch(batch_id).await?;
    if !matches!(batch.status, BatchStatus::Uploaded | BatchStatus::Validated) {
        return Err(ValidationError::InvalidState {
            batch_id,
            status: batch.status,
        });
    }

    store
        .update_batch_status(batch_id, BatchStatus::Validating)
        .await?;

    // From here on the batch must never be left VALIDATING: a failure
    // marks it FAILED so it stays visible and retryable.
    let counts = match run_rules_pass(store, batch_id).await {
        Ok(counts) => counts,
        Err(error) => {
            if let Err(mark_error) = store
                .update_batch_status(batch_id, BatchStatus::Failed)
                .await
            {
                tracing::error!(%batch_id, %mark_error, "Could not mark batch failed");
            }
            tracing::error!(%batch_id, %error, "Batch validation failed");
            return Err(error.into());
        }
    };

    tracing::info!(
        %batch_id,
        valid = counts.valid,
        invalid = counts.invalid,
        "Batch validation complete"
    );

    Ok(counts)
}

async fn run_rules_pass(
    store: &Arc<dyn CatalogStore>,
    batch_id: Uuid,
) -> Result<ValidationCounts, StoreError> {
    let rows = store.staging_rows(batch_id).await?;
    let outcomes: Vec<RowOutcome> = rows
        .iter()
        .map(|row| match rules::first_violation(&row.record) {
            Some(message) => RowOutcome {
                staging_id: row.staging_id,
                status: RowStatus::Invalid,
                error: Some(message),
            },
            None => RowOutcome {
                staging_id: row.staging_id,
                status: RowStatus::Valid,
                error: None,
            },
        })
        .collect();

    store.apply_validation(batch_id, &outcomes).await
}
