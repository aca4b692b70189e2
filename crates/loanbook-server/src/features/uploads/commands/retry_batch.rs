//! Retry batch command
//!
//! Resets a FAILED batch and restarts reconciliation from the first
//! unprocessed row. Chunks committed before the failure stay applied.

use serde::Serialize;
use uuid::Uuid;

use crate::ingest::{PipelineError, UploadPipeline};
use crate::models::BatchStatus;

#[derive(Debug, Clone)]
pub struct RetryBatchCommand {
    pub batch_id: Uuid,
    pub actor: String,
}

#[derive(Debug, Serialize)]
pub struct RetryBatchResponse {
    pub batch_id: Uuid,
    pub status: BatchStatus,
}

pub async fn handle(
    pipeline: &UploadPipeline,
    command: RetryBatchCommand,
) -> Result<RetryBatchResponse, PipelineError> {
    let status = pipeline.retry(command.batch_id, &command.actor).await?;
    Ok(RetryBatchResponse {
        batch_id: command.batch_id,
        status,
    })
}
