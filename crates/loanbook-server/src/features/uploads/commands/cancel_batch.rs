//! Cancel batch command
//!
//! Marks an in-flight batch FAILED. The processor observes the status at
//! the next chunk boundary and stops; committed chunks are not rolled back.

use serde::Serialize;
use uuid::Uuid;

use crate::ingest::{PipelineError, UploadPipeline};
use crate::models::BatchStatus;

#[derive(Debug, Clone)]
pub struct CancelBatchCommand {
    pub batch_id: Uuid,
    pub actor: String,
}

#[derive(Debug, Serialize)]
pub struct CancelBatchResponse {
    pub batch_id: Uuid,
    pub status: BatchStatus,
}

pub async fn handle(
    pipeline: &UploadPipeline,
    command: CancelBatchCommand,
) -> Result<CancelBatchResponse, PipelineError> {
    let status = pipeline.cancel(command.batch_id, &command.actor).await?;
    Ok(CancelBatchResponse {
        batch_id: command.batch_id,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatchConfig;
    use crate::store::{CatalogStore, MemoryStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_cancel_processing_batch() {
        let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
        let batch_id = store
            .create_batch("rates.csv", "analyst", &[Default::default()])
            .await
            .unwrap();
        store
            .update_batch_status(batch_id, BatchStatus::Processing)
            .await
            .unwrap();
        let pipeline = UploadPipeline::new(Arc::clone(&store), BatchConfig::default());

        let response = handle(
            &pipeline,
            CancelBatchCommand {
                batch_id,
                actor: "analyst".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(response.status, BatchStatus::Failed);
    }

    #[tokio::test]
    async fn test_cancel_completed_batch_rejected() {
        let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
        let batch_id = store
            .create_batch("rates.csv", "analyst", &[Default::default()])
            .await
            .unwrap();
        store
            .update_batch_status(batch_id, BatchStatus::Completed)
            .await
            .unwrap();
        let pipeline = UploadPipeline::new(store, BatchConfig::default());

        let result = handle(
            &pipeline,
            CancelBatchCommand {
                batch_id,
                actor: "analyst".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(PipelineError::InvalidState { .. })));
    }
}
