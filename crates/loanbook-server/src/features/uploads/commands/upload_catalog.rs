//! Upload catalog command
//!
//! Stages an uploaded catalog file as a new batch and starts the
//! background validation/reconciliation run.

use crate::ingest::{PipelineError, UploadPipeline, UploadReceipt};

/// Command to ingest one uploaded catalog file
#[derive(Debug, Clone)]
pub struct UploadCatalogCommand {
    pub file_name: String,
    pub uploaded_by: String,
    pub bytes: Vec<u8>,
}

pub async fn handle(
    pipeline: &UploadPipeline,
    command: UploadCatalogCommand,
) -> Result<UploadReceipt, PipelineError> {
    pipeline
        .ingest(&command.bytes, &command.file_name, &command.uploaded_by)
        .await
}
