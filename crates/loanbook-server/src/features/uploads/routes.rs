//! Upload routes
//!
//! Catalog file ingestion and batch lifecycle actions (retry, cancel).

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use uuid::Uuid;

use super::commands::{
    cancel_batch::handle as handle_cancel, retry_batch::handle as handle_retry,
    upload_catalog::handle as handle_upload, CancelBatchCommand, RetryBatchCommand,
    UploadCatalogCommand,
};
use crate::api::response::ApiResponse;
use crate::error::{ApiResult, AppError};
use crate::features::FeatureState;

/// Actor recorded when the client sends no `x-uploaded-by` header.
const DEFAULT_ACTOR: &str = "system";

/// Create upload routes
pub fn uploads_routes(max_upload_bytes: usize) -> Router<FeatureState> {
    Router::new()
        .route("/uploads", post(upload_catalog))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .route("/batches/:batch_id/retry", post(retry_batch))
        .route("/batches/:batch_id/cancel", post(cancel_batch))
}

fn actor_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-uploaded-by")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_ACTOR)
        .to_string()
}

/// Ingest a catalog file
///
/// POST /uploads (multipart, field name `file`)
///
/// Returns 202: the batch is staged and validation/reconciliation run in
/// the background; poll the status endpoint for progress.
async fn upload_catalog(
    State(state): State<FeatureState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let uploaded_by = actor_from_headers(&headers);

    let mut file_name = None;
    let mut bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            file_name = field
                .file_name()
                .map(str::to_string)
                .or_else(|| Some("upload.csv".to_string()));
            bytes = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?
                    .to_vec(),
            );
        }
    }

    let (file_name, bytes) = match (file_name, bytes) {
        (Some(name), Some(bytes)) => (name, bytes),
        _ => {
            return Err(AppError::BadRequest(
                "Multipart field 'file' is required".to_string(),
            ))
        }
    };

    let receipt = handle_upload(
        &state.pipeline,
        UploadCatalogCommand {
            file_name,
            uploaded_by,
            bytes,
        },
    )
    .await?;

    let status_url = format!("/api/v1/batches/{}/status", receipt.batch_id);
    let response = ApiResponse::success_with_meta(
        receipt,
        serde_json::json!({ "status_url": status_url }),
    );
    Ok((StatusCode::ACCEPTED, Json(response)).into_response())
}

/// Retry a failed batch
///
/// POST /batches/:batch_id/retry
async fn retry_batch(
    State(state): State<FeatureState>,
    headers: HeaderMap,
    Path(batch_id): Path<Uuid>,
) -> ApiResult<Response> {
    let command = RetryBatchCommand {
        batch_id,
        actor: actor_from_headers(&headers),
    };
    let response = handle_retry(&state.pipeline, command).await?;
    Ok(ApiResponse::success(response).into_response())
}

/// Cancel an in-flight batch
///
/// POST /batches/:batch_id/cancel
async fn cancel_batch(
    State(state): State<FeatureState>,
    headers: HeaderMap,
    Path(batch_id): Path<Uuid>,
) -> ApiResult<Response> {
    let command = CancelBatchCommand {
        batch_id,
        actor: actor_from_headers(&headers),
    };
    let response = handle_cancel(&state.pipeline, command).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_defaults_to_system() {
        let headers = HeaderMap::new();
        assert_eq!(actor_from_headers(&headers), "system");
    }

    #[test]
    fn test_actor_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-uploaded-by", "analyst".parse().unwrap());
        assert_eq!(actor_from_headers(&headers), "analyst");
    }

    #[test]
    fn test_blank_actor_header_falls_back() {
        let mut headers = HeaderMap::new();
        headers.insert("x-uploaded-by", "   ".parse().unwrap());
        assert_eq!(actor_from_headers(&headers), "system");
    }
}
