//! Batch routes
//!
//! Read-only routes for batch listing, status polling, invalid-row
//! reports, and reconciliation reports.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use uuid::Uuid;

use super::queries::{
    get_invalid_rows::handle as handle_invalid_rows,
    get_reconciliation::{handle as handle_reconciliation, GetReconciliationError},
    get_status::handle as handle_status, list_batches::handle as handle_list,
    GetInvalidRowsQuery, GetReconciliationQuery, GetStatusQuery, ListBatchesQuery,
};
use crate::api::response::ApiResponse;
use crate::error::{ApiResult, AppError};
use crate::features::FeatureState;

/// Create batch routes
pub fn batches_routes() -> Router<FeatureState> {
    Router::new()
        .route("/batches", get(list_batches))
        .route("/batches/:batch_id/status", get(get_status))
        .route("/batches/:batch_id/invalid-rows", get(get_invalid_rows))
        .route("/batches/:batch_id/reconciliation", get(get_reconciliation))
}

/// List batches, newest first
///
/// GET /batches?page=1&per_page=20
async fn list_batches(
    State(state): State<FeatureState>,
    Query(query): Query<ListBatchesQuery>,
) -> ApiResult<Response> {
    let (batches, meta) = handle_list(&state.store, query).await?;
    let meta = serde_json::to_value(meta)
        .map_err(|e| AppError::Internal(format!("Failed to serialize pagination: {e}")))?;
    Ok(ApiResponse::success_with_meta(batches, meta).into_response())
}

/// Get batch status and progress
///
/// GET /batches/:batch_id/status
async fn get_status(
    State(state): State<FeatureState>,
    Path(batch_id): Path<Uuid>,
) -> ApiResult<Response> {
    let chunk_size = state.pipeline.config().chunk_size;
    let status = handle_status(&state.store, chunk_size, GetStatusQuery { batch_id }).await?;
    Ok(ApiResponse::success(status).into_response())
}

/// Get a batch's invalid rows
///
/// GET /batches/:batch_id/invalid-rows
async fn get_invalid_rows(
    State(state): State<FeatureState>,
    Path(batch_id): Path<Uuid>,
) -> ApiResult<Response> {
    let rows = handle_invalid_rows(&state.store, GetInvalidRowsQuery { batch_id }).await?;
    Ok(ApiResponse::success(rows).into_response())
}

/// Get a completed batch's reconciliation report
///
/// GET /batches/:batch_id/reconciliation
async fn get_reconciliation(
    State(state): State<FeatureState>,
    Path(batch_id): Path<Uuid>,
) -> ApiResult<Response> {
    let report = handle_reconciliation(&state.store, GetReconciliationQuery { batch_id })
        .await
        .map_err(|e| match e {
            GetReconciliationError::NotCompleted { .. } => AppError::Conflict(e.to_string()),
            GetReconciliationError::Store(e) => e.into(),
        })?;
    Ok(ApiResponse::success(report).into_response())
}
