//! Product routes
//!
//! Read-only routes over the canonical product catalog.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use super::queries::{
    get_history::handle as handle_history, get_product::handle as handle_get,
    list_products::handle as handle_list, GetHistoryQuery, GetProductQuery, ListProductsQuery,
};
use crate::api::response::ApiResponse;
use crate::error::{ApiResult, AppError};
use crate::features::FeatureState;

/// Create product routes
pub fn products_routes() -> Router<FeatureState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:product_id", get(get_product))
        .route("/products/:product_id/history", get(get_history))
}

/// List catalog products
///
/// GET /products?search=fixed&active=true&page=1&per_page=20
async fn list_products(
    State(state): State<FeatureState>,
    Query(query): Query<ListProductsQuery>,
) -> ApiResult<Response> {
    let (products, meta) = handle_list(&state.store, query).await?;
    let meta = serde_json::to_value(meta)
        .map_err(|e| AppError::Internal(format!("Failed to serialize pagination: {e}")))?;
    Ok(ApiResponse::success_with_meta(products, meta).into_response())
}

/// Get one product
///
/// GET /products/:product_id
async fn get_product(
    State(state): State<FeatureState>,
    Path(product_id): Path<String>,
) -> ApiResult<Response> {
    let product = handle_get(&state.store, GetProductQuery { product_id }).await?;
    Ok(ApiResponse::success(product).into_response())
}

/// Get one product's audit history
///
/// GET /products/:product_id/history?months=6
async fn get_history(
    State(state): State<FeatureState>,
    Path(product_id): Path<String>,
    Query(query): Query<GetHistoryQuery>,
) -> ApiResult<Response> {
    let history = handle_history(&state.store, product_id, query).await?;
    Ok(ApiResponse::success(history).into_response())
}
