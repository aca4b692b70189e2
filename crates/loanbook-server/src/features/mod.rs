//! Feature modules implementing the catalog API
//!
//! Each feature is a vertical slice with its own commands, queries, and
//! routes:
//!
//! - **uploads**: catalog file ingestion plus batch retry/cancel
//! - **batches**: batch status, invalid rows, reconciliation reports
//! - **products**: canonical catalog reads and per-product audit history
//! - **rules**: the validation rule catalog for client display
//!
//! Write operations live under `commands/`, reads under `queries/`, one
//! file per operation. Handlers receive the storage abstraction rather
//! than a connection pool so every slice is testable against the
//! in-memory store.

pub mod batches;
pub mod products;
pub mod rules;
pub mod shared;
pub mod uploads;

use std::sync::Arc;

use axum::Router;

use crate::ingest::UploadPipeline;
use crate::store::CatalogStore;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub store: Arc<dyn CatalogStore>,
    pub pipeline: UploadPipeline,
}

/// Creates the main API router with all feature routes mounted
pub fn router(state: FeatureState) -> Router<()> {
    let max_upload_bytes = state.pipeline.config().max_upload_bytes;
    Router::new()
        .merge(uploads::uploads_routes(max_upload_bytes).with_state(state.clone()))
        .merge(batches::batches_routes().with_state(state.clone()))
        .merge(products::products_routes().with_state(state.clone()))
        .merge(rules::rules_routes().with_state(state))
}
