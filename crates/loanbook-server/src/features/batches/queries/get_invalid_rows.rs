//! Get invalid rows query
//!
//! Per-row validation failures for a batch, addressed by file row number
//! so an analyst can fix the source spreadsheet directly.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::models::InvalidRow;
use crate::store::{CatalogStore, StoreError};

#[derive(Debug, Clone)]
pub struct GetInvalidRowsQuery {
    pub batch_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct InvalidRowsResponse {
    pub batch_id: Uuid,
    pub invalid_count: usize,
    pub rows: Vec<InvalidRow>,
}

pub async fn handle(
    store: &Arc<dyn CatalogStore>,
    query: GetInvalidRowsQuery,
) -> Result<InvalidRowsResponse, StoreError> {
    // Confirm the batch exists so an unknown id is a 404, not an empty list.
    store.get_batch(query.batch_id).await?;
    let rows = store.invalid_rows(query.batch_id).await?;
    Ok(InvalidRowsResponse {
        batch_id: query.batch_id,
        invalid_count: rows.len(),
        rows,
    })
}
