//! Get product history query
//!
//! Audit trail for one product over a trailing window of months,
//! newest change first.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::AuditEntry;
use crate::store::{CatalogStore, StoreError};

/// Default trailing window when the client gives none.
const DEFAULT_MONTHS_BACK: i32 = 12;

#[derive(Debug, Clone, Deserialize)]
pub struct GetHistoryQuery {
    pub months: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ProductHistoryResponse {
    pub product_id: String,
    pub months_back: i32,
    pub changes: Vec<AuditEntry>,
}

pub async fn handle(
    store: &Arc<dyn CatalogStore>,
    product_id: String,
    query: GetHistoryQuery,
) -> Result<ProductHistoryResponse, StoreError> {
    // Existence check first, so history of an unknown product is a 404
    // rather than an empty list.
    store.get_product(&product_id).await?;

    let months_back = query.months.unwrap_or(DEFAULT_MONTHS_BACK).max(1);
    let changes = store.product_history(&product_id, months_back).await?;

    Ok(ProductHistoryResponse {
        product_id,
        months_back,
        changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatchConfig;
    use crate::ingest::{processor::process_batch, validator::validate_batch};
    use crate::models::{ChangeType, ProductRecord};
    use crate::store::MemoryStore;

    fn record(pricing: f64) -> ProductRecord {
        ProductRecord {
            product_id: "P-1".to_string(),
            pricing: Some(pricing),
            ..Default::default()
        }
    }

    async fn run_batch(store: &Arc<dyn CatalogStore>, pricing: f64) {
        let batch_id = store
            .create_batch("rates.csv", "analyst", &[record(pricing)])
            .await
            .unwrap();
        validate_batch(store, batch_id).await.unwrap();
        process_batch(store, &BatchConfig::default(), batch_id, "analyst")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_history_newest_first() {
        let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
        run_batch(&store, 4.5).await;
        run_batch(&store, 3.9).await;

        let response = handle(
            &store,
            "P-1".to_string(),
            GetHistoryQuery { months: None },
        )
        .await
        .unwrap();

        assert_eq!(response.months_back, DEFAULT_MONTHS_BACK);
        assert_eq!(response.changes.len(), 2);
        assert_eq!(response.changes[0].change_type, ChangeType::Update);
        assert_eq!(response.changes[1].change_type, ChangeType::Insert);
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
        let result = handle(
            &store,
            "MISSING".to_string(),
            GetHistoryQuery { months: Some(6) },
        )
        .await;
        assert!(matches!(result, Err(e) if e.is_not_found()));
    }
}
