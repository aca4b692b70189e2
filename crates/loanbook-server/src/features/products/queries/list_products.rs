//! List products query
//!
//! Paged view of the canonical catalog with an optional substring search
//! over product id and name.

use std::sync::Arc;

use serde::Deserialize;

use crate::api::response::PaginationMeta;
use crate::features::shared::pagination::PaginationParams;
use crate::models::Product;
use crate::store::{CatalogStore, ProductFilter, StoreError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListProductsQuery {
    /// Substring match against product id or name.
    pub search: Option<String>,
    /// Restrict to active or withdrawn products.
    pub active: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

pub async fn handle(
    store: &Arc<dyn CatalogStore>,
    query: ListProductsQuery,
) -> Result<(Vec<Product>, PaginationMeta), StoreError> {
    let pagination = PaginationParams {
        page: query.page,
        per_page: query.per_page,
    };
    let page = pagination.page();
    let per_page = pagination.per_page();

    let filter = ProductFilter {
        search: query
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        active_only: query.active,
        limit: per_page,
        offset: pagination.offset(),
    };

    let (products, total) = store.list_products(&filter).await?;
    Ok((products, PaginationMeta::new(page, per_page, total)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatchConfig;
    use crate::ingest::{processor::process_batch, validator::validate_batch};
    use crate::models::ProductRecord;
    use crate::store::MemoryStore;

    async fn seeded_store() -> Arc<dyn CatalogStore> {
        let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
        let records = vec![
            ProductRecord {
                product_id: "FIX-2Y".to_string(),
                product_name: Some("2yr Fixed".to_string()),
                ..Default::default()
            },
            ProductRecord {
                product_id: "TRK-2Y".to_string(),
                product_name: Some("2yr Tracker".to_string()),
                ..Default::default()
            },
        ];
        let batch_id = store
            .create_batch("rates.csv", "analyst", &records)
            .await
            .unwrap();
        validate_batch(&store, batch_id).await.unwrap();
        process_batch(&store, &BatchConfig::default(), batch_id, "analyst")
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_search_matches_id_and_name() {
        let store = seeded_store().await;

        let query = ListProductsQuery {
            search: Some("tracker".to_string()),
            ..Default::default()
        };
        let (products, meta) = handle(&store, query).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].record.product_id, "TRK-2Y");
        assert_eq!(meta.total, 1);

        let query = ListProductsQuery {
            search: Some("FIX".to_string()),
            ..Default::default()
        };
        let (products, _) = handle(&store, query).await.unwrap();
        assert_eq!(products.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_search_is_unfiltered() {
        let store = seeded_store().await;
        let query = ListProductsQuery {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        let (products, _) = handle(&store, query).await.unwrap();
        assert_eq!(products.len(), 2);
    }
}
