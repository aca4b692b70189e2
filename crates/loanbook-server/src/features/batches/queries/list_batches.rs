//! List batches query

use std::sync::Arc;

use serde::Deserialize;

use crate::api::response::PaginationMeta;
use crate::features::shared::pagination::PaginationParams;
use crate::models::UploadBatch;
use crate::store::{CatalogStore, StoreError};

/// Query parameters for the batch list
///
/// Pagination fields are inline; `serde(flatten)` cannot deserialize
/// numeric fields from a query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListBatchesQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ListBatchesQuery {
    fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

pub async fn handle(
    store: &Arc<dyn CatalogStore>,
    query: ListBatchesQuery,
) -> Result<(Vec<UploadBatch>, PaginationMeta), StoreError> {
    let pagination = query.pagination();
    let (batches, total) = store
        .list_batches(pagination.per_page(), pagination.offset())
        .await?;
    Ok((
        batches,
        PaginationMeta::new(pagination.page(), pagination.per_page(), total),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_lists_newest_first_with_meta() {
        let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
        for i in 0..3 {
            store
                .create_batch(&format!("file-{i}.csv"), "analyst", &[Default::default()])
                .await
                .unwrap();
        }

        let (batches, meta) = handle(&store, ListBatchesQuery::default()).await.unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(meta.total, 3);
        assert_eq!(meta.pages, 1);
    }

    #[tokio::test]
    async fn test_pagination_slices() {
        let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
        for i in 0..5 {
            store
                .create_batch(&format!("file-{i}.csv"), "analyst", &[Default::default()])
                .await
                .unwrap();
        }

        let query = ListBatchesQuery {
            page: Some(2),
            per_page: Some(2),
        };
        let (batches, meta) = handle(&store, query).await.unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(meta.total, 5);
        assert_eq!(meta.pages, 3);
    }
}
