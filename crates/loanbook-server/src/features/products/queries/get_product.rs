//! Get product query

use std::sync::Arc;

use crate::models::Product;
use crate::store::{CatalogStore, StoreError};

#[derive(Debug, Clone)]
pub struct GetProductQuery {
    pub product_id: String,
}

pub async fn handle(
    store: &Arc<dyn CatalogStore>,
    query: GetProductQuery,
) -> Result<Product, StoreError> {
    store.get_product(&query.product_id).await
}
