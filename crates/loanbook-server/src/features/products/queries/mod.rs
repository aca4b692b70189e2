//! Product feature queries

pub mod get_history;
pub mod get_product;
pub mod list_products;

pub use get_history::GetHistoryQuery;
pub use get_product::GetProductQuery;
pub use list_products::ListProductsQuery;
