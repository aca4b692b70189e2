//! Batch feature queries

pub mod get_invalid_rows;
pub mod get_reconciliation;
pub mod get_status;
pub mod list_batches;

pub use get_invalid_rows::GetInvalidRowsQuery;
pub use get_reconciliation::GetReconciliationQuery;
pub use get_status::GetStatusQuery;
pub use list_batches::ListBatchesQuery;
