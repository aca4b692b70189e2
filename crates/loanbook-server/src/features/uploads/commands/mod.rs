//! Upload feature commands

pub mod cancel_batch;
pub mod retry_batch;
pub mod upload_catalog;

pub use cancel_batch::CancelBatchCommand;
pub use retry_batch::RetryBatchCommand;
pub use upload_catalog::UploadCatalogCommand;
