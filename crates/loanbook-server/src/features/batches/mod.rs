//! Batch feature slice

pub mod queries;
pub mod routes;

pub use routes::batches_routes;
