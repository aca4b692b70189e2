//! Product feature slice

pub mod queries;
pub mod routes;

pub use routes::products_routes;
