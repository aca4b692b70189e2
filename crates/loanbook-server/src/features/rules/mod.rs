//! Validation rules feature

pub mod queries;
pub mod routes;

pub use routes::rules_routes;
