//! Upload feature slice

pub mod commands;
pub mod routes;

pub use routes::uploads_routes;
