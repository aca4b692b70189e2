//! Loan product catalog ingestion and reconciliation server
//!
//! Upload a pricing catalog, stage it as a batch, validate every row
//! against the business rules, then reconcile the valid rows into the
//! canonical product table in atomic chunks with a full audit trail.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod ingest;
pub mod models;
pub mod store;
