//! Error types shared across Loanbook crates

use thiserror::Error;

/// Result type alias for Loanbook operations
pub type Result<T> = std::result::Result<T, LoanbookError>;

/// Main error type for Loanbook
#[derive(Error, Debug)]
pub enum LoanbookError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Batch not found: {0}")]
    BatchNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}
