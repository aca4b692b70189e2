//! Loanbook Common Library
//!
//! Shared error handling and logging bootstrap for the Loanbook workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the crate-wide [`LoanbookError`] and `Result` alias
//! - **Logging**: tracing subscriber setup with console/file output

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{LoanbookError, Result};
