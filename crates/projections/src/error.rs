//! Query error types.

use thiserror::Error;

/// Errors that can occur while building a view.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The caller's role has no view of this kind.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    /// The profile directory could not be reached.
    #[error("Directory error: {0}")]
    Directory(String),
}

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
