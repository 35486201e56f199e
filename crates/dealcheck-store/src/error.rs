use thiserror::Error;

/// Result type for key-value operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Ways the underlying store can let us down
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage quota exceeded: {used} of {limit} bytes")]
    QuotaExceeded { used: usize, limit: usize },
}
