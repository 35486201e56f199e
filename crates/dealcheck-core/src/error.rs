use thiserror::Error;

/// All the ways things can go wrong in DealCheck's core
///
/// We use thiserror here because it generates the boilerplate for us.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    StorageError(#[from] dealcheck_store::StoreError),

    #[error("{0} must be a finite number")]
    InvalidNumber(&'static str),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
