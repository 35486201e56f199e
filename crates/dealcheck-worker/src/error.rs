use thiserror::Error;

use crate::lifecycle::WorkerState;

pub type Result<T> = std::result::Result<T, WorkerError>;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Network request failed: {0}")]
    Network(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Install failed, could not cache {asset}: {reason}")]
    InstallFailed { asset: String, reason: String },

    #[error("Worker is {0}, expected it to be {1}")]
    InvalidState(WorkerState, WorkerState),

    #[error("Offline and no fallback page cached for {0}")]
    NoOfflineFallback(String),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Background sync failed: {0}")]
    Sync(String),
}
