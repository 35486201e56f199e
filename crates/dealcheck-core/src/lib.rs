// Core business logic lives here - product collections, model, config
pub mod config;
pub mod error;
pub mod keys;
pub mod models;
pub mod products;

pub use config::{Config, StorageConfig, WorkerSettings};
pub use error::Error;
pub use models::{MonitoredProduct, PriceSample, ProductDraft, ProductId, SavedProduct, SlotUsage};
pub use products::{ProductStore, WriteOutcome};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
