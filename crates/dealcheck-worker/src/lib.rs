// Offline cache worker - cache-first fetch, push notifications, background sync
pub mod cache;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod network;
pub mod notifications;
pub mod retry;
pub mod sync;
pub mod worker;

// Re-export common types
pub use cache::CacheStorage;
pub use error::{Result, WorkerError};
pub use http::{Destination, Request, Response, ResponseKind};
pub use lifecycle::WorkerState;
pub use network::{HttpNetwork, Network};
pub use notifications::{ClickAction, Notification, Notifier};
pub use retry::{with_retry, RetryPolicy};
pub use sync::{DealSync, NoopDealSync, SyncOutcome};
pub use worker::{FetchOutcome, LoggingNotifier, OfflineWorker, WorkerConfig};
