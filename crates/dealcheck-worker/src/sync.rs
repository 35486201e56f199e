// Background sync hook
use async_trait::async_trait;
use tracing::info;

use crate::error::Result;

/// Result of a sync event, reported back to the host's retry scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Tag isn't ours, nothing ran
    Ignored,
    Completed,
    /// Ran and failed; the host decides whether to try again
    Failed(String),
}

impl SyncOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncOutcome::Failed(_))
    }
}

/// The reconciliation job that runs on the deals sync tag
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DealSync: Send + Sync {
    async fn sync_deals(&self) -> Result<()>;
}

/// Sync job that has nothing to reconcile
///
/// There's no deals backend to push queued changes to, so this just reports
/// success.
#[derive(Debug, Default)]
pub struct NoopDealSync;

#[async_trait]
impl DealSync for NoopDealSync {
    async fn sync_deals(&self) -> Result<()> {
        info!("Syncing deals in background");
        Ok(())
    }
}
