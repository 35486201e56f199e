// The offline worker: install, activate, then intercept events until replaced
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Method, Url};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::CacheStorage;
use crate::error::{Result, WorkerError};
use crate::http::{parse_url, resolve, same_origin, Destination, Request, Response};
use crate::lifecycle::WorkerState;
use crate::network::Network;
use crate::notifications::{ClickAction, Notification, Notifier};
use crate::sync::{DealSync, NoopDealSync, SyncOutcome};

/// Per-version worker settings
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Requests outside this origin are never touched
    pub origin: Url,
    pub static_cache: String,
    pub dynamic_cache: String,
    /// Shell assets cached at install, as paths or absolute URLs
    pub static_assets: Vec<String>,
    pub offline_page: String,
    pub sync_tag: String,
    /// Where "view" on a push notification leads
    pub notification_url: String,
}

impl WorkerConfig {
    /// Defaults for `origin` at cache version `v1`
    pub fn new(origin: &str) -> Result<Self> {
        Self::versioned(origin, "v1")
    }

    pub fn versioned(origin: &str, version: &str) -> Result<Self> {
        Ok(Self {
            origin: parse_url(origin)?,
            static_cache: format!("dealcheck-static-{}", version),
            dynamic_cache: format!("dealcheck-dynamic-{}", version),
            static_assets: [
                "/",
                "/manifest.json",
                "/icon-192x192.png",
                "/icon-512x512.png",
                "/offline.html",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            offline_page: "/offline.html".to_string(),
            sync_tag: "background-sync-deals".to_string(),
            notification_url: "/".to_string(),
        })
    }
}

/// How a fetch event was answered
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Not ours to handle (non-GET, cross-origin, or worker not active)
    Passthrough,
    /// Served from a cache partition without touching the network
    Cached(Response),
    /// Came from the network; cached if it was a same-origin 200
    Network(Response),
    /// Network failed on a page load, served the offline page instead
    Offline(Response),
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Passthrough => None,
            FetchOutcome::Cached(r) | FetchOutcome::Network(r) | FetchOutcome::Offline(r) => {
                Some(r)
            }
        }
    }
}

/// Notifier that only logs. Handy for headless hosts.
#[derive(Debug, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn show(&self, notification: &Notification) -> Result<()> {
        info!("Notification: {} - {}", notification.title, notification.body);
        Ok(())
    }

    async fn close(&self, _notification: &Notification) -> Result<()> {
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<()> {
        info!("Opening window at {}", url);
        Ok(())
    }
}

/// One version of the offline cache worker
///
/// `install` and `activate` take `&mut self`: each runs to completion before
/// anything else can touch the worker. Event handlers take `&self` and may run
/// concurrently; they only share the cache storage.
pub struct OfflineWorker {
    config: WorkerConfig,
    caches: CacheStorage,
    network: Arc<dyn Network>,
    notifier: Arc<dyn Notifier>,
    sync: Arc<dyn DealSync>,
    state: WorkerState,
    controls_clients: bool,
}

impl OfflineWorker {
    pub fn new(config: WorkerConfig, network: Arc<dyn Network>) -> Self {
        Self {
            config,
            caches: CacheStorage::new(),
            network,
            notifier: Arc::new(LoggingNotifier),
            sync: Arc::new(NoopDealSync),
            state: WorkerState::Parsed,
            controls_clients: false,
        }
    }

    /// Share cache storage with an earlier worker version
    pub fn with_caches(mut self, caches: CacheStorage) -> Self {
        self.caches = caches;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_sync(mut self, sync: Arc<dyn DealSync>) -> Self {
        self.sync = sync;
        self
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn caches(&self) -> &CacheStorage {
        &self.caches
    }

    /// Whether this worker has claimed the open clients
    pub fn controls_clients(&self) -> bool {
        self.controls_clients
    }

    /// Fetch every shell asset into the static partition
    ///
    /// All or nothing: if any asset fails, nothing is stored and this version
    /// goes redundant. Success skips waiting, so `activate` can follow at once.
    pub async fn install(&mut self) -> Result<()> {
        self.expect_state(WorkerState::Parsed)?;
        self.state = WorkerState::Installing;
        info!("Installing offline worker ({})", self.config.static_cache);

        match self.fetch_shell().await {
            Ok(assets) => {
                info!("Caching {} static assets", assets.len());
                self.caches.put_all(&self.config.static_cache, assets).await;
                self.state = WorkerState::Installed;
                debug!("Static assets cached, skipping wait");
                Ok(())
            }
            Err(e) => {
                warn!("Install failed: {}", e);
                self.state = WorkerState::Redundant;
                Err(e)
            }
        }
    }

    async fn fetch_shell(&self) -> Result<Vec<(Url, Response)>> {
        let requests = self
            .config
            .static_assets
            .iter()
            .map(|asset| {
                let url = resolve(&self.config.origin, asset)?;
                Ok(Request {
                    method: Method::GET,
                    url,
                    destination: Destination::Other,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let responses = join_all(requests.iter().map(|r| self.network.fetch(r))).await;

        let mut assets = Vec::with_capacity(requests.len());
        for (request, response) in requests.into_iter().zip(responses) {
            let asset = request.url.to_string();
            let response = response.map_err(|e| WorkerError::InstallFailed {
                asset: asset.clone(),
                reason: e.to_string(),
            })?;
            if !response.status.is_success() {
                return Err(WorkerError::InstallFailed {
                    asset,
                    reason: format!("status {}", response.status),
                });
            }
            assets.push((request.url, response));
        }

        Ok(assets)
    }

    /// Delete every partition that isn't this version's, then claim clients
    ///
    /// Returns the names of the partitions that were thrown away.
    pub async fn activate(&mut self) -> Result<Vec<String>> {
        self.expect_state(WorkerState::Installed)?;
        self.state = WorkerState::Activating;
        info!("Activating offline worker");

        let mut deleted = Vec::new();
        for name in self.caches.keys().await {
            if name != self.config.static_cache && name != self.config.dynamic_cache {
                info!("Deleting old cache: {}", name);
                self.caches.delete(&name).await;
                deleted.push(name);
            }
        }

        self.controls_clients = true;
        self.state = WorkerState::Activated;
        info!("Offline worker activated");
        Ok(deleted)
    }

    /// Cache-first handling for same-origin GETs
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome> {
        if !self.state.is_active() {
            return Ok(FetchOutcome::Passthrough);
        }
        if request.method != Method::GET || !same_origin(&self.config.origin, &request.url) {
            return Ok(FetchOutcome::Passthrough);
        }

        if let Some(cached) = self.caches.match_any(&request.url).await {
            debug!("Serving from cache: {}", request.url);
            return Ok(FetchOutcome::Cached(cached));
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    debug!("Caching dynamic content: {}", request.url);
                    self.caches
                        .put(&self.config.dynamic_cache, &request.url, response.clone())
                        .await;
                }
                Ok(FetchOutcome::Network(response))
            }
            Err(e) if request.is_document() => {
                info!("Network failed for {}, serving offline page", request.url);
                let offline = resolve(&self.config.origin, &self.config.offline_page)?;
                match self.caches.match_any(&offline).await {
                    Some(page) => Ok(FetchOutcome::Offline(page)),
                    None => {
                        warn!("No offline page cached: {}", e);
                        Err(WorkerError::NoOfflineFallback(request.url.to_string()))
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Show the deal notification for a push message
    pub async fn handle_push(&self, payload: Option<&str>) -> Result<Notification> {
        self.expect_state(WorkerState::Activated)?;
        info!("Push notification received");

        let notification = Notification::for_push(payload, &self.config.notification_url);
        self.notifier.show(&notification).await?;
        Ok(notification)
    }

    /// Close the clicked notification; "view" also opens its URL
    pub async fn handle_notification_click(
        &self,
        notification: &Notification,
        action: Option<&str>,
    ) -> Result<ClickAction> {
        self.expect_state(WorkerState::Activated)?;
        let action = ClickAction::parse(action);
        info!("Notification clicked: {}", action);

        self.notifier.close(notification).await?;
        if action == ClickAction::View {
            self.notifier.open_window(notification.target_url()).await?;
        }
        Ok(action)
    }

    /// Run the deal sync for our tag; anything else is ignored
    ///
    /// Failures come back as `SyncOutcome::Failed` for the host to retry.
    pub async fn handle_sync(&self, tag: &str) -> SyncOutcome {
        info!("Background sync triggered: {}", tag);
        if tag != self.config.sync_tag {
            return SyncOutcome::Ignored;
        }
        if !self.state.is_active() {
            return SyncOutcome::Failed(format!("worker is {}", self.state));
        }

        match self.sync.sync_deals().await {
            Ok(()) => {
                info!("Background sync completed");
                SyncOutcome::Completed
            }
            Err(e) => {
                warn!("Background sync failed: {}", e);
                SyncOutcome::Failed(e.to_string())
            }
        }
    }

    fn expect_state(&self, expected: WorkerState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(WorkerError::InvalidState(self.state, expected))
        }
    }
}
