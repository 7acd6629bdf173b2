//! Offline asset cache with generation-tagged partitions.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninstalled ──install()──▶ Installing ──ok──▶ Installed ──activate()──▶ Activating ──▶ Active
//!                                 │
//!                                 └──any asset fails──▶ Redundant (nothing written)
//!
//! Active ──own partition evicted by a newer generation──▶ Redundant
//! ```
//!
//! * **install** fetches the whole manifest and writes it into the partition
//!   `{prefix}-{generation}` only if every asset answered 2xx.
//! * **activate** deletes every other partition, then claims clients.
//! * **handle_fetch** serves requests once active: network-first for
//!   navigations (falling back to the cached root document), cache-first for
//!   everything else.
//!
//! One `OfflineCache` is one generation. Shipping a new generation means
//! building a new manager with a different tag over the same storage.

pub mod disk;
pub mod fetch;
pub mod manifest;
pub mod storage;

use crate::config::OfflineConfig;
use crate::error::SuiteError;
use crate::progress::ProgressCallback;
use futures::future::try_join_all;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

pub use disk::DiskCacheStorage;
pub use fetch::{
    cache_key, CacheRequest, CachedResponse, Fetcher, HttpFetcher, RequestMode, ResponseType,
};
pub use manifest::{AssetManifest, DEFAULT_ASSETS, ROOT_DOCUMENT};
pub use storage::{CachePartition, CacheStorage, MemoryCacheStorage};

/// Where the manager is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    Uninstalled,
    Installing,
    Installed,
    Activating,
    Active,
    /// Install failed, or a newer generation evicted this one's partition.
    Redundant,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Uninstalled => "uninstalled",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
            LifecycleState::Redundant => "redundant",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a successful install.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub cache_name: String,
    pub cached_keys: Vec<String>,
    pub total_bytes: usize,
}

/// Summary of an activation.
#[derive(Debug, Clone, Serialize)]
pub struct ActivationReport {
    pub cache_name: String,
    pub evicted: Vec<String>,
    pub clients_claimed: bool,
}

/// Which path produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    /// Live network response.
    Network,
    /// Cache hit for the requested key.
    Cache,
    /// Navigation failed; the cached root document was served instead.
    RootFallback,
}

/// A response plus how it was obtained.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub response: CachedResponse,
    pub source: ResponseSource,
}

/// One generation of the offline cache.
pub struct OfflineCache {
    config: OfflineConfig,
    cache_name: String,
    root_key: String,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    state: RwLock<LifecycleState>,
    progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for OfflineCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfflineCache")
            .field("cache_name", &self.cache_name)
            .field("scope", &self.config.scope.as_str())
            .field("state", &self.state())
            .finish()
    }
}

impl OfflineCache {
    pub fn new(
        config: OfflineConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, SuiteError> {
        let root = config
            .scope
            .join(ROOT_DOCUMENT)
            .map_err(|e| SuiteError::InvalidUrl {
                input: ROOT_DOCUMENT.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            cache_name: config.cache_name(),
            root_key: cache_key(&root),
            config,
            storage,
            fetcher,
            state: RwLock::new(LifecycleState::Uninstalled),
            progress_callback: None,
        })
    }

    /// Build a manager that fetches over HTTP.
    pub fn with_http(
        config: OfflineConfig,
        storage: Arc<dyn CacheStorage>,
    ) -> Result<Self, SuiteError> {
        let fetcher = HttpFetcher::new(&config.scope, config.fetch_timeout_secs)?;
        Self::new(config, storage, Arc::new(fetcher))
    }

    /// Report install progress, one step per manifest asset.
    pub fn with_progress(mut self, cb: ProgressCallback) -> Self {
        self.progress_callback = Some(cb);
        self
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn config(&self) -> &OfflineConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: LifecycleState) {
        let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
        debug!("[{}] {} → {}", self.cache_name, *guard, next);
        *guard = next;
    }

    /// Move from one of `allowed` to `next`, atomically.
    fn transition(
        &self,
        action: &'static str,
        allowed: &[LifecycleState],
        next: LifecycleState,
    ) -> Result<(), SuiteError> {
        let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
        if !allowed.contains(&*guard) {
            return Err(SuiteError::InvalidLifecycle {
                action,
                state: guard.as_str(),
            });
        }
        debug!("[{}] {} → {}", self.cache_name, *guard, next);
        *guard = next;
        Ok(())
    }

    // ── Install ──────────────────────────────────────────────────────────

    /// Fetch every manifest asset and store them, all or nothing.
    ///
    /// Any network failure or non-2xx status aborts the install; no entry
    /// is written for this generation and the state becomes `Redundant`.
    ///
    /// Writes start only after every fetch succeeded. A storage write that
    /// fails part-way removes the partition if this install created it. A
    /// partition that already existed (re-installing the same generation)
    /// is not rolled back and may hold a mix of old and new entries.
    pub async fn install(&self) -> Result<InstallReport, SuiteError> {
        self.transition(
            "install",
            &[LifecycleState::Uninstalled, LifecycleState::Redundant],
            LifecycleState::Installing,
        )?;
        info!("[{}] Pre-caching offline assets", self.cache_name);

        match self.populate().await {
            Ok(report) => {
                self.set_state(LifecycleState::Installed);
                info!(
                    "[{}] Installed {} assets ({} bytes)",
                    self.cache_name,
                    report.cached_keys.len(),
                    report.total_bytes
                );
                Ok(report)
            }
            Err(e) => {
                self.set_state(LifecycleState::Redundant);
                warn!("[{}] Install failed: {}", self.cache_name, e);
                Err(e)
            }
        }
    }

    async fn populate(&self) -> Result<InstallReport, SuiteError> {
        let urls = self.config.manifest.resolve(&self.config.scope)?;
        let total = urls.len();
        let requests: Vec<CacheRequest> = urls
            .into_iter()
            .map(|u| CacheRequest::asset(u, &self.config.scope))
            .collect();

        if let Some(ref cb) = self.progress_callback {
            cb.on_task_start("install", total);
        }

        // Concurrent bulk fetch; the first failure short-circuits.
        let fetched = try_join_all(requests.iter().enumerate().map(|(i, req)| async move {
            if let Some(ref cb) = self.progress_callback {
                cb.on_step_start(i + 1, total);
            }
            let resp = self.fetcher.fetch(req).await?;
            if !resp.is_ok() {
                return Err(SuiteError::InstallAssetRejected {
                    cache: self.cache_name.clone(),
                    url: req.url.to_string(),
                    status: resp.status,
                });
            }
            if let Some(ref cb) = self.progress_callback {
                cb.on_step_complete(i + 1, total, resp.body.len());
            }
            Ok((req.key(), resp))
        }))
        .await?;

        let existed = self.storage.has(&self.cache_name).await?;
        let partition = self.storage.open(&self.cache_name).await?;
        let mut report = InstallReport {
            cache_name: self.cache_name.clone(),
            cached_keys: Vec::with_capacity(fetched.len()),
            total_bytes: 0,
        };
        for (key, resp) in &fetched {
            if let Err(e) = partition.put(key, resp).await {
                if !existed {
                    // Leave no half-written generation behind.
                    if let Err(del) = self.storage.delete(&self.cache_name).await {
                        warn!("[{}] Cleanup after failed write: {}", self.cache_name, del);
                    }
                }
                return Err(e);
            }
            report.total_bytes += resp.body.len();
            report.cached_keys.push(key.clone());
        }

        if let Some(ref cb) = self.progress_callback {
            cb.on_task_complete("install", fetched.len());
        }
        Ok(report)
    }

    // ── Activate ─────────────────────────────────────────────────────────

    /// Evict every partition but this generation's, then claim clients.
    pub async fn activate(&self) -> Result<ActivationReport, SuiteError> {
        self.transition(
            "activate",
            &[LifecycleState::Installed],
            LifecycleState::Activating,
        )?;

        let result = self.evict_stale().await;
        match result {
            Ok(evicted) => {
                self.set_state(LifecycleState::Active);
                info!(
                    "[{}] Active; evicted {} stale partition(s)",
                    self.cache_name,
                    evicted.len()
                );
                Ok(ActivationReport {
                    cache_name: self.cache_name.clone(),
                    evicted,
                    clients_claimed: true,
                })
            }
            Err(e) => {
                // Retryable: the partition is intact, only cleanup failed.
                self.set_state(LifecycleState::Installed);
                Err(e)
            }
        }
    }

    async fn evict_stale(&self) -> Result<Vec<String>, SuiteError> {
        let mut evicted = Vec::new();
        for name in self.storage.keys().await? {
            if name != self.cache_name {
                info!("[{}] Clearing old cache: {}", self.cache_name, name);
                if self.storage.delete(&name).await? {
                    evicted.push(name);
                }
            }
        }
        Ok(evicted)
    }

    /// Install, then activate immediately when `skip_waiting` is set.
    ///
    /// Returns `None` for the activation when the generation is left waiting.
    pub async fn start(&self) -> Result<(InstallReport, Option<ActivationReport>), SuiteError> {
        let installed = self.install().await?;
        if !self.config.skip_waiting {
            info!("[{}] Installed; waiting for activation", self.cache_name);
            return Ok((installed, None));
        }
        let activated = self.activate().await?;
        Ok((installed, Some(activated)))
    }

    /// Pick up a generation installed and activated by an earlier process.
    ///
    /// Returns true, and moves to `Active`, when this generation's partition
    /// already exists in storage; otherwise the state is left unchanged.
    pub async fn resume(&self) -> Result<bool, SuiteError> {
        if self.state() != LifecycleState::Uninstalled {
            return Err(SuiteError::InvalidLifecycle {
                action: "resume",
                state: self.state().as_str(),
            });
        }
        if !self.storage.has(&self.cache_name).await? {
            return Ok(false);
        }
        self.transition("resume", &[LifecycleState::Uninstalled], LifecycleState::Active)?;
        info!("[{}] Resumed persisted generation", self.cache_name);
        Ok(true)
    }

    // ── Fetch ────────────────────────────────────────────────────────────

    /// Resolve a request through the cache policies.
    ///
    /// Until activation completes no client is controlled, so requests go
    /// straight to the network and the cache is left untouched.
    pub async fn handle_fetch(&self, request: &CacheRequest) -> Result<FetchOutcome, SuiteError> {
        if self.state() != LifecycleState::Active {
            debug!("[{}] Not active; passthrough {}", self.cache_name, request.url);
            let response = self.fetcher.fetch(request).await?;
            return Ok(FetchOutcome {
                response,
                source: ResponseSource::Network,
            });
        }
        if request.is_navigation() {
            self.network_first(request).await
        } else {
            self.cache_first(request).await
        }
    }

    async fn network_first(&self, request: &CacheRequest) -> Result<FetchOutcome, SuiteError> {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store(&request.key(), &response).await;
                Ok(FetchOutcome {
                    response,
                    source: ResponseSource::Network,
                })
            }
            Err(e) if e.is_network() => {
                debug!("[{}] Offline navigation to {}: {}", self.cache_name, request.url, e);
                match self.storage.lookup(&self.root_key).await {
                    Ok(Some(cached)) => Ok(FetchOutcome {
                        response: cached,
                        source: ResponseSource::RootFallback,
                    }),
                    Ok(None) => Err(e),
                    Err(storage_err) => {
                        warn!("[{}] Root fallback lookup failed: {}", self.cache_name, storage_err);
                        Err(e)
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn cache_first(&self, request: &CacheRequest) -> Result<FetchOutcome, SuiteError> {
        let key = request.key();
        if let Some(hit) = self.storage.lookup(&key).await? {
            debug!("[{}] Cache hit {}", self.cache_name, key);
            return Ok(FetchOutcome {
                response: hit,
                source: ResponseSource::Cache,
            });
        }

        let response = self.fetcher.fetch(request).await?;
        if response.is_cacheable() {
            self.store(&key, &response).await;
        } else {
            debug!(
                "[{}] Not caching {} (status {}, type {:?})",
                self.cache_name, key, response.status, response.response_type
            );
        }
        Ok(FetchOutcome {
            response,
            source: ResponseSource::Network,
        })
    }

    /// Write-back that never fails the request.
    ///
    /// If this generation's partition is gone, a newer generation evicted
    /// it: the write is skipped and this manager retires to `Redundant`.
    async fn store(&self, key: &str, response: &CachedResponse) {
        let partition = match self.storage.get(&self.cache_name).await {
            Ok(Some(partition)) => partition,
            Ok(None) => {
                self.retire();
                return;
            }
            Err(e) => {
                warn!("[{}] Could not cache {}: {}", self.cache_name, key, e);
                return;
            }
        };
        if let Err(e) = partition.put(key, response).await {
            warn!("[{}] Could not cache {}: {}", self.cache_name, key, e);
        }
    }

    fn retire(&self) {
        if self
            .transition("retire", &[LifecycleState::Active], LifecycleState::Redundant)
            .is_ok()
        {
            info!("[{}] Partition evicted by a newer generation; now redundant", self.cache_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_display() {
        assert_eq!(LifecycleState::Active.to_string(), "active");
        assert_eq!(LifecycleState::Redundant.as_str(), "redundant");
    }

    #[test]
    fn root_key_resolves_under_scope() {
        let config = OfflineConfig::builder()
            .scope("https://me.github.io/silentsuite")
            .build()
            .unwrap();
        let storage = Arc::new(MemoryCacheStorage::new());
        let fetcher = Arc::new(HttpFetcher::new(&config.scope, None).unwrap());
        let cache = OfflineCache::new(config, storage, fetcher).unwrap();
        assert_eq!(cache.root_key, "https://me.github.io/silentsuite/index.html");
        assert_eq!(cache.state(), LifecycleState::Uninstalled);
    }

    #[tokio::test]
    async fn activate_requires_install() {
        let config = OfflineConfig::default();
        let storage = Arc::new(MemoryCacheStorage::new());
        let fetcher = Arc::new(HttpFetcher::new(&config.scope, None).unwrap());
        let cache = OfflineCache::new(config, storage, fetcher).unwrap();
        let err = cache.activate().await.unwrap_err();
        assert!(matches!(err, SuiteError::InvalidLifecycle { action: "activate", .. }));
    }
}
