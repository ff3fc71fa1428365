//! The cache router: per-request strategy execution.

use std::sync::Arc;

use tracing::{debug, trace, warn};
use url::Url;

use pwakit_cache::{request_key, CacheStore};

use crate::classify::{classify, HostMatcher, RouteClass};
use crate::{FetchRequest, FetchResponse, Fetcher, RequestDestination, RouterError};

/// Router configuration: the environment-specific surface.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// The worker's own origin.
    pub origin: Url,
    /// Matcher for the backend data-service host.
    pub data_host: HostMatcher,
    /// Name of the dynamic partition opportunistic fills go into.
    pub dynamic_partition: String,
    /// Origin-relative path of the offline fallback document.
    pub offline_fallback: String,
}

/// Outcome of routing one request.
#[derive(Debug)]
pub enum Routed {
    /// The router does not intervene; default handling applies.
    PassThrough,
    /// The router produced a response, live or cached.
    Response(FetchResponse),
}

/// Decides, per intercepted request, how to satisfy it.
///
/// Holds no per-request state; concurrent requests are independent tasks
/// that only touch their own cache key.
pub struct CacheRouter {
    config: RouterConfig,
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
}

impl CacheRouter {
    /// Create a router over an injected store and fetcher.
    pub fn new(config: RouterConfig, store: Arc<dyn CacheStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            config,
            store,
            fetcher,
        }
    }

    /// Classify a request without routing it.
    pub fn classify(&self, request: &FetchRequest) -> RouteClass {
        classify(request, &self.config.origin, &self.config.data_host)
    }

    /// Route one request through its strategy.
    pub async fn route(&self, request: &FetchRequest) -> Result<Routed, RouterError> {
        let class = self.classify(request);
        debug!(url = %request.url, class = class.as_str(), "routing request");

        match class {
            RouteClass::PassThrough => Ok(Routed::PassThrough),
            RouteClass::Document => self.network_first(request).await.map(Routed::Response),
            RouteClass::DataApi => self.network_only(request).await.map(Routed::Response),
            RouteClass::StaticAsset => self.cache_first(request).await.map(Routed::Response),
        }
    }

    /// Network-first: live response wins, cache then offline document on
    /// failure.
    async fn network_first(&self, request: &FetchRequest) -> Result<FetchResponse, RouterError> {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store_dynamic(request, &response).await;
                Ok(response)
            }
            Err(err) => {
                warn!(url = %request.url, error = %err, "document fetch failed, falling back to cache");
                if let Some(cached) = self.match_cached(&request.cache_key()).await {
                    return Ok(cached);
                }
                if let Some(fallback) = self.offline_fallback().await {
                    return Ok(fallback);
                }
                Err(err)
            }
        }
    }

    /// Network-only: no cache reads or writes, failures propagate so the
    /// caller never acts on stale data.
    async fn network_only(&self, request: &FetchRequest) -> Result<FetchResponse, RouterError> {
        self.fetcher.fetch(request).await
    }

    /// Cache-first: exact match wins, misses go to network and successful
    /// same-origin responses fill the dynamic partition.
    async fn cache_first(&self, request: &FetchRequest) -> Result<FetchResponse, RouterError> {
        let key = request.cache_key();
        if let Some(cached) = self.match_cached(&key).await {
            trace!(url = %request.url, "cache hit");
            return Ok(cached);
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store_dynamic(request, &response).await;
                }
                Ok(response)
            }
            Err(err) => {
                if request.destination == RequestDestination::Document {
                    if let Some(fallback) = self.offline_fallback().await {
                        return Ok(fallback);
                    }
                }
                Err(err)
            }
        }
    }

    /// Write a response into the dynamic partition. The write happens only
    /// after the fetch fully resolved; a failed write never fails the
    /// request that produced it.
    async fn store_dynamic(&self, request: &FetchRequest, response: &FetchResponse) {
        let entry = response.to_entry(request);
        if let Err(err) = self.store.put(&self.config.dynamic_partition, entry).await {
            warn!(url = %request.url, error = %err, "dynamic cache write failed");
        }
    }

    /// Exact-match lookup across all partitions. Store errors degrade to a
    /// miss so the fallback chain keeps going.
    async fn match_cached(&self, key: &str) -> Option<FetchResponse> {
        match self.store.match_any(key).await {
            Ok(Some(entry)) => Some(FetchResponse::from_entry(entry)),
            Ok(None) => None,
            Err(err) => {
                warn!(key, error = %err, "cache lookup failed");
                None
            }
        }
    }

    /// Look up the offline fallback document in the cache.
    async fn offline_fallback(&self) -> Option<FetchResponse> {
        let url = match self.config.origin.join(&self.config.offline_fallback) {
            Ok(url) => url,
            Err(err) => {
                warn!(path = %self.config.offline_fallback, error = %err, "invalid offline fallback path");
                return None;
            }
        };
        let found = self.match_cached(&request_key("GET", url.as_str())).await;
        if found.is_some() {
            warn!(url = %url, "serving offline fallback document");
        }
        found
    }
}
